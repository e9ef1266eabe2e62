//! Entrypoint fijo de la imagen.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Línea de comando única que el runtime ejecuta al arrancar un contenedor.
/// Inmutable una vez escrita en la configuración de la imagen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrypoint {
    program: String, // ruta absoluta dentro del rootfs
    args: Vec<String>,
}

impl Entrypoint {
    /// Crea un entrypoint validando que el programa sea una ruta absoluta.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self, DomainError> {
        let program = program.into();
        if !program.starts_with('/') {
            return Err(DomainError::Validation(format!("El entrypoint debe ser una ruta absoluta: '{program}'")));
        }
        if args.iter().any(|a| a.is_empty()) {
            return Err(DomainError::Validation("Argumento de entrypoint vacío".to_string()));
        }
        Ok(Entrypoint { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Vector argv completo: programa seguido de sus argumentos.
    pub fn argv(&self) -> Vec<String> {
        let mut v = Vec::with_capacity(1 + self.args.len());
        v.push(self.program.clone());
        v.extend(self.args.iter().cloned());
        v
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}
