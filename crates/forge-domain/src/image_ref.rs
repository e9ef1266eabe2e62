//! Referencias de imagen base fijadas por contenido.
//!
//! Una referencia válida es `name@sha256:<hex>` o el literal `scratch`
//! (árbol vacío). Las etiquetas flotantes (`name:latest`) no son
//! representables: la reproducibilidad del build exige una base direccionada
//! por contenido. El digest es el `root_digest` del manifiesto del árbol
//! base (ver `manifest::TreeManifest`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Literal aceptado para la base vacía.
pub const SCRATCH: &str = "scratch";

const DIGEST_PREFIX: &str = "sha256:";

/// Referencia inmutable a una imagen base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    name: String,
    digest: Option<String>, // hex sha256, None sólo para scratch
}

impl ImageReference {
    /// Parsea una referencia textual estricta.
    ///
    /// # Errores
    /// Retorna `DomainError::Validation` para referencias vacías, etiquetas
    /// flotantes, digests mal formados o nombres con caracteres inválidos.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::Validation("Referencia de imagen vacía".to_string()));
        }
        if raw == SCRATCH {
            return Ok(ImageReference { name: SCRATCH.to_string(),
                                       digest: None });
        }

        let (name, suffix) = raw.split_once('@').ok_or_else(|| {
                                 DomainError::Validation(format!(
                "Referencia sin digest: '{raw}' (se requiere name@sha256:<hex> o scratch)"
            ))
                             })?;

        validate_name(name)?;

        let hex = suffix.strip_prefix(DIGEST_PREFIX).ok_or_else(|| {
                      DomainError::Validation(format!("Digest no soportado en '{raw}' (sólo sha256)"))
                  })?;
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            return Err(DomainError::Validation(format!("Digest sha256 mal formado en '{raw}'")));
        }

        Ok(ImageReference { name: name.to_string(),
                            digest: Some(hex.to_string()) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Digest hex del árbol base; `None` sólo para `scratch`.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn is_scratch(&self) -> bool {
        self.digest.is_none()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.digest {
            Some(hex) => write!(f, "{}@{}{}", self.name, DIGEST_PREFIX, hex),
            None => write!(f, "{SCRATCH}"),
        }
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::Validation("Nombre de imagen vacío".to_string()));
    }
    // Mismo alfabeto que los repositorios OCI: minúsculas, dígitos y ./_/-
    let ok = name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-' | '/'));
    if !ok {
        return Err(DomainError::Validation(format!("Nombre de imagen inválido: '{name}'")));
    }
    Ok(())
}
