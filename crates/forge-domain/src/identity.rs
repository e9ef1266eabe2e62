//! Identidad de ejecución de la imagen.
//!
//! La identidad es el principal de SO bajo el cual corre el entrypoint.
//! Se aprovisiona exactamente una vez por imagen; la pertenencia a grupo
//! determina el nivel de privilegio del proceso en runtime y es un punto de
//! configuración revisable, no un detalle de implementación.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Grupos que confieren privilegio administrativo en las bases soportadas.
/// Unirse a uno de estos grupos requiere reconocimiento explícito en el plan.
pub static ADMINISTRATIVE_GROUPS: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| ["root", "wheel", "admin", "administrators", "sudo"].into_iter().collect());

/// Principal de SO dedicado más su grupo de privilegio declarado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeIdentity {
    name: String,
    group: String,
    uid: Option<u32>, // None = asignar el primer uid libre al aprovisionar
}

impl RuntimeIdentity {
    /// Crea una identidad validando nombre de cuenta y de grupo.
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let group = group.into();
        validate_account_name(&name)?;
        validate_account_name(&group)?;
        Ok(RuntimeIdentity { name, group, uid: None })
    }

    /// Fija un uid explícito en lugar de la asignación automática.
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn uid(&self) -> Option<u32> {
        self.uid
    }

    /// `true` si el grupo declarado es administrativo.
    pub fn is_privileged(&self) -> bool {
        ADMINISTRATIVE_GROUPS.contains(self.group.as_str())
    }
}

/// Valida un nombre de cuenta estilo POSIX: `[a-z_][a-z0-9_-]{0,31}`.
pub fn validate_account_name(name: &str) -> Result<(), DomainError> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !head_ok || !tail_ok || name.len() > 32 {
        return Err(DomainError::Validation(format!("Nombre de cuenta inválido: '{name}'")));
    }
    Ok(())
}
