//! Configuración de runtime de la imagen producida.
//!
//! Vive junto al rootfs en el área de staging (`config.json`) y es lo que el
//! runtime de contenedores lee una única vez al arrancar: identidad por
//! defecto y entrypoint. No define ninguna otra superficie de configuración.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Identidad por defecto de todo proceso arrancado desde la imagen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Argv fijo ejecutado al arrancar el contenedor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
}

impl ImageConfig {
    pub fn from_json(text: &str) -> Result<Self, DomainError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
