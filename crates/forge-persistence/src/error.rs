//! Errores de persistencia.
//! Mapea errores de E/S y decodificación a variantes semánticas.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("not found")]
    NotFound,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("incomplete build: {0}")]
    Incomplete(String),
    #[error("transient IO error: {0}")]
    TransientIo(String),
    #[error("unknown persistence error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::TransientIo(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}
