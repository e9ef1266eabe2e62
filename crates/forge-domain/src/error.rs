use thiserror::Error;

/// Error del dominio de imágenes.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Error de validación: {0}")]
    Validation(String),

    #[error("La cuenta ya existe: {0}")]
    DuplicateAccount(String),

    #[error("Grupo desconocido: {0}")]
    UnknownGroup(String),

    #[error("Error de E/S: {0}")]
    Io(String),

    #[error("Error de serialización: {0}")]
    Serialization(String),
}

// Conversión desde errores de E/S del sistema de archivos
impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Io(e.to_string())
    }
}

// Conversión desde serde_json::Error
impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}
