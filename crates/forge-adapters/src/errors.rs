//! Taxonomía de fallos de aprovisionamiento.
//!
//! Cada variante lleva un tag estable (`kind`) que viaja dentro de
//! `PipelineError::Step` y queda registrado en el evento `StepFailed`; los
//! tests y el CLI distinguen fallos por tag, no por mensaje.

use forge_core::errors::PipelineError;
use forge_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("installer failed: {0}")]
    Installer(String),

    #[error("installer service registration toggle failed: {0}")]
    RegistrationToggle(String),

    #[error("missing artifact: {0}")]
    MissingArtifact(String),

    #[error("identity creation failed: {0}")]
    IdentityCreation(String),

    #[error("group assignment failed: {0}")]
    GroupAssignment(String),

    #[error("entrypoint conflict: {0}")]
    EntrypointConflict(String),

    #[error("base mismatch: {0}")]
    BaseMismatch(String),

    #[error("invalid plan: {0}")]
    Plan(String),

    #[error("workspace io: {0}")]
    Io(String),
}

impl ProvisionError {
    /// Tag estable de la variante.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::Download(_) => "download_failure",
            ProvisionError::Installer(_) => "installer_failure",
            ProvisionError::RegistrationToggle(_) => "registration_toggle_failure",
            ProvisionError::MissingArtifact(_) => "missing_artifact",
            ProvisionError::IdentityCreation(_) => "identity_creation_failure",
            ProvisionError::GroupAssignment(_) => "group_assignment_failure",
            ProvisionError::EntrypointConflict(_) => "entrypoint_conflict",
            ProvisionError::BaseMismatch(_) => "base_mismatch",
            ProvisionError::Plan(_) => "plan_rejected",
            ProvisionError::Io(_) => "workspace_io",
        }
    }
}

// El core transporta el fallo con su tag, sin conocer la taxonomía.
impl From<ProvisionError> for PipelineError {
    fn from(e: ProvisionError) -> Self {
        PipelineError::Step { kind: e.kind().to_string(),
                              message: e.to_string() }
    }
}

// Los errores de dominio con semántica propia conservan su variante.
impl From<DomainError> for ProvisionError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::DuplicateAccount(name) => {
                ProvisionError::IdentityCreation(format!("account '{name}' already provisioned"))
            }
            DomainError::UnknownGroup(name) => {
                ProvisionError::GroupAssignment(format!("group '{name}' does not exist in the base"))
            }
            DomainError::Io(m) => ProvisionError::Io(m),
            other => ProvisionError::Plan(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ProvisionError {
    fn from(e: std::io::Error) -> Self {
        ProvisionError::Io(e.to_string())
    }
}
