//! Máquina de estados observable del pipeline.
//!
//! `Init → ToolchainInstalling → ArtifactStaging → IdentityProvisioning →
//! EntrypointBinding → Done`, con `Failed` terminal alcanzable desde
//! cualquier estado no terminal. La fase se deriva del replay de eventos (no
//! hay estado mutable aparte del event log).

use std::fmt;

use forge_core::repo::PipelineInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPhase {
    Init,
    ToolchainInstalling,
    ArtifactStaging,
    IdentityProvisioning,
    EntrypointBinding,
    Done,
    Failed,
}

impl fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProvisionPhase::Init => "init",
            ProvisionPhase::ToolchainInstalling => "toolchain-installing",
            ProvisionPhase::ArtifactStaging => "artifact-staging",
            ProvisionPhase::IdentityProvisioning => "identity-provisioning",
            ProvisionPhase::EntrypointBinding => "entrypoint-binding",
            ProvisionPhase::Done => "done",
            ProvisionPhase::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Fase del pipeline estándar según la instancia replay-ada.
pub fn phase_of(instance: &PipelineInstance) -> ProvisionPhase {
    if instance.failed {
        return ProvisionPhase::Failed;
    }
    if instance.completed {
        return ProvisionPhase::Done;
    }
    match instance.cursor {
        0 => ProvisionPhase::Init,
        1 => ProvisionPhase::ToolchainInstalling,
        2 => ProvisionPhase::ArtifactStaging,
        3 => ProvisionPhase::IdentityProvisioning,
        4 => ProvisionPhase::EntrypointBinding,
        _ => ProvisionPhase::Done,
    }
}
