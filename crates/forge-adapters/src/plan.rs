//! Plan de build: la entrada declarativa completa del pipeline.
//!
//! El plan transporta los parámetros base deterministas de cada step (son lo
//! que participa de los fingerprints); las rutas de workspace se cablean
//! aparte vía `WorkspaceInjector`. La validación corre antes de construir el
//! pipeline y aplica las políticas revisadas: base fijada por contenido y
//! mínimo privilegio.

use forge_domain::RuntimeIdentity;
use forge_policies::{BaseReferencePolicy, LeastPrivilegePolicy, PinnedBasePolicy, PolicyDecision,
                     PrivilegeGroupPolicy, PrivilegeParams};
use serde::{Deserialize, Serialize};

use crate::errors::ProvisionError;
use crate::steps::entrypoint::EntrypointParams;
use crate::steps::identity::IdentityParams;
use crate::steps::stage::StageParams;
use crate::steps::toolchain::ToolchainParams;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Nombre con el que se publica la imagen.
    pub image_name: String,
    /// Referencia base fijada por contenido (`name@sha256:<hex>` o `scratch`).
    pub base: String,
    pub toolchain: ToolchainParams,
    pub binary: StageParams,
    pub identity: IdentityParams,
    pub entrypoint: EntrypointParams,
}

impl BuildPlan {
    pub fn from_json(text: &str) -> Result<Self, ProvisionError> {
        serde_json::from_str(text).map_err(|e| ProvisionError::Plan(format!("plan decode: {e}")))
    }

    /// Valida el plan y aplica las políticas revisadas.
    ///
    /// Retorna las decisiones (con rationale) para que el invocador las
    /// muestre; cualquier denegación o inconsistencia estructural es fatal
    /// antes de ejecutar paso alguno.
    pub fn validate(&self) -> Result<Vec<PolicyDecision>, ProvisionError> {
        if self.image_name.trim().is_empty() {
            return Err(ProvisionError::Plan("image_name must not be empty".to_string()));
        }

        let base_decision = PinnedBasePolicy::new().review(&self.base);
        if !base_decision.allowed {
            return Err(ProvisionError::Plan(format!("base reference rejected: {}",
                                                    base_decision.rationale.notes.join("; "))));
        }

        if self.toolchain.url.trim().is_empty() {
            return Err(ProvisionError::Plan("toolchain url must not be empty".to_string()));
        }
        if self.binary.source.trim().is_empty() {
            return Err(ProvisionError::Plan("binary source must not be empty".to_string()));
        }
        if !self.binary.dest.starts_with('/') {
            return Err(ProvisionError::Plan(format!("binary dest must be absolute: '{}'", self.binary.dest)));
        }
        // El contrato de runtime es ejecutar el binario staged, sin más
        if self.entrypoint.program != self.binary.dest {
            return Err(ProvisionError::Plan(format!("entrypoint '{}' must invoke the staged binary '{}'",
                                                    self.entrypoint.program, self.binary.dest)));
        }

        let identity = RuntimeIdentity::new(&self.identity.user, &self.identity.group)
            .map_err(ProvisionError::from)?;
        let privilege_decision =
            LeastPrivilegePolicy::new().review(&identity,
                                               &PrivilegeParams { allow_privileged: self.identity.allow_privileged });
        if !privilege_decision.allowed {
            return Err(ProvisionError::GroupAssignment(format!("privilege group rejected: {}",
                                                               privilege_decision.rationale.notes.join("; "))));
        }

        Ok(vec![base_decision, privilege_decision])
    }
}
