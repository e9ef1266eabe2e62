//! forge-policies – Políticas de configuración revisada
//!
//! El nivel de privilegio del proceso proxy y la base de la imagen son
//! decisiones de seguridad explícitas, no detalles de implementación. Este
//! crate provee los contratos y las implementaciones por defecto para
//! revisarlas de forma determinista y auditable: cada revisión produce una
//! `PolicyDecision` con rationale tipado y hash canónico de parámetros.

use forge_core::hashing::{hash_str, to_canonical_json};
use forge_domain::{ImageReference, RuntimeIdentity};
use serde::{Deserialize, Serialize};

/// Parámetros de la política de privilegio.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivilegeParams {
    /// Reconocimiento explícito del plan para unir la identidad a un grupo
    /// administrativo. Sin él, la política deniega el grupo elevado.
    pub allow_privileged: bool,
}

/// Decisión de una revisión de política.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDecision {
    pub allowed: bool,
    /// id estático de la política que tomó la decisión.
    pub policy_id: String,
    /// Hash canónico de los parámetros de la política.
    pub params_hash: String,
    /// Explicación tipada (serializable a JSON canónico para auditoría).
    pub rationale: Rationale,
}

/// Explicación tipada de la decisión.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rationale {
    pub policy_id: String,
    pub subject: String,
    pub allowed: bool,
    pub notes: Vec<String>,
}

impl Rationale {
    /// JSON canónico para persistencia/auditoría.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Hash canónico de parámetros arbitrarios serializables.
pub fn params_hash<T: Serialize>(params: &T) -> String {
    let v = serde_json::to_value(params).unwrap_or(serde_json::Value::Null);
    hash_str(&to_canonical_json(&v))
}

/// Contrato de la revisión de grupo de privilegio.
pub trait PrivilegeGroupPolicy {
    fn id(&self) -> &'static str;
    fn review(&self, identity: &RuntimeIdentity, params: &PrivilegeParams) -> PolicyDecision;
}

/// Política por defecto: mínimo privilegio con override explícito.
///
/// Un grupo no administrativo siempre pasa; un grupo administrativo sólo
/// pasa con `allow_privileged: true` en el plan, y la decisión queda
/// registrada con su rationale.
pub struct LeastPrivilegePolicy;

impl LeastPrivilegePolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastPrivilegePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegeGroupPolicy for LeastPrivilegePolicy {
    fn id(&self) -> &'static str {
        "least_privilege"
    }

    fn review(&self, identity: &RuntimeIdentity, params: &PrivilegeParams) -> PolicyDecision {
        let mut notes = Vec::new();
        let allowed = if !identity.is_privileged() {
            notes.push(format!("el grupo '{}' no es administrativo", identity.group()));
            true
        } else if params.allow_privileged {
            notes.push(format!("el grupo '{}' es administrativo y el plan lo reconoce explícitamente",
                               identity.group()));
            notes.push("revisar: el proxy correrá con privilegio elevado".to_string());
            true
        } else {
            notes.push(format!("el grupo '{}' es administrativo y el plan no declara allow_privileged",
                               identity.group()));
            false
        };

        let rationale = Rationale { policy_id: self.id().to_string(),
                                    subject: identity.group().to_string(),
                                    allowed,
                                    notes };
        PolicyDecision { allowed,
                         policy_id: self.id().to_string(),
                         params_hash: params_hash(params),
                         rationale }
    }
}

/// Contrato de la revisión de referencia base.
pub trait BaseReferencePolicy {
    fn id(&self) -> &'static str;
    fn review(&self, reference: &str) -> PolicyDecision;
}

/// Política por defecto: base direccionada por contenido.
///
/// Sólo se admite `name@sha256:<hex>` o `scratch`; una etiqueta flotante
/// (p. ej. `:latest`) hace el build irreproducible y se deniega siempre.
pub struct PinnedBasePolicy;

impl PinnedBasePolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PinnedBasePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseReferencePolicy for PinnedBasePolicy {
    fn id(&self) -> &'static str {
        "pinned_base"
    }

    fn review(&self, reference: &str) -> PolicyDecision {
        let mut notes = Vec::new();
        let allowed = match ImageReference::parse(reference) {
            Ok(r) if r.is_scratch() => {
                notes.push("base scratch: árbol vacío, trivialmente reproducible".to_string());
                true
            }
            Ok(r) => {
                notes.push(format!("base fijada por contenido: {r}"));
                true
            }
            Err(e) => {
                if reference.contains(':') && !reference.contains('@') {
                    notes.push(format!("etiqueta flotante no permitida: '{reference}'"));
                } else {
                    notes.push(e.to_string());
                }
                false
            }
        };

        let rationale = Rationale { policy_id: self.id().to_string(),
                                    subject: reference.to_string(),
                                    allowed,
                                    notes };
        PolicyDecision { allowed,
                         policy_id: self.id().to_string(),
                         params_hash: params_hash(&serde_json::Value::Null),
                         rationale }
    }
}
