//! Artifact neutral del pipeline.
//!
//! Un `Artifact` es la unidad de datos encadenada entre steps: la
//! representación serializada del estado de imagen que un paso deja para el
//! siguiente. Es neutral:
//! - `payload` es JSON genérico; el motor no interpreta su semántica.
//! - `hash` lo calcula el engine sobre el JSON canonicalizado y es la
//!   identidad de la capa para trazabilidad y deduplicación.
//! - `metadata` anota información auxiliar que no entra al hash (por ejemplo
//!   rationales de políticas).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tipos neutrales de artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JSON genérico sin semántica para el core.
    GenericJson,
}

/// Artifact inmutable producido/consumido por steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub hash: String,            // hash canónico del payload (asignado por el engine)
    pub payload: Value,          // contenido neutro JSON
    pub metadata: Option<Value>, // información auxiliar (no entra al hash)
}

impl Artifact {
    /// Constructor interno; preferir `ArtifactSpec::into_artifact`.
    pub fn new_unhashed(kind: ArtifactKind, payload: Value, metadata: Option<Value>) -> Self {
        Self { kind,
               hash: String::new(),
               payload,
               metadata }
    }
}
