//! Tipos de evento del build y estructura `BuildEvent`.
//!
//! Rol en el pipeline:
//! - Cada ejecución del `PipelineEngine` emite eventos a un `EventStore`
//!   append-only.
//! - Los eventos permiten reconstruir el estado del `PipelineRepository`
//!   (replay) sin estructuras mutables: la cadena de capas de la imagen ES la
//!   secuencia de `LayerCommitted`.
//! - El enum `BuildEventKind` define el contrato observable y estable del
//!   motor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PipelineError;

/// Eventos soportados por el pipeline lineal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BuildEventKind {
    /// Emisión inicial de un build: fija la `definition_hash` y la cantidad
    /// de steps. Invariante: debe ser el primer evento de un `build_id`.
    PipelineInitialized { definition_hash: String, step_count: usize },
    /// Un step comenzó su ejecución. No implica éxito.
    StepStarted { step_index: usize, step_id: String },
    /// Un step terminó correctamente: sus outputs (hashes) quedan
    /// comprometidos como capa inmutable, con fingerprint propio. Las capas
    /// previas nunca se mutan; la nueva las supersede.
    LayerCommitted {
        step_index: usize,
        step_id: String,
        outputs: Vec<String>,
        fingerprint: String,
    },
    /// Un step terminó con error terminal. El build no continúa
    /// (stop-on-failure) y no se limpia ninguna capa ya comprometida.
    StepFailed {
        step_index: usize,
        step_id: String,
        error: PipelineError,
        fingerprint: String,
    },
    /// Evento de cierre con fingerprint agregado del pipeline (hash de los
    /// fingerprints ordenados de los steps exitosos).
    PipelineCompleted { pipeline_fingerprint: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEvent {
    pub seq: u64, // asignado por el EventStore (orden de append)
    pub build_id: Uuid,
    pub kind: BuildEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprints)
}
