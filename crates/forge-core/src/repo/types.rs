//! Tipos de repositorio: estado reconstruido (`PipelineInstance`) y
//! definición (`PipelineDefinition`).
//!
//! El repositorio aplica un replay lineal: consume eventos en orden y
//! actualiza un `PipelineInstance` por evento. No almacena artifacts
//! completos (sólo hashes) para mantener neutralidad. El replay materializa
//! el invariante stop-on-failure: un `StepFailed` marca la instancia entera
//! como fallida y el motor no vuelve a avanzar.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event::{BuildEvent, BuildEventKind};
use crate::step::{StepDefinition, StepStatus};

pub struct PipelineInstance {
    pub id: Uuid,
    pub steps: Vec<StepSlot>,
    pub cursor: usize,
    pub completed: bool,
    pub failed: bool,
}

/// Estado de un step en la instancia.
pub struct StepSlot {
    pub step_id: String,
    pub status: StepStatus,
    pub fingerprint: Option<String>,
    pub outputs: Vec<String>, // sólo hashes (los artifacts viven aparte)
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Trait para reconstruir (`replay`) el estado de un build desde eventos.
pub trait PipelineRepository {
    fn load(&self, build_id: Uuid, events: &[BuildEvent], definition: &PipelineDefinition) -> PipelineInstance;
}

/// Definición inmutable del pipeline: los steps forman un orden total
/// estricto fijado en construcción y nunca se reordenan.
pub struct PipelineDefinition {
    pub steps: Vec<Box<dyn StepDefinition>>,
    pub definition_hash: String,
}

impl PipelineDefinition {
    pub fn new(steps: Vec<Box<dyn StepDefinition>>, definition_hash: String) -> Self {
        Self { steps, definition_hash }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

pub struct InMemoryPipelineRepository;

impl InMemoryPipelineRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InMemoryPipelineRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRepository for InMemoryPipelineRepository {
    fn load(&self, build_id: Uuid, events: &[BuildEvent], definition: &PipelineDefinition) -> PipelineInstance {
        let mut steps: Vec<StepSlot> = definition.steps
                                                 .iter()
                                                 .map(|s| StepSlot { step_id: s.id().to_string(),
                                                                     status: StepStatus::Pending,
                                                                     fingerprint: None,
                                                                     outputs: vec![],
                                                                     started_at: None,
                                                                     finished_at: None })
                                                 .collect();
        let mut completed = false;
        let mut failed = false;
        for ev in events {
            match &ev.kind {
                BuildEventKind::PipelineInitialized { .. } => {}
                BuildEventKind::StepStarted { step_index, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Running;
                        slot.started_at = Some(ev.ts);
                    }
                }
                BuildEventKind::LayerCommitted { step_index,
                                                 fingerprint,
                                                 outputs,
                                                 .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::FinishedOk;
                        slot.fingerprint = Some(fingerprint.clone());
                        slot.outputs = outputs.clone();
                        slot.finished_at = Some(ev.ts);
                    }
                }
                BuildEventKind::StepFailed { step_index, fingerprint, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Failed;
                        slot.fingerprint = Some(fingerprint.clone());
                        slot.finished_at = Some(ev.ts);
                    }
                    failed = true;
                }
                BuildEventKind::PipelineCompleted { .. } => completed = true,
            }
        }
        let cursor = steps.iter()
                          .position(|s| matches!(s.status, StepStatus::Pending))
                          .unwrap_or(steps.len());
        PipelineInstance { id: build_id,
                           steps,
                           cursor,
                           completed,
                           failed }
    }
}

pub fn build_pipeline_definition(step_ids: &[&str], steps: Vec<Box<dyn StepDefinition>>) -> PipelineDefinition {
    use crate::hashing::{hash_str, to_canonical_json};
    use serde_json::json;
    let ids_json = json!(step_ids);
    let canonical = to_canonical_json(&ids_json);
    let definition_hash = hash_str(&canonical);
    PipelineDefinition::new(steps, definition_hash)
}

/// Builder alternativo: extrae los ids de los propios steps en orden, para no
/// mantener a mano el arreglo `step_ids`.
pub fn build_pipeline_definition_auto(steps: Vec<Box<dyn StepDefinition>>) -> PipelineDefinition {
    let ids: Vec<String> = steps.iter().map(|s| s.id().to_string()).collect();
    let id_refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
    build_pipeline_definition(&id_refs, steps)
}
