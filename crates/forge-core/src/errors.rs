//! Errores del core del pipeline.
//!
//! `Step` transporta la taxonomía de fallos de aprovisionamiento de las capas
//! superiores (adapters) con un tag estable, sin que el core conozca su
//! semántica.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum PipelineError {
    #[error("pipeline already completed")]
    PipelineCompleted,
    #[error("pipeline has failed previously (stop-on-failure invariant)")]
    PipelineHasFailed,
    #[error("invalid step index")]
    InvalidStepIndex,
    #[error("missing required inputs")]
    MissingInputs,
    #[error("first step must be source kind")]
    FirstStepMustBeSource,
    #[error("step {kind}: {message}")]
    Step { kind: String, message: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Tag estable del fallo (taxonomía de adapters para variantes `Step`).
    pub fn kind_tag(&self) -> &str {
        match self {
            PipelineError::Step { kind, .. } => kind,
            PipelineError::PipelineCompleted => "pipeline_completed",
            PipelineError::PipelineHasFailed => "pipeline_has_failed",
            PipelineError::InvalidStepIndex => "invalid_step_index",
            PipelineError::MissingInputs => "missing_inputs",
            PipelineError::FirstStepMustBeSource => "first_step_must_be_source",
            PipelineError::Internal(_) => "internal",
        }
    }
}
