//! Engine module for PipelineEngine implementation
//!
//! Provides the core engine, builder pattern, and build context for
//! deterministic pipeline execution.

pub mod builder;
pub mod core;
pub mod ctx;

pub use builder::{EngineBuilder, EngineBuilderInit};
pub use core::PipelineEngine;
pub use ctx::PipelineCtx;

pub use crate::event::{BuildEvent, BuildEventKind, EventStore, InMemoryEventStore};
pub use crate::repo::{InMemoryPipelineRepository, PipelineDefinition, PipelineRepository};
pub use crate::step::{StepRunResult, StepStatus};

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Artifact, ArtifactKind};
    use crate::step::{StepDefinition, StepKind};

    // Paso fuente de ejemplo
    #[derive(Debug)]
    struct SourceStep;

    impl StepDefinition for SourceStep {
        fn id(&self) -> &str {
            "source"
        }
        fn base_params(&self) -> serde_json::Value {
            json!({})
        }
        fn run(&self, _ctx: &crate::model::ExecutionContext) -> StepRunResult {
            StepRunResult::Success { outputs: vec![Artifact { kind: ArtifactKind::GenericJson,
                                                              payload: json!({"data": "base"}),
                                                              hash: String::new(),
                                                              metadata: None }] }
        }
        fn kind(&self) -> StepKind {
            StepKind::Source
        }
    }

    // Paso transformador de ejemplo
    #[derive(Debug)]
    struct TransformStep;

    impl StepDefinition for TransformStep {
        fn id(&self) -> &str {
            "transform"
        }
        fn base_params(&self) -> serde_json::Value {
            json!({})
        }
        fn run(&self, ctx: &crate::model::ExecutionContext) -> StepRunResult {
            if let Some(input) = &ctx.input {
                StepRunResult::Success { outputs: vec![Artifact { kind: ArtifactKind::GenericJson,
                                                                  payload: json!({
                                                                      "transformed": input.payload["data"],
                                                                      "processed": true
                                                                  }),
                                                                  hash: String::new(),
                                                                  metadata: None }] }
            } else {
                StepRunResult::Failure { error: crate::errors::PipelineError::MissingInputs }
            }
        }
        fn kind(&self) -> StepKind {
            StepKind::Transform
        }
    }

    // Paso sumidero de ejemplo
    #[derive(Debug)]
    struct SinkStep;

    impl StepDefinition for SinkStep {
        fn id(&self) -> &str {
            "sink"
        }
        fn base_params(&self) -> serde_json::Value {
            json!({})
        }
        fn run(&self, ctx: &crate::model::ExecutionContext) -> StepRunResult {
            if ctx.input.is_some() {
                StepRunResult::Success { outputs: vec![] }
            } else {
                StepRunResult::Failure { error: crate::errors::PipelineError::MissingInputs }
            }
        }
        fn kind(&self) -> StepKind {
            StepKind::Sink
        }
    }

    fn linear_definition() -> PipelineDefinition {
        crate::repo::build_pipeline_definition_auto(vec![Box::new(SourceStep),
                                                         Box::new(TransformStep),
                                                         Box::new(SinkStep)])
    }

    #[test]
    fn test_engine_runs_linear_definition() {
        let mut engine: PipelineEngine<_, _> =
            PipelineEngine::new_with_stores(InMemoryEventStore::default(), InMemoryPipelineRepository::new());
        engine.set_default_definition(linear_definition());

        let build_id = engine.run().expect("el pipeline debería completarse");
        assert!(!build_id.to_string().is_empty());

        let variants = engine.event_variants().expect("deberían existir variantes");
        assert_eq!(variants, vec!["I", "S", "L", "S", "L", "S", "L", "C"]);
        assert!(engine.pipeline_fingerprint().is_some());
    }

    #[test]
    fn test_engine_step_by_step() {
        let mut engine: PipelineEngine<_, _> =
            PipelineEngine::new_with_stores(InMemoryEventStore::default(), InMemoryPipelineRepository::new());
        engine.set_default_definition(linear_definition());

        assert!(engine.step().is_ok()); // source
        assert!(engine.step().is_ok()); // transform
        assert!(engine.step().is_ok()); // sink
        // El build ya se completó
        assert!(matches!(engine.step(), Err(crate::errors::PipelineError::PipelineCompleted)));
    }

    #[test]
    fn test_first_step_must_be_source() {
        let def = crate::repo::build_pipeline_definition_auto(vec![Box::new(TransformStep) as Box<dyn StepDefinition>]);
        let mut engine: PipelineEngine<_, _> =
            PipelineEngine::new_with_stores(InMemoryEventStore::default(), InMemoryPipelineRepository::new());
        engine.set_default_definition(def);
        assert!(matches!(engine.step(), Err(crate::errors::PipelineError::FirstStepMustBeSource)));
    }

    #[test]
    fn test_pipeline_ctx_drives_build() {
        let mut engine: PipelineEngine<_, _> =
            PipelineEngine::new_with_stores(InMemoryEventStore::default(), InMemoryPipelineRepository::new());
        let definition = linear_definition();
        let build_id = engine.ensure_default_build_id();

        let mut ctx = PipelineCtx::new(&mut engine, build_id, &definition);
        assert!(ctx.step().is_ok());
        assert!(ctx.run_n(2).is_ok());
        assert!(matches!(ctx.step(), Err(crate::errors::PipelineError::PipelineCompleted)));
    }
}
