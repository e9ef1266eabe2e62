pub mod types;

pub use types::{build_pipeline_definition, build_pipeline_definition_auto, InMemoryPipelineRepository,
                PipelineDefinition, PipelineInstance, PipelineRepository, StepSlot};
