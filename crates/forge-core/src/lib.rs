//! forge-core: motor lineal determinista del pipeline de aprovisionamiento
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod injection;
pub mod model;
pub mod repo;
pub mod step;

pub use engine::{PipelineCtx, PipelineEngine};
pub use errors::PipelineError;
pub use event::{BuildEvent, BuildEventKind, EventStore, InMemoryEventStore};
pub use injection::{CompositeInjector, ParamInjector};
pub use model::{Artifact, ArtifactKind};
pub use repo::{build_pipeline_definition, InMemoryPipelineRepository, PipelineDefinition, PipelineRepository};
pub use step::{Pipe, SameAs, StepDefinition, StepKind, StepRunResult, StepRunResultTyped, StepStatus, TypedStep};

// Los macros typed_artifact!/typed_step! se exportan en la raíz vía
// #[macro_export].
