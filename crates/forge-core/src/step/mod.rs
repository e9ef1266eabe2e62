//! Definiciones relacionadas a Steps.
//!
//! Un Step es la unidad ordenada de trabajo del pipeline: consume a lo sumo
//! un `Artifact` de entrada (el estado de imagen que dejó el paso anterior) y
//! produce 0..n artifacts de salida que el motor compromete como capa. Este
//! módulo define:
//! - `StepDefinition`: interfaz neutral usada por el engine.
//! - `TypedStep`: interfaz de alto nivel con tipos fuertes.
//! - `StepRunResult` y `StepStatus`.
//! - `Pipe` para construir pipelines tipados que validan IO en compilación.

pub mod definition;
pub mod macros;
pub mod pipeline;
mod run_result;
mod status;
pub mod typed;

pub use definition::{StepDefinition, StepKind};
pub use pipeline::{Pipe, SameAs};
pub use run_result::StepRunResult;
pub use status::StepStatus;
pub use typed::{StepRunResultTyped, TypedStep};
