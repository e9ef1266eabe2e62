use serde_json::Value;

use super::run_result::StepRunResult;
use crate::model::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Source,
    Transform,
    Sink,
}

/// Trait que define un Step del pipeline.
///
/// El contrato con el motor: un step nunca se reordena respecto de su
/// posición declarada y sólo observa el estado que dejó el paso anterior
/// (input + params); el resultado es un éxito con outputs o un fallo
/// terminal.
pub trait StepDefinition {
    /// Identificador estable y único dentro del pipeline.
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str {
        self.id()
    }

    /// Parámetros base deterministas (defaults). Se fusionan con los
    /// inyectores registrados en el engine.
    fn base_params(&self) -> Value;

    /// Ejecución del step contra el estado que dejó el paso anterior.
    fn run(&self, ctx: &ExecutionContext) -> StepRunResult;

    /// Tipo general del step.
    fn kind(&self) -> StepKind;

    /// Hash estable de la definición del step (participa del fingerprint de
    /// fallo).
    fn definition_hash(&self) -> String {
        let hash_input = serde_json::json!({
            "id": self.id(),
            "kind": format!("{:?}", self.kind()),
            "base_params": self.base_params(),
        });
        crate::hashing::hash_value(&hash_input)
    }
}
