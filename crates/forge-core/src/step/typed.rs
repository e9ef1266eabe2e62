use serde::{de::DeserializeOwned, Serialize};

use super::{StepKind, StepRunResult};
use crate::errors::PipelineError;
use crate::model::ArtifactSpec;

/// Resultado tipado de ejecutar un `TypedStep`.
///
/// Permite trabajar con outputs fuertemente tipados durante la implementación
/// de pasos y convertirlos a la representación neutra que usa el engine.
pub enum StepRunResultTyped<Out: ArtifactSpec + Clone> {
    Success { outputs: Vec<Out> },
    Failure { error: PipelineError },
}

impl<Out: ArtifactSpec + Clone> StepRunResultTyped<Out> {
    /// Convierte a `StepRunResult` neutro serializando los outputs a
    /// `Artifact` mediante `ArtifactSpec::into_artifact`.
    pub fn into_neutral(self) -> StepRunResult {
        match self {
            StepRunResultTyped::Success { outputs } => {
                let arts = outputs.into_iter().map(|o| o.into_artifact()).collect();
                StepRunResult::Success { outputs: arts }
            }
            StepRunResultTyped::Failure { error } => StepRunResult::Failure { error },
        }
    }
}

/// Interfaz de alto nivel para definir Steps con tipos fuertes
/// (Params / Input / Output).
///
/// Implementadores escriben `run_typed` con tipos concretos; el adaptador de
/// abajo convierte esa ejecución a la interfaz neutra `StepDefinition`.
pub trait TypedStep {
    /// Parámetros deserializables y clonables (soportan `Default`).
    type Params: DeserializeOwned + Serialize + Clone + Default;
    /// Tipo concreto esperado como input (implementa `ArtifactSpec`).
    type Input: ArtifactSpec + Clone;
    /// Tipo concreto producido como output (implementa `ArtifactSpec`).
    type Output: ArtifactSpec + Clone;

    /// Identificador estable del step dentro del pipeline.
    fn id(&self) -> &'static str;

    /// Nombre amigable (por defecto usa el id).
    fn name(&self) -> &str {
        self.id()
    }

    /// Tipo general del step.
    fn kind(&self) -> StepKind;

    /// Parámetros por defecto deterministas.
    fn params_default(&self) -> Self::Params {
        Default::default()
    }

    /// Ejecución tipada. Para `Source`, `input` será `None`.
    fn run_typed(&self, input: Option<Self::Input>, params: Self::Params) -> StepRunResultTyped<Self::Output>;
}

// -------------------------------------------------------------
// Adaptador: cualquier `TypedStep` implementa `StepDefinition` neutro.
// -------------------------------------------------------------
impl<T> crate::step::StepDefinition for T
    where T: TypedStep + 'static + std::fmt::Debug
{
    fn id(&self) -> &str {
        <Self as TypedStep>::id(self)
    }

    fn name(&self) -> &str {
        <Self as TypedStep>::name(self)
    }

    fn base_params(&self) -> serde_json::Value {
        serde_json::to_value(self.params_default()).unwrap_or(serde_json::Value::Null)
    }

    fn run(&self, ctx: &crate::model::ExecutionContext) -> StepRunResult {
        // Decodifica los params (si fallan, usa los defaults del step)
        let params: <Self as TypedStep>::Params = ctx.params_as().unwrap_or_else(|_| self.params_default());

        // Decodifica el input si existe; un input presente pero indecodificable
        // es un fallo terminal, no un panic
        let typed_in: Option<<Self as TypedStep>::Input> = match &ctx.input {
            None => None,
            Some(a) => match <Self as TypedStep>::Input::from_artifact(a) {
                Ok(v) => Some(v),
                Err(e) => {
                    return StepRunResult::Failure { error: PipelineError::Internal(format!("input artifact decode: {e:?}")) }
                }
            },
        };

        if typed_in.is_none() && !matches!(<Self as TypedStep>::kind(self), StepKind::Source) {
            return StepRunResult::Failure { error: PipelineError::MissingInputs };
        }

        <Self as TypedStep>::run_typed(self, typed_in, params).into_neutral()
    }

    fn kind(&self) -> StepKind {
        <Self as TypedStep>::kind(self)
    }

    fn definition_hash(&self) -> String {
        let hash_input = serde_json::json!({
            "id": <Self as TypedStep>::id(self),
            "kind": format!("{:?}", <Self as TypedStep>::kind(self)),
            "base_params": <Self as crate::step::StepDefinition>::base_params(self),
            "type": std::any::type_name::<T>()
        });
        crate::hashing::hash_value(&hash_input)
    }
}
