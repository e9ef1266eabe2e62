//! Macros utilitarias para reducir boilerplate al definir Artifacts y Steps
//! tipados.
//!
//! Exportadas en la raíz del crate para poder usarlas como:
//!   use forge_core::{typed_artifact, typed_step};
//!
//! A diferencia del adaptador neutro, el cuerpo de `run` declarado con
//! `typed_step!` evalúa a `Result<Output, PipelineError>`: los pasos de
//! aprovisionamiento son falibles por contrato y el macro mapea `Err` a un
//! fallo terminal del step.

/// Declara un Artifact tipado con derives y `ArtifactSpec`.
///
/// Formas soportadas:
/// - typed_artifact!(Name { field1: Ty1, field2: Ty2 }); // KIND GenericJson
/// - typed_artifact!(Name { field1: Ty1 } kind: $kind_expr);
#[macro_export]
macro_rules! typed_artifact {
    // Con KIND explícito
    ($name:ident { $($fname:ident : $fty:ty),+ $(,)? } kind: $kind:expr) => {
        #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
        pub struct $name { $(pub $fname: $fty,)+ pub schema_version: u32 }
        impl $crate::model::ArtifactSpec for $name {
            const KIND: $crate::model::ArtifactKind = $kind;
        }
    };
    // KIND por defecto GenericJson
    ($name:ident { $($fname:ident : $fty:ty),+ $(,)? }) => {
        $crate::typed_artifact!($name { $($fname : $fty),+ } kind: $crate::model::ArtifactKind::GenericJson);
    };
}

#[macro_export]
macro_rules! typed_step {
    // ---------------- Source con fields y defaults propios ----------------
    // `defaults` permite que el step transporte sus parámetros (p. ej. los
    // valores del plan) como base determinista, en lugar de `Default`.
    (
        source $name:ident {
            id: $id:expr,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , defaults($self_d:ident) $dbody:block
            , run($self_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name { $(pub $fname: $fty),+ }
        impl $name { pub fn new($($fname : $fty),+) -> Self { Self { $($fname),+ } } }
        impl $crate::step::TypedStep for $name {
            type Params = $params;
            type Input = $out;   // ignorado (Source)
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::step::StepKind { $crate::step::StepKind::Source }
            fn params_default(&self) -> Self::Params {
                let $self_d = self;
                $dbody
            }
            fn run_typed(&self, _input: Option<Self::Input>, $p_ident: Self::Params)
                         -> $crate::step::StepRunResultTyped<Self::Output> {
                let $self_ident = self;
                let out: Result<Self::Output, $crate::errors::PipelineError> = { $body };
                match out {
                    Ok(o) => $crate::step::StepRunResultTyped::Success { outputs: vec![o] },
                    Err(error) => $crate::step::StepRunResultTyped::Failure { error },
                }
            }
        }
    };

    // ---------------- Step Transform/Sink con fields y defaults propios ----------------
    (
        step $name:ident {
            id: $id:expr,
            kind: $kind:expr,
            input: $inp:ty,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , defaults($self_d:ident) $dbody:block
            , run($self_ident:ident, $inp_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name { $(pub $fname: $fty),+ }
        impl $name { pub fn new($($fname : $fty),+) -> Self { Self { $($fname),+ } } }
        impl $crate::step::TypedStep for $name {
            type Params = $params;
            type Input = $inp;
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::step::StepKind { $kind }
            fn params_default(&self) -> Self::Params {
                let $self_d = self;
                $dbody
            }
            fn run_typed(&self, input: Option<Self::Input>, $p_ident: Self::Params)
                         -> $crate::step::StepRunResultTyped<Self::Output> {
                let $self_ident = self;
                let $inp_ident: Self::Input = match input {
                    Some(i) => i,
                    None => return $crate::step::StepRunResultTyped::Failure {
                        error: $crate::errors::PipelineError::MissingInputs,
                    },
                };
                let out: Result<Self::Output, $crate::errors::PipelineError> = { $body };
                match out {
                    Ok(o) => $crate::step::StepRunResultTyped::Success { outputs: vec![o] },
                    Err(error) => $crate::step::StepRunResultTyped::Failure { error },
                }
            }
        }
    };

    // ---------------- Source con fields ----------------
    (
        source $name:ident {
            id: $id:expr,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , run($self_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name { $(pub $fname: $fty),+ }
        impl $name { pub fn new($($fname : $fty),+) -> Self { Self { $($fname),+ } } }
        impl $crate::step::TypedStep for $name {
            type Params = $params;
            type Input = $out;   // ignorado (Source)
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::step::StepKind { $crate::step::StepKind::Source }
            fn run_typed(&self, _input: Option<Self::Input>, $p_ident: Self::Params)
                         -> $crate::step::StepRunResultTyped<Self::Output> {
                let $self_ident = self;
                let out: Result<Self::Output, $crate::errors::PipelineError> = { $body };
                match out {
                    Ok(o) => $crate::step::StepRunResultTyped::Success { outputs: vec![o] },
                    Err(error) => $crate::step::StepRunResultTyped::Failure { error },
                }
            }
        }
    };

    // ---------------- Source unit (sin fields) ----------------
    (
        source $name:ident {
            id: $id:expr,
            output: $out:ty,
            params: $params:ty,
            run($self_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name;
        impl $name { pub fn new() -> Self { Self } }
        impl $crate::step::TypedStep for $name {
            type Params = $params;
            type Input = $out;   // ignorado (Source)
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::step::StepKind { $crate::step::StepKind::Source }
            fn run_typed(&self, _input: Option<Self::Input>, $p_ident: Self::Params)
                         -> $crate::step::StepRunResultTyped<Self::Output> {
                let $self_ident = self;
                let out: Result<Self::Output, $crate::errors::PipelineError> = { $body };
                match out {
                    Ok(o) => $crate::step::StepRunResultTyped::Success { outputs: vec![o] },
                    Err(error) => $crate::step::StepRunResultTyped::Failure { error },
                }
            }
        }
    };

    // ---------------- Step Transform/Sink con fields ----------------
    (
        step $name:ident {
            id: $id:expr,
            kind: $kind:expr,
            input: $inp:ty,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , run($self_ident:ident, $inp_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name { $(pub $fname: $fty),+ }
        impl $name { pub fn new($($fname : $fty),+) -> Self { Self { $($fname),+ } } }
        impl $crate::step::TypedStep for $name {
            type Params = $params;
            type Input = $inp;
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::step::StepKind { $kind }
            fn run_typed(&self, input: Option<Self::Input>, $p_ident: Self::Params)
                         -> $crate::step::StepRunResultTyped<Self::Output> {
                let $self_ident = self;
                // El adaptador neutro garantiza input presente para no-Source
                let $inp_ident: Self::Input = match input {
                    Some(i) => i,
                    None => return $crate::step::StepRunResultTyped::Failure {
                        error: $crate::errors::PipelineError::MissingInputs,
                    },
                };
                let out: Result<Self::Output, $crate::errors::PipelineError> = { $body };
                match out {
                    Ok(o) => $crate::step::StepRunResultTyped::Success { outputs: vec![o] },
                    Err(error) => $crate::step::StepRunResultTyped::Failure { error },
                }
            }
        }
    };

    // ---------------- Step Transform/Sink unit (sin fields) ----------------
    (
        step $name:ident {
            id: $id:expr,
            kind: $kind:expr,
            input: $inp:ty,
            output: $out:ty,
            params: $params:ty,
            run($self_ident:ident, $inp_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name;
        impl $name { pub fn new() -> Self { Self } }
        impl $crate::step::TypedStep for $name {
            type Params = $params;
            type Input = $inp;
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::step::StepKind { $kind }
            fn run_typed(&self, input: Option<Self::Input>, $p_ident: Self::Params)
                         -> $crate::step::StepRunResultTyped<Self::Output> {
                let $self_ident = self;
                let $inp_ident: Self::Input = match input {
                    Some(i) => i,
                    None => return $crate::step::StepRunResultTyped::Failure {
                        error: $crate::errors::PipelineError::MissingInputs,
                    },
                };
                let out: Result<Self::Output, $crate::errors::PipelineError> = { $body };
                match out {
                    Ok(o) => $crate::step::StepRunResultTyped::Success { outputs: vec![o] },
                    Err(error) => $crate::step::StepRunResultTyped::Failure { error },
                }
            }
        }
    };
}
