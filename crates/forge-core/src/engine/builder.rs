//! Builder para `PipelineEngine`.
//!
//! Patrón builder seguro en tiempo de compilación: obliga a declarar el
//! primer paso (fuente) y a encadenar pasos cuyos tipos de entrada y salida
//! sean compatibles.
//!
//! Notas de diseño
//! - `EngineBuilderInit` representa el estado inicial: stores (event_store +
//!   repository) presentes.
//! - `EngineBuilder<S, E, R>` conserva el último tipo de salida conocido
//!   `S::Output` (mediante `PhantomData`) y la lista de pasos como
//!   `Vec<Box<dyn StepDefinition>>`.
//! - `add_step` impone en sus bounds que la entrada del siguiente paso sea
//!   compatible con la salida del anterior usando `SameAs`.

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::engine::PipelineEngine;
use crate::event::EventStore;
use crate::repo::PipelineRepository;
use crate::step::{SameAs, StepDefinition, StepKind, TypedStep};

/// Estado inicial del builder.
#[derive(Debug)]
pub struct EngineBuilderInit<E: EventStore, R: PipelineRepository> {
    /// Store de eventos que usará el engine.
    pub event_store: E,
    /// Repositorio de definiciones/estado del build.
    pub repository: R,
}

impl<E: EventStore, R: PipelineRepository> EngineBuilderInit<E, R> {
    /// Define el primer paso del pipeline y transiciona al builder completo.
    ///
    /// El primer paso conceptualmente debe ser una fuente; la aserción ayuda
    /// durante el desarrollo y el engine lo re-verifica en ejecución.
    #[inline]
    pub fn first_step<S>(self, step: S) -> EngineBuilder<S, E, R>
        where S: TypedStep + Debug + 'static
    {
        debug_assert!(matches!(step.kind(), StepKind::Source),
                      "El primer paso debe ser de tipo Source");

        EngineBuilder { event_store: self.event_store,
                        repository: self.repository,
                        steps: vec![Box::new(step)],
                        _out: PhantomData::<S::Output> }
    }
}

/// Builder principal que acumula pasos y garantiza compatibilidad de tipos.
pub struct EngineBuilder<S: TypedStep + Debug + 'static, E: EventStore, R: PipelineRepository> {
    event_store: E,
    repository: R,
    /// Lista de pasos que conforman la definición del pipeline.
    steps: Vec<Box<dyn StepDefinition>>,
    /// Marcador de tipo para el output del último paso añadido.
    _out: PhantomData<S::Output>,
}

impl<S: TypedStep + Debug + 'static, E: EventStore, R: PipelineRepository> EngineBuilder<S, E, R> {
    /// Añade un siguiente paso al pipeline.
    ///
    /// `N::Input: SameAs<S::Output>` asegura que la entrada del nuevo paso es
    /// compatible con la salida del anterior. Consumimos `self` porque el
    /// builder cambia de estado.
    #[inline]
    pub fn add_step<N>(mut self, next: N) -> EngineBuilder<N, E, R>
        where N: TypedStep + Debug + 'static,
              N::Input: SameAs<S::Output>
    {
        self.steps.push(Box::new(next));

        EngineBuilder { event_store: self.event_store,
                        repository: self.repository,
                        steps: self.steps,
                        _out: PhantomData }
    }

    /// Construye el `PipelineEngine` final usando las stores y los pasos.
    ///
    /// Genera automáticamente la definición del pipeline a partir de
    /// `self.steps` y la fija como definición por defecto.
    #[inline]
    pub fn build(self) -> PipelineEngine<E, R> {
        let mut engine = PipelineEngine::new_with_stores(self.event_store, self.repository);
        let definition = crate::repo::build_pipeline_definition_auto(self.steps);
        engine.set_default_definition(definition);
        engine
    }
}
