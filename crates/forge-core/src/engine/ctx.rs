//! Build context implementation

use uuid::Uuid;

use crate::engine::PipelineEngine;
use crate::errors::PipelineError;
use crate::event::EventStore;
use crate::repo::PipelineRepository;
use crate::PipelineDefinition;

/// Contexto de ejecución para un build específico.
///
/// API ergonómica para ejecutar pasos y gestionar el estado de un build
/// dentro de un `PipelineEngine`.
pub struct PipelineCtx<'a, E: EventStore, R: PipelineRepository> {
    pub engine: &'a mut PipelineEngine<E, R>,
    pub build_id: Uuid,
    pub definition: &'a PipelineDefinition,
}

impl<'a, E: EventStore, R: PipelineRepository> PipelineCtx<'a, E, R> {
    /// Crea un nuevo contexto de build
    #[inline]
    pub fn new(engine: &'a mut PipelineEngine<E, R>, build_id: Uuid, definition: &'a PipelineDefinition) -> Self {
        Self { engine,
               build_id,
               definition }
    }

    /// Ejecuta el siguiente paso del build
    #[inline]
    pub fn step(&mut self) -> Result<(), PipelineError> {
        self.engine.next_with(self.build_id, self.definition)
    }

    /// Ejecuta hasta `n` pasos o hasta un error terminal
    #[inline]
    pub fn run_n(&mut self, n: usize) -> Result<(), PipelineError> {
        for _ in 0..n {
            match self.step() {
                Ok(()) => continue,
                Err(PipelineError::PipelineCompleted) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Ejecuta pasos hasta que el build complete o falle
    #[inline]
    pub fn run_to_completion(&mut self) -> Result<(), PipelineError> {
        loop {
            match self.step() {
                Ok(()) => continue,
                Err(PipelineError::PipelineCompleted) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}
