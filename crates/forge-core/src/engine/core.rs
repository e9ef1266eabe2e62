//! Core PipelineEngine implementation

use std::collections::HashMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::constants::ENGINE_VERSION;
use crate::engine::EngineBuilderInit;
use crate::errors::PipelineError;
use crate::event::{BuildEvent, BuildEventKind, EventStore};
use crate::hashing::hash_value;
use crate::injection::{CompositeInjector, ParamInjector};
use crate::model::{Artifact, ExecutionContext, StepFingerprintInput};
use crate::repo::{PipelineDefinition, PipelineInstance, PipelineRepository};
use crate::step::{StepDefinition, StepKind, StepRunResult};

/// Motor de ejecución del pipeline de aprovisionamiento.
///
/// Es el único componente con estado entre pasos: secuencia los steps en su
/// orden declarado, compromete cada éxito como capa inmutable en el event
/// store y garantiza stop-on-failure. No hay reintentos ni limpieza de capas
/// parciales: un build fallido se descarta y el invocador vuelve a partir de
/// una base limpia.
pub struct PipelineEngine<E, R>
    where E: EventStore,
          R: PipelineRepository
{
    event_store: E,
    repository: R,
    artifact_store: HashMap<String, Artifact>,
    injectors: Vec<Box<dyn ParamInjector>>,
    default_build_id: Option<Uuid>,
    default_definition: Option<PipelineDefinition>,
}

impl<E, R> PipelineEngine<E, R>
    where E: EventStore,
          R: PipelineRepository
{
    /// Crea un nuevo builder para configurar el engine
    #[inline]
    pub fn builder(event_store: E, repository: R) -> EngineBuilderInit<E, R> {
        EngineBuilderInit { event_store, repository }
    }

    /// Crea un nuevo engine con stores en memoria
    #[inline]
    pub fn new() -> EngineBuilderInit<crate::event::InMemoryEventStore, crate::repo::InMemoryPipelineRepository> {
        EngineBuilderInit { event_store: crate::event::InMemoryEventStore::default(),
                            repository: crate::repo::InMemoryPipelineRepository::new() }
    }

    /// Crea un nuevo motor con los stores proporcionados
    pub fn new_with_stores(event_store: E, repository: R) -> Self {
        Self { event_store,
               repository,
               artifact_store: HashMap::new(),
               injectors: Vec::new(),
               default_build_id: None,
               default_definition: None }
    }

    /// Añade un inyector de parámetros
    pub fn add_injector(&mut self, injector: Box<dyn ParamInjector>) {
        self.injectors.push(injector);
    }

    /// Recupera un artifact por su hash
    pub fn get_artifact(&self, hash: &str) -> Option<&Artifact> {
        self.artifact_store.get(hash)
    }

    /// Almacena un artifact en la cache local
    pub fn store_artifact(&mut self, artifact: Artifact) {
        self.artifact_store.insert(artifact.hash.clone(), artifact);
    }

    /// Acceso de sólo lectura al event store.
    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    /// Garantiza el `PipelineInitialized` y retorna los eventos actuales del
    /// build (incluyendo el posiblemente recién agregado).
    fn load_or_init(&mut self, build_id: Uuid, definition: &PipelineDefinition) -> Vec<BuildEvent> {
        let mut events = self.event_store.list(build_id);
        let has_init = events.iter().any(|e| matches!(e.kind, BuildEventKind::PipelineInitialized { .. }));
        if !has_init {
            let ev = self.event_store
                         .append_kind(build_id,
                                      BuildEventKind::PipelineInitialized { definition_hash:
                                                                                definition.definition_hash.clone(),
                                                                            step_count: definition.len() });
            events.push(ev);
        }
        self.default_build_id = Some(build_id);
        events
    }

    /// Define/genera un `build_id` por defecto si no existe aún y lo retorna.
    pub fn ensure_default_build_id(&mut self) -> Uuid {
        if self.default_build_id.is_none() {
            self.default_build_id = Some(Uuid::new_v4());
        }
        self.default_build_id.unwrap_or_default()
    }

    /// Fija explícitamente un `build_id` por defecto.
    pub fn set_default_build_id(&mut self, build_id: Uuid) {
        self.default_build_id = Some(build_id);
    }

    /// Obtiene el `build_id` por defecto si está configurado.
    pub fn default_build_id(&self) -> Option<Uuid> {
        self.default_build_id
    }

    /// Configura la definición por defecto del pipeline
    pub fn set_default_definition(&mut self, definition: PipelineDefinition) {
        self.default_definition = Some(definition);
    }

    /// Definición por defecto, si está configurada.
    pub fn default_definition(&self) -> Option<&PipelineDefinition> {
        self.default_definition.as_ref()
    }

    fn hash_and_store_outputs(&mut self, outputs: &mut [Artifact]) -> Vec<String> {
        let mut hashes: Vec<String> = Vec::with_capacity(outputs.len());
        for o in outputs.iter_mut() {
            let h = hash_value(&o.payload);
            o.hash = h.clone();
            self.store_artifact(o.clone());
            hashes.push(h);
        }
        hashes
    }

    /// Ejecuta el pipeline completo y retorna el ID del build ejecutado
    pub fn run(&mut self) -> Result<Uuid, PipelineError> {
        self.run_to_completion()
    }

    /// Avanza un paso en la ejecución del pipeline
    pub fn step(&mut self) -> Result<(), PipelineError> {
        self.next()
    }

    /// Ejecuta el pipeline completo usando la definición por defecto
    pub fn run_to_completion(&mut self) -> Result<Uuid, PipelineError> {
        let build_id = self.ensure_default_build_id();
        let def = self.default_definition
                      .take()
                      .ok_or_else(|| PipelineError::Internal("no default definition configured".into()))?;

        let result = self.run_build_to_completion(build_id, &def);
        self.default_definition = Some(def);
        result
    }

    /// Ejecuta un build específico hasta su finalización
    pub fn run_build_to_completion(&mut self, build_id: Uuid, definition: &PipelineDefinition)
                                   -> Result<Uuid, PipelineError> {
        loop {
            match self.next_with(build_id, definition) {
                Ok(()) => continue,
                Err(PipelineError::PipelineCompleted) => return Ok(build_id),
                Err(e) => return Err(e),
            }
        }
    }

    /// Ejecuta el siguiente paso pendiente del build.
    ///
    /// Regla de transición: sólo se avanza sobre el éxito inequívoco del paso
    /// anterior; un build fallido o completado no vuelve a avanzar.
    pub(crate) fn next_with(&mut self, build_id: Uuid, definition: &PipelineDefinition) -> Result<(), PipelineError> {
        let events = self.load_or_init(build_id, definition);
        let instance = self.repository.load(build_id, &events, definition);

        if instance.completed {
            return Err(PipelineError::PipelineCompleted);
        }
        if instance.failed {
            return Err(PipelineError::PipelineHasFailed);
        }

        let cursor = instance.cursor;
        if cursor >= definition.len() {
            return Err(PipelineError::PipelineCompleted);
        }

        let step_def: &dyn StepDefinition = definition.steps[cursor].as_ref();
        if cursor == 0 && !matches!(step_def.kind(), StepKind::Source) {
            return Err(PipelineError::FirstStepMustBeSource);
        }

        let input = if cursor == 0 {
            None
        } else {
            instance.steps
                    .get(cursor - 1)
                    .and_then(|s| s.outputs.first())
                    .and_then(|h| self.artifact_store.get(h).cloned())
        };

        let base = step_def.base_params();
        let params = if self.injectors.is_empty() {
            base.clone()
        } else {
            let pre = ExecutionContext { input: input.clone(),
                                         params: base.clone() };
            CompositeInjector::apply_injectors(&self.injectors, &base, &pre)
        };
        let ctx = ExecutionContext { input, params };

        let _started = self.event_store.append_kind(build_id,
                                                    BuildEventKind::StepStarted { step_index: cursor,
                                                                                  step_id: step_def.id().to_string() });

        match step_def.run(&ctx) {
            StepRunResult::Success { outputs } => {
                self.handle_step_success(build_id, cursor, step_def, outputs, definition)
            }
            StepRunResult::Failure { error } => self.handle_step_failure(build_id, cursor, step_def, error),
        }
    }

    fn handle_step_success(&mut self,
                           build_id: Uuid,
                           cursor: usize,
                           step_def: &dyn StepDefinition,
                           mut outputs: Vec<Artifact>,
                           definition: &PipelineDefinition)
                           -> Result<(), PipelineError> {
        let output_hashes = self.hash_and_store_outputs(&mut outputs);
        let fp = self.calculate_step_fingerprint(cursor, step_def, &output_hashes, definition);

        let _committed = self.event_store.append_kind(build_id,
                                                      BuildEventKind::LayerCommitted { step_index: cursor,
                                                                                       step_id:
                                                                                           step_def.id().to_string(),
                                                                                       outputs: output_hashes.clone(),
                                                                                       fingerprint: fp });

        if cursor + 1 == definition.len() {
            self.complete_pipeline(build_id, definition);
        }

        Ok(())
    }

    fn handle_step_failure(&mut self,
                           build_id: Uuid,
                           cursor: usize,
                           step_def: &dyn StepDefinition,
                           error: PipelineError)
                           -> Result<(), PipelineError> {
        let fp_json = json!({
            "engine_version": ENGINE_VERSION,
            "definition_hash": step_def.definition_hash(),
            "step_index": cursor,
            "params": step_def.base_params()
        });
        let fp = hash_value(&fp_json);

        let _ = self.event_store.append_kind(build_id,
                                             BuildEventKind::StepFailed { step_index: cursor,
                                                                          step_id: step_def.id().to_string(),
                                                                          error: error.clone(),
                                                                          fingerprint: fp });

        Err(error)
    }

    fn calculate_step_fingerprint(&self,
                                  cursor: usize,
                                  step_def: &dyn StepDefinition,
                                  output_hashes: &[String],
                                  definition: &PipelineDefinition)
                                  -> String {
        let params = step_def.base_params();
        let fp_input = StepFingerprintInput { engine_version: ENGINE_VERSION,
                                              definition_hash: &definition.definition_hash,
                                              step_index: cursor,
                                              output_hashes,
                                              params: &params };
        let fp_json = serde_json::to_value(&fp_input).unwrap_or(Value::Null);
        hash_value(&fp_json)
    }

    fn complete_pipeline(&mut self, build_id: Uuid, definition: &PipelineDefinition) {
        let events = self.event_store.list(build_id);
        let step_fps: Vec<String> = events.iter()
                                          .filter_map(|e| match &e.kind {
                                              BuildEventKind::LayerCommitted { fingerprint, .. } => {
                                                  Some(fingerprint.clone())
                                              }
                                              _ => None,
                                          })
                                          .collect();

        let pipeline_fp = hash_value(&json!({
                                         "engine_version": ENGINE_VERSION,
                                         "definition_hash": definition.definition_hash,
                                         "step_fingerprints": step_fps
                                     }));

        let _ = self.event_store
                    .append_kind(build_id, BuildEventKind::PipelineCompleted { pipeline_fingerprint: pipeline_fp });
    }

    /// Avanza un paso en el build por defecto
    pub fn next(&mut self) -> Result<(), PipelineError> {
        let build_id = self.ensure_default_build_id();
        let def = self.default_definition
                      .take()
                      .ok_or_else(|| PipelineError::Internal("no default definition configured".into()))?;

        let result = self.next_with(build_id, &def);
        self.default_definition = Some(def);
        result
    }

    /// Lista eventos del build por defecto
    pub fn events(&self) -> Option<Vec<BuildEvent>> {
        self.default_build_id.map(|bid| self.event_store.list(bid))
    }

    /// Lista eventos de un build arbitrario
    pub fn events_for(&self, build_id: Uuid) -> Vec<BuildEvent> {
        self.event_store.list(build_id)
    }

    /// Reconstruye la instancia (replay) de un build contra una definición.
    pub fn load_instance(&self, build_id: Uuid, definition: &PipelineDefinition) -> PipelineInstance {
        let events = self.event_store.list(build_id);
        self.repository.load(build_id, &events, definition)
    }

    /// Variante compacta de eventos para el build por defecto
    pub fn event_variants(&self) -> Option<Vec<&'static str>> {
        self.events().map(|events| {
                         events.iter()
                               .map(|e| match e.kind {
                                   BuildEventKind::PipelineInitialized { .. } => "I",
                                   BuildEventKind::StepStarted { .. } => "S",
                                   BuildEventKind::LayerCommitted { .. } => "L",
                                   BuildEventKind::StepFailed { .. } => "X",
                                   BuildEventKind::PipelineCompleted { .. } => "C",
                               })
                               .collect()
                     })
    }

    /// Fingerprint agregado del build por defecto si está completo
    pub fn pipeline_fingerprint(&self) -> Option<String> {
        let evs = self.events()?;
        evs.iter().rev().find_map(|e| match &e.kind {
                            BuildEventKind::PipelineCompleted { pipeline_fingerprint } => {
                                Some(pipeline_fingerprint.clone())
                            }
                            _ => None,
                        })
    }
}

impl Default for PipelineEngine<crate::event::InMemoryEventStore, crate::repo::InMemoryPipelineRepository> {
    fn default() -> Self {
        Self::new_with_stores(crate::event::InMemoryEventStore::default(),
                              crate::repo::InMemoryPipelineRepository::new())
    }
}
