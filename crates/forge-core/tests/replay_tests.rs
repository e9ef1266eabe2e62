//! Replay del repositorio: el estado del build se reconstruye sólo desde los
//! eventos, y un StepFailed marca la instancia completa como fallida.

use chrono::Utc;
use forge_core::repo::{build_pipeline_definition, InMemoryPipelineRepository, PipelineRepository};
use forge_core::step::{StepDefinition, StepKind, StepRunResult};
use forge_core::{BuildEvent, BuildEventKind, PipelineError, StepStatus};
use uuid::Uuid;

#[derive(Debug)]
struct NamedStep(&'static str, StepKind);

impl StepDefinition for NamedStep {
    fn id(&self) -> &str {
        self.0
    }
    fn base_params(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn run(&self, _ctx: &forge_core::model::ExecutionContext) -> StepRunResult {
        StepRunResult::Success { outputs: vec![] }
    }
    fn kind(&self) -> StepKind {
        self.1
    }
}

fn event(build_id: Uuid, seq: u64, kind: BuildEventKind) -> BuildEvent {
    BuildEvent { seq,
                 build_id,
                 kind,
                 ts: Utc::now() }
}

#[test]
fn replay_marks_failed_instance() {
    let def = build_pipeline_definition(&["prepare", "install"],
                                        vec![Box::new(NamedStep("prepare", StepKind::Source)),
                                             Box::new(NamedStep("install", StepKind::Transform))]);
    let build_id = Uuid::new_v4();
    let events = vec![event(build_id, 0,
                            BuildEventKind::PipelineInitialized { definition_hash: def.definition_hash.clone(),
                                                                  step_count: 2 }),
                      event(build_id, 1,
                            BuildEventKind::StepStarted { step_index: 0,
                                                          step_id: "prepare".to_string() }),
                      event(build_id, 2,
                            BuildEventKind::LayerCommitted { step_index: 0,
                                                             step_id: "prepare".to_string(),
                                                             outputs: vec!["h0".to_string()],
                                                             fingerprint: "fp0".to_string() }),
                      event(build_id, 3,
                            BuildEventKind::StepStarted { step_index: 1,
                                                          step_id: "install".to_string() }),
                      event(build_id, 4,
                            BuildEventKind::StepFailed { step_index: 1,
                                                         step_id: "install".to_string(),
                                                         error: PipelineError::Step { kind: "installer_failure"
                                                                                                .to_string(),
                                                                                      message: "exit 1".to_string() },
                                                         fingerprint: "fpx".to_string() }),];

    let repo = InMemoryPipelineRepository::new();
    let instance = repo.load(build_id, &events, &def);

    assert!(instance.failed);
    assert!(!instance.completed);
    assert_eq!(instance.steps[0].status, StepStatus::FinishedOk);
    assert_eq!(instance.steps[0].outputs, vec!["h0".to_string()]);
    assert_eq!(instance.steps[1].status, StepStatus::Failed);
}

#[test]
fn replay_cursor_points_to_first_pending() {
    let def = build_pipeline_definition(&["prepare", "install"],
                                        vec![Box::new(NamedStep("prepare", StepKind::Source)),
                                             Box::new(NamedStep("install", StepKind::Transform))]);
    let build_id = Uuid::new_v4();
    let events = vec![event(build_id, 0,
                            BuildEventKind::PipelineInitialized { definition_hash: def.definition_hash.clone(),
                                                                  step_count: 2 }),
                      event(build_id, 1,
                            BuildEventKind::StepStarted { step_index: 0,
                                                          step_id: "prepare".to_string() }),
                      event(build_id, 2,
                            BuildEventKind::LayerCommitted { step_index: 0,
                                                             step_id: "prepare".to_string(),
                                                             outputs: vec![],
                                                             fingerprint: "fp0".to_string() }),];

    let repo = InMemoryPipelineRepository::new();
    let instance = repo.load(build_id, &events, &def);
    assert_eq!(instance.cursor, 1);
    assert!(!instance.failed);
}
