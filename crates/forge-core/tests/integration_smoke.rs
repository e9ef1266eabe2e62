use forge_core::repo::build_pipeline_definition;
use forge_core::{BuildEventKind, EventStore, InMemoryEventStore, PipelineEngine};
use uuid::Uuid;

#[test]
fn integration_smoke_inmemory_store_and_engine() {
    // El event store in-memory debe permitir append y list determinísticos
    let mut store = InMemoryEventStore::default();
    let _def = build_pipeline_definition(&["s1"], vec![]);
    let build_id = Uuid::new_v4();

    let ev = store.append_kind(build_id,
                               BuildEventKind::PipelineInitialized { definition_hash: "h1".to_string(),
                                                                     step_count: 1 });
    assert_eq!(ev.seq, 0);

    let repo = forge_core::repo::InMemoryPipelineRepository::new();
    let engine: PipelineEngine<_, _> = PipelineEngine::new_with_stores(store, repo);

    let events = engine.event_store().list(build_id);
    assert!(events.iter().any(|e| matches!(e.kind, BuildEventKind::PipelineInitialized { .. })),
            "PipelineInitialized missing");
}
