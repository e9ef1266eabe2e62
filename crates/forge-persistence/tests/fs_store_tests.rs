use std::fs;

use chrono::Utc;
use forge_core::event::{BuildEventKind, EventStore};
use forge_core::model::{Artifact, ArtifactKind};
use forge_domain::ImageConfig;
use forge_persistence::{FsArtifactStore, FsEventStore, ImageStore, PersistenceError, PublishedImage};
use uuid::Uuid;

#[test]
fn event_log_append_and_list_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsEventStore::open(dir.path()).unwrap();
    let build_id = Uuid::new_v4();

    let first = store.append_kind(build_id,
                                  BuildEventKind::PipelineInitialized { definition_hash: "h".to_string(),
                                                                        step_count: 5 });
    assert_eq!(first.seq, 0);
    let second = store.append_kind(build_id,
                                   BuildEventKind::StepStarted { step_index: 0,
                                                                 step_id: "prepare_base".to_string() });
    assert_eq!(second.seq, 1);

    let events = store.list(build_id);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0].kind, BuildEventKind::PipelineInitialized { .. }));
    assert!(matches!(events[1].kind, BuildEventKind::StepStarted { .. }));

    assert_eq!(store.build_ids(), vec![build_id]);
}

#[test]
fn corrupt_event_lines_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsEventStore::open(dir.path()).unwrap();
    let build_id = Uuid::new_v4();
    store.append_kind(build_id,
                      BuildEventKind::PipelineInitialized { definition_hash: "h".to_string(),
                                                            step_count: 1 });

    let path = dir.path().join("events").join(format!("{build_id}.jsonl"));
    let mut text = fs::read_to_string(&path).unwrap();
    text.push_str("{not json}\n");
    fs::write(&path, text).unwrap();

    let events = store.list(build_id);
    assert_eq!(events.len(), 1);
}

#[test]
fn artifact_blobs_roundtrip_by_hash() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(dir.path()).unwrap();

    let artifact = Artifact { kind: ArtifactKind::GenericJson,
                              hash: "abc123".to_string(),
                              payload: serde_json::json!({"manifest_root": "fff"}),
                              metadata: None };
    store.store(&artifact).unwrap();
    let loaded = store.load("abc123").unwrap();
    assert_eq!(loaded.hash, "abc123");
    assert_eq!(loaded.payload["manifest_root"], "fff");

    assert!(matches!(store.load("missing"), Err(PersistenceError::NotFound)));
}

#[test]
fn unhashed_artifact_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(dir.path()).unwrap();
    let artifact = Artifact { kind: ArtifactKind::GenericJson,
                              hash: String::new(),
                              payload: serde_json::json!({}),
                              metadata: None };
    assert!(matches!(store.store(&artifact), Err(PersistenceError::Corrupt(_))));
}

fn sample_image(user: Option<&str>, entrypoint: Option<Vec<String>>) -> PublishedImage {
    PublishedImage { name: "proxy-image".to_string(),
                     base: "scratch".to_string(),
                     manifest_root: "d".repeat(64),
                     layers: vec!["l1".to_string(), "l2".to_string()],
                     config: ImageConfig { user: user.map(|u| u.to_string()),
                                           entrypoint },
                     pipeline_fingerprint: "fp".to_string(),
                     published_at: Utc::now() }
}

#[test]
fn publish_and_load_a_complete_image() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::open(dir.path()).unwrap();

    let image = sample_image(Some("proxyadmin"), Some(vec!["/usr/local/bin/proxy".to_string()]));
    let published_dir = store.publish(&image).unwrap();
    assert!(published_dir.join("image.json").is_file());

    let loaded = store.load("proxy-image", &image.manifest_root).unwrap();
    assert_eq!(loaded.config.user.as_deref(), Some("proxyadmin"));
    assert_eq!(loaded.layers, image.layers);
}

#[test]
fn incomplete_builds_are_never_published() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::open(dir.path()).unwrap();

    let without_entrypoint = sample_image(Some("proxyadmin"), None);
    assert!(matches!(store.publish(&without_entrypoint), Err(PersistenceError::Incomplete(_))));

    let without_identity = sample_image(None, Some(vec!["/usr/local/bin/proxy".to_string()]));
    assert!(matches!(store.publish(&without_identity), Err(PersistenceError::Incomplete(_))));
}
