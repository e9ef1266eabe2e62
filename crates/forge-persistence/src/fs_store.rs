//! Implementaciones sobre el sistema de archivos: event log append-only por
//! build (una línea JSON por evento) y blobs de artifacts por hash.
//!
//! El trait `EventStore` del core no retorna `Result` (los stores in-memory
//! no fallan); aquí un fallo de E/S se reporta por log y degrada a lista
//! vacía en lectura. El CLI valida el estado final contra los eventos, de
//! modo que una escritura perdida nunca publica una imagen incompleta.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use forge_core::event::{BuildEvent, BuildEventKind, EventStore};
use forge_core::model::Artifact;
use uuid::Uuid;

use crate::error::PersistenceError;

/// Event log en `<root>/events/<build_id>.jsonl`.
pub struct FsEventStore {
    events_dir: PathBuf,
}

impl FsEventStore {
    pub fn open(root: &Path) -> Result<Self, PersistenceError> {
        let events_dir = root.join("events");
        fs::create_dir_all(&events_dir)?;
        Ok(Self { events_dir })
    }

    fn events_path(&self, build_id: Uuid) -> PathBuf {
        self.events_dir.join(format!("{build_id}.jsonl"))
    }

    /// Lista los builds con eventos registrados.
    pub fn build_ids(&self) -> Vec<Uuid> {
        let Ok(entries) = fs::read_dir(&self.events_dir) else {
            return Vec::new();
        };
        let mut ids: Vec<Uuid> = entries.filter_map(|e| e.ok())
                                        .filter_map(|e| {
                                            let name = e.file_name().to_string_lossy().into_owned();
                                            name.strip_suffix(".jsonl").and_then(|s| Uuid::parse_str(s).ok())
                                        })
                                        .collect();
        ids.sort();
        ids
    }
}

impl EventStore for FsEventStore {
    fn append_kind(&mut self, build_id: Uuid, kind: BuildEventKind) -> BuildEvent {
        let seq = self.list(build_id).len() as u64;
        let ev = BuildEvent { seq,
                              build_id,
                              kind,
                              ts: Utc::now() };

        match serde_json::to_string(&ev) {
            Ok(line) => {
                let result = OpenOptions::new().create(true)
                                               .append(true)
                                               .open(self.events_path(build_id))
                                               .and_then(|mut f| writeln!(f, "{line}"));
                if let Err(e) = result {
                    log::error!("event append failed for build {build_id}: {e}");
                }
            }
            Err(e) => log::error!("event encode failed for build {build_id}: {e}"),
        }
        ev
    }

    fn list(&self, build_id: Uuid) -> Vec<BuildEvent> {
        let Ok(text) = fs::read_to_string(self.events_path(build_id)) else {
            return Vec::new();
        };
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<BuildEvent>(line) {
                Ok(ev) => Some(ev),
                Err(e) => {
                    log::warn!("skipping corrupt event line for build {build_id}: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Blobs de artifacts en `<root>/artifacts/<hash>.json`.
pub struct FsArtifactStore {
    artifacts_dir: PathBuf,
}

impl FsArtifactStore {
    pub fn open(root: &Path) -> Result<Self, PersistenceError> {
        let artifacts_dir = root.join("artifacts");
        fs::create_dir_all(&artifacts_dir)?;
        Ok(Self { artifacts_dir })
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        self.artifacts_dir.join(format!("{hash}.json"))
    }

    /// Persiste un artifact ya hasheado por el engine.
    pub fn store(&self, artifact: &Artifact) -> Result<(), PersistenceError> {
        if artifact.hash.is_empty() {
            return Err(PersistenceError::Corrupt("artifact without hash".to_string()));
        }
        let text = serde_json::to_string_pretty(artifact)?;
        fs::write(self.blob_path(&artifact.hash), text)?;
        Ok(())
    }

    pub fn load(&self, hash: &str) -> Result<Artifact, PersistenceError> {
        let text = fs::read_to_string(self.blob_path(hash))?;
        Ok(serde_json::from_str(&text)?)
    }
}
