use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{BuildEvent, BuildEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo
    /// (con seq y ts).
    fn append_kind(&mut self, build_id: Uuid, kind: BuildEventKind) -> BuildEvent;
    /// Lista eventos de un build (orden ascendente por seq).
    fn list(&self, build_id: Uuid) -> Vec<BuildEvent>;
}

#[derive(Default)]
pub struct InMemoryEventStore {
    pub inner: HashMap<Uuid, Vec<BuildEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, build_id: Uuid, kind: BuildEventKind) -> BuildEvent {
        let events = self.inner.entry(build_id).or_default();
        let ev = BuildEvent { seq: events.len() as u64,
                              build_id,
                              kind,
                              ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, build_id: Uuid) -> Vec<BuildEvent> {
        self.inner.get(&build_id).cloned().unwrap_or_default()
    }
}
