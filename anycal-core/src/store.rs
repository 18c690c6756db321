//! Local event storage.
//!
//! The engine only needs a narrow seam over the system of record; the
//! in-memory implementation backs the server, the CLI, and tests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::event::LocalEvent;

/// Storage for local events, keyed by event id.
pub trait LocalStore: Send + Sync {
    /// All events belonging to a link.
    fn events_for_link(&self, link_id: &str) -> Vec<LocalEvent>;

    /// Look up the local counterpart of a remote event.
    fn find_by_external_id(&self, link_id: &str, external_id: &str) -> Option<LocalEvent>;

    fn insert(&self, event: LocalEvent);

    /// Replace the stored event with the same id.
    fn update(&self, event: LocalEvent);

    /// Record the provider-assigned id after a push created the remote
    /// counterpart, aligning the local timestamp with the remote one so the
    /// next pull classifies the pair as up to date.
    fn set_external_id(&self, event_id: &str, external_id: &str, last_modified: DateTime<Utc>);
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<String, LocalEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn events_for_link(&self, link_id: &str) -> Vec<LocalEvent> {
        let mut events: Vec<LocalEvent> = self
            .events
            .read()
            .values()
            .filter(|e| e.link_id == link_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        events
    }

    fn find_by_external_id(&self, link_id: &str, external_id: &str) -> Option<LocalEvent> {
        self.events
            .read()
            .values()
            .find(|e| e.link_id == link_id && e.external_id.as_deref() == Some(external_id))
            .cloned()
    }

    fn insert(&self, event: LocalEvent) {
        self.events.write().insert(event.id.clone(), event);
    }

    fn update(&self, event: LocalEvent) {
        self.events.write().insert(event.id.clone(), event);
    }

    fn set_external_id(&self, event_id: &str, external_id: &str, last_modified: DateTime<Utc>) {
        if let Some(event) = self.events.write().get_mut(event_id) {
            event.external_id = Some(external_id.to_string());
            event.last_modified = last_modified;
        }
    }
}
