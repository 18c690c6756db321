//! Provider-neutral event types.
//!
//! Providers convert their API responses into these types, and the sync
//! engine works exclusively with them for reconciliation and propagation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event as reported by an external provider. Transient: fetched per sync
/// pass and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// The provider's own identifier for the event.
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<Attendee>,
    /// Last modification timestamp on the provider side, when the provider
    /// reports one. `None` means the provider gives no recency signal.
    pub last_modified: Option<DateTime<Utc>>,
}

/// The system-of-record event, keyed by `external_id` once linked to its
/// remote counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub id: String,
    /// The calendar link this event belongs to.
    pub link_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<Attendee>,
    /// Provider-assigned identifier. `None` until the event has been pushed
    /// (or the event was created locally and never propagated).
    pub external_id: Option<String>,
    /// Per-event opt-out: events with this flag cleared are never touched by
    /// a sync pass, in either direction.
    pub sync_enabled: bool,
    /// Whether this event originated from a pull rather than local creation.
    pub pulled_from_provider: bool,
    pub last_modified: DateTime<Utc>,
}

/// An event participant. Providers differ in what they know about a person
/// (HubSpot has emails, GHL has phone numbers), so every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl LocalEvent {
    /// Create a new local event, not yet linked to any remote counterpart.
    pub fn new(link_id: impl Into<String>, title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        LocalEvent {
            id: uuid::Uuid::new_v4().to_string(),
            link_id: link_id.into(),
            title: title.into(),
            description: None,
            start,
            end,
            attendees: Vec::new(),
            external_id: None,
            sync_enabled: true,
            pulled_from_provider: false,
            last_modified: Utc::now(),
        }
    }

    /// Materialize a local event from a freshly pulled remote one.
    pub fn from_remote(link_id: impl Into<String>, remote: &RemoteEvent) -> Self {
        LocalEvent {
            id: uuid::Uuid::new_v4().to_string(),
            link_id: link_id.into(),
            title: remote.title.clone(),
            description: remote.description.clone(),
            start: remote.start,
            end: remote.end,
            attendees: remote.attendees.clone(),
            external_id: Some(remote.external_id.clone()),
            sync_enabled: true,
            pulled_from_provider: true,
            last_modified: remote.last_modified.unwrap_or_else(Utc::now),
        }
    }

    /// Overwrite the local fields with the remote state. Keeps identity and
    /// the sync opt-out flag.
    pub fn apply_remote(&mut self, remote: &RemoteEvent) {
        self.title = remote.title.clone();
        self.description = remote.description.clone();
        self.start = remote.start;
        self.end = remote.end;
        self.attendees = remote.attendees.clone();
        self.external_id = Some(remote.external_id.clone());
        self.pulled_from_provider = true;
        if let Some(modified) = remote.last_modified {
            self.last_modified = modified;
        }
    }
}

impl Attendee {
    pub fn named(name: impl Into<String>) -> Self {
        Attendee {
            name: Some(name.into()),
            email: None,
            phone: None,
        }
    }
}
