//! The adapter trait implemented by provider crates.
//!
//! Each provider translates its REST API into the normalized event types.
//! The engine drives adapters one page at a time so a sync can resume from a
//! pagination cursor after a transient failure.

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::AnycalResult;
use crate::event::{LocalEvent, RemoteEvent};
use crate::link::CalendarLink;

/// One page of remote events, plus the cursor to fetch the next one.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    /// Opaque continuation token; `None` means this was the last page.
    pub next_cursor: Option<String>,
    /// Items the provider returned that could not be mapped to a
    /// `RemoteEvent` (e.g. missing id). Counted as skipped, never fatal.
    pub malformed: usize,
}

/// A calendar provider adapter with the uniform
/// `{fetch_events, upsert_event}` capability set.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name for logs and messages.
    fn name(&self) -> &'static str;

    /// Fetch one page of events. Each call is a single network round trip;
    /// pass the previous page's `next_cursor` to continue.
    async fn fetch_events(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        cursor: Option<String>,
    ) -> AnycalResult<EventPage>;

    /// Create or update the remote counterpart of a local event. Returns the
    /// remote state, including the provider-assigned id for creations.
    async fn upsert_event(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        event: &LocalEvent,
    ) -> AnycalResult<RemoteEvent>;
}
