//! Reconciliation: classifying each event pair as create, update, or skip.
//!
//! Classification is driven by last-modified timestamps. On equal timestamps
//! both directions skip, so repeated syncs are idempotent and a push followed
//! by a pull does not oscillate.

use std::fmt;

use crate::error::{AnycalError, AnycalResult};
use crate::event::{LocalEvent, RemoteEvent};

/// The decision for a single event in one sync direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    Update,
    Skip,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Create => write!(f, "+"),
            SyncAction::Update => write!(f, "~"),
            SyncAction::Skip => write!(f, "="),
        }
    }
}

/// Classify a pulled remote event against its local counterpart (matched by
/// `external_id`; `None` when there is no counterpart).
///
/// Errors mark the single offending event as unprocessable; the caller counts
/// it as skipped and continues with the batch.
pub fn classify_pull(remote: &RemoteEvent, local: Option<&LocalEvent>) -> AnycalResult<SyncAction> {
    if remote.external_id.trim().is_empty() {
        return Err(AnycalError::Reconciliation(
            "remote event has no id".to_string(),
        ));
    }
    if remote.end < remote.start {
        return Err(AnycalError::Reconciliation(format!(
            "remote event '{}' ends before it starts",
            remote.external_id
        )));
    }

    let local = match local {
        None => return Ok(SyncAction::Create),
        Some(local) => local,
    };

    if !local.sync_enabled {
        return Ok(SyncAction::Skip);
    }

    // Remote wins only when strictly newer. Equal or unknown recency skips,
    // which keeps a second pull with no intervening change a no-op.
    match remote.last_modified {
        Some(modified) if modified > local.last_modified => Ok(SyncAction::Update),
        _ => Ok(SyncAction::Skip),
    }
}

/// Classify a local event for the push direction. `remote` is the counterpart
/// found in the provider's current event set, if any.
pub fn classify_push(local: &LocalEvent, remote: Option<&RemoteEvent>) -> AnycalResult<SyncAction> {
    if local.end < local.start {
        return Err(AnycalError::Reconciliation(format!(
            "local event '{}' ends before it starts",
            local.id
        )));
    }

    if local.external_id.is_none() {
        return Ok(SyncAction::Create);
    }

    match remote {
        // Linked but gone on the provider side: recreate it there.
        None => Ok(SyncAction::Create),
        Some(remote) => match remote.last_modified {
            // Local wins only when strictly newer.
            Some(modified) if local.last_modified > modified => Ok(SyncAction::Update),
            Some(_) => Ok(SyncAction::Skip),
            // No recency signal from the provider (Goujana): fall back to
            // content so an unchanged event is not re-sent on every pass.
            None if content_matches(local, remote) => Ok(SyncAction::Skip),
            None => Ok(SyncAction::Update),
        },
    }
}

fn content_matches(local: &LocalEvent, remote: &RemoteEvent) -> bool {
    local.title == remote.title
        && local.description == remote.description
        && local.start == remote.start
        && local.end == remote.end
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::event::{LocalEvent, RemoteEvent};

    fn remote(id: &str) -> RemoteEvent {
        let start = Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();
        RemoteEvent {
            external_id: id.to_string(),
            title: "Intro call".to_string(),
            description: None,
            start,
            end: start + Duration::minutes(30),
            attendees: vec![],
            last_modified: Some(start),
        }
    }

    fn local_for(r: &RemoteEvent) -> LocalEvent {
        LocalEvent::from_remote("main", r)
    }

    #[test]
    fn pull_creates_when_no_local_counterpart() {
        assert_eq!(classify_pull(&remote("m1"), None).unwrap(), SyncAction::Create);
    }

    #[test]
    fn pull_updates_when_remote_strictly_newer() {
        let mut r = remote("m1");
        let local = local_for(&r);
        r.last_modified = Some(local.last_modified + Duration::seconds(1));
        assert_eq!(classify_pull(&r, Some(&local)).unwrap(), SyncAction::Update);
    }

    #[test]
    fn pull_skips_on_equal_or_older_timestamps() {
        let r = remote("m1");
        let mut local = local_for(&r);
        assert_eq!(classify_pull(&r, Some(&local)).unwrap(), SyncAction::Skip);

        local.last_modified += Duration::hours(1);
        assert_eq!(classify_pull(&r, Some(&local)).unwrap(), SyncAction::Skip);
    }

    #[test]
    fn pull_skips_events_with_sync_disabled() {
        let mut r = remote("m1");
        let mut local = local_for(&r);
        local.sync_enabled = false;
        r.last_modified = Some(local.last_modified + Duration::hours(1));
        assert_eq!(classify_pull(&r, Some(&local)).unwrap(), SyncAction::Skip);
    }

    #[test]
    fn pull_rejects_malformed_events() {
        let mut r = remote("");
        assert!(classify_pull(&r, None).is_err());

        r.external_id = "m1".to_string();
        r.end = r.start - Duration::minutes(5);
        assert!(classify_pull(&r, None).is_err());
    }

    #[test]
    fn push_creates_unlinked_events() {
        let r = remote("m1");
        let mut local = local_for(&r);
        local.external_id = None;
        assert_eq!(classify_push(&local, None).unwrap(), SyncAction::Create);
    }

    #[test]
    fn push_recreates_when_remote_counterpart_vanished() {
        let r = remote("m1");
        let local = local_for(&r);
        assert_eq!(classify_push(&local, None).unwrap(), SyncAction::Create);
    }

    #[test]
    fn push_skips_when_remote_is_current() {
        let r = remote("m1");
        let local = local_for(&r);
        assert_eq!(classify_push(&local, Some(&r)).unwrap(), SyncAction::Skip);
    }

    #[test]
    fn push_updates_when_local_strictly_newer() {
        let r = remote("m1");
        let mut local = local_for(&r);
        local.last_modified += Duration::minutes(2);
        assert_eq!(classify_push(&local, Some(&r)).unwrap(), SyncAction::Update);
    }

    #[test]
    fn push_without_remote_timestamp_compares_content() {
        let mut r = remote("m1");
        r.last_modified = None;
        let mut local = local_for(&r);
        // Recency is unknowable here, so an identical pair must not churn.
        assert_eq!(classify_push(&local, Some(&r)).unwrap(), SyncAction::Skip);

        local.title = "Rescheduled intro".to_string();
        assert_eq!(classify_push(&local, Some(&r)).unwrap(), SyncAction::Update);
    }

    #[test]
    fn round_trip_push_then_pull_skips() {
        // After a push the local event carries the provider's id and
        // timestamp; pulling the same state back must be a no-op.
        let pushed = remote("m9");
        let local = local_for(&pushed);
        assert_eq!(classify_pull(&pushed, Some(&local)).unwrap(), SyncAction::Skip);
    }
}
