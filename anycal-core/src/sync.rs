//! Sync orchestration.
//!
//! One sync invocation runs as a single sequential unit of work per calendar
//! link: validate, pull (optional), push (optional), report. Syncs for the
//! same link are serialized by a per-link guard; different links may run
//! concurrently with no shared mutable state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::credential::{Credential, CredentialStore};
use crate::error::AnycalError;
use crate::event::{LocalEvent, RemoteEvent};
use crate::link::{CalendarLink, ProviderKind};
use crate::provider::{EventPage, Provider};
use crate::reconcile::{self, SyncAction};
use crate::retry::{self, RetryConfig};
use crate::store::LocalStore;

const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Statistics accumulated during a pull phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullStats {
    pub total_events: u64,
    pub created_count: u64,
    pub updated_count: u64,
    pub skipped_count: u64,
}

/// Statistics accumulated during a push phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushStats {
    pub total: u64,
    pub success: u64,
    pub skipped: u64,
}

/// Outcome of the pull phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullReport {
    pub success: bool,
    pub message: String,
    pub stats: PullStats,
}

/// Outcome of the push phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushReport {
    pub success: bool,
    pub message: String,
    pub stats: PushStats,
}

impl PullReport {
    fn skipped(reason: &str) -> Self {
        PullReport {
            success: false,
            message: format!("Pull skipped ({reason})"),
            stats: PullStats::default(),
        }
    }
}

impl PushReport {
    fn skipped(reason: &str) -> Self {
        PushReport {
            success: false,
            message: format!("Push skipped ({reason})"),
            stats: PushStats::default(),
        }
    }
}

/// The result of one sync invocation. The serialized shape is part of the
/// boundary contract and must stay stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    pub pull_result: PullReport,
    pub push_result: PushReport,
}

impl SyncResult {
    /// A result for an invocation that never reached the pull/push phases.
    pub fn failure(message: impl Into<String>) -> Self {
        SyncResult {
            success: false,
            message: message.into(),
            pull_result: PullReport::skipped("not run"),
            push_result: PushReport::skipped("not run"),
        }
    }
}

/// Which direction(s) a sync invocation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Pull,
    Push,
    Both,
}

/// Phases of a sync pass, in order. Used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Validating,
    Pulling,
    Pushing,
    Completed,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Validating => write!(f, "validating"),
            SyncPhase::Pulling => write!(f, "pulling"),
            SyncPhase::Pushing => write!(f, "pushing"),
            SyncPhase::Completed => write!(f, "completed"),
            SyncPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on each provider round trip.
    pub page_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

/// The sync orchestrator: owns the link registry, credentials, providers,
/// and the local store, and runs pull/push passes against them.
pub struct SyncEngine {
    links: RwLock<HashMap<String, CalendarLink>>,
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    credentials: CredentialStore,
    store: Arc<dyn LocalStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn LocalStore>, config: EngineConfig) -> Self {
        SyncEngine {
            links: RwLock::new(HashMap::new()),
            providers: HashMap::new(),
            credentials: CredentialStore::new(),
            store,
            locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn register_provider(&mut self, kind: ProviderKind, provider: Arc<dyn Provider>) {
        self.providers.insert(kind, provider);
    }

    pub fn add_link(&self, link: CalendarLink, credential: Option<Credential>) {
        if let Some(credential) = credential {
            self.credentials.insert(link.id.clone(), credential);
        }
        self.links.write().insert(link.id.clone(), link);
    }

    pub fn link(&self, link_id: &str) -> Option<CalendarLink> {
        self.links.read().get(link_id).cloned()
    }

    pub fn links(&self) -> Vec<CalendarLink> {
        let mut links: Vec<CalendarLink> = self.links.read().values().cloned().collect();
        links.sort_by(|a, b| a.id.cmp(&b.id));
        links
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn store(&self) -> Arc<dyn LocalStore> {
        self.store.clone()
    }

    /// Pull then push, per the link's toggles.
    pub async fn sync(&self, link_id: &str) -> SyncResult {
        self.run(link_id, SyncDirection::Both).await
    }

    /// Pull only.
    pub async fn pull(&self, link_id: &str) -> SyncResult {
        self.run(link_id, SyncDirection::Pull).await
    }

    /// Push only.
    pub async fn push(&self, link_id: &str) -> SyncResult {
        self.run(link_id, SyncDirection::Push).await
    }

    async fn run(&self, link_id: &str, direction: SyncDirection) -> SyncResult {
        // At most one sync in flight per link. A second caller fails fast
        // instead of queueing behind a potentially long network pass.
        let lock = self.lock_for(link_id);
        let guard = lock.try_lock();
        if guard.is_err() {
            return SyncResult::failure(format!("Sync already in progress for link '{link_id}'"));
        }

        tracing::debug!(link = link_id, phase = %SyncPhase::Validating, "sync started");

        let link = match self.link(link_id) {
            Some(link) => link,
            None => return SyncResult::failure(format!("Calendar link '{link_id}' not found")),
        };

        if let Err(e) = link.validate() {
            return SyncResult::failure(e.to_string());
        }

        match direction {
            SyncDirection::Pull if !link.pull_enabled => {
                return SyncResult::failure(format!("Pull is disabled for link '{link_id}'"));
            }
            SyncDirection::Push if !link.push_enabled => {
                return SyncResult::failure(format!("Push is disabled for link '{link_id}'"));
            }
            _ => {}
        }

        let credential = match self.credentials.get(link_id) {
            Ok(credential) => credential,
            Err(e) => return SyncResult::failure(e.to_string()),
        };

        let provider = match self.providers.get(&link.provider) {
            Some(provider) => provider.clone(),
            None => {
                return SyncResult::failure(format!(
                    "No provider registered for '{}'",
                    link.provider
                ));
            }
        };

        let do_pull = direction != SyncDirection::Push && link.pull_enabled;
        let do_push = direction != SyncDirection::Pull && link.push_enabled;

        let mut pull_report = PullReport::skipped("disabled");
        let mut push_report = PushReport::skipped("disabled");
        let mut auth_failed = false;

        if do_pull {
            tracing::debug!(link = link_id, phase = %SyncPhase::Pulling, "pull phase");
            let (report, hard_error) = self.run_pull(&link, &credential, provider.as_ref()).await;
            auth_failed = hard_error.as_ref().is_some_and(AnycalError::is_auth);
            pull_report = report;
        }

        if do_push {
            if auth_failed {
                // The same credential would be rejected again; don't burn
                // network calls on a doomed phase.
                push_report = PushReport::skipped("authentication failed");
            } else {
                tracing::debug!(link = link_id, phase = %SyncPhase::Pushing, "push phase");
                let (report, hard_error) =
                    self.run_push(&link, &credential, provider.as_ref()).await;
                auth_failed |= hard_error.as_ref().is_some_and(AnycalError::is_auth);
                push_report = report;
            }
        }

        if auth_failed {
            self.credentials.invalidate(link_id);
        }

        let success = match direction {
            SyncDirection::Pull => pull_report.success,
            SyncDirection::Push => push_report.success,
            SyncDirection::Both => {
                (pull_report.success || !do_pull) && (push_report.success || !do_push)
            }
        };

        let message = match direction {
            SyncDirection::Pull => pull_report.message.clone(),
            SyncDirection::Push => push_report.message.clone(),
            SyncDirection::Both => {
                format!("Pull: {} | Push: {}", pull_report.message, push_report.message)
            }
        };

        let phase = if success { SyncPhase::Completed } else { SyncPhase::Failed };
        tracing::info!(link = link_id, phase = %phase, %message, "sync finished");

        SyncResult {
            success,
            message,
            pull_result: pull_report,
            push_result: push_report,
        }
    }

    fn lock_for(&self, link_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(link_id.to_string())
            .or_default()
            .clone()
    }

    /// One provider round trip under timeout and retry policy.
    async fn fetch_page(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        provider: &dyn Provider,
        cursor: Option<String>,
    ) -> Result<EventPage, AnycalError> {
        retry::with_retry(&self.config.retry, || async {
            match tokio::time::timeout(
                self.config.page_timeout,
                provider.fetch_events(link, credential, cursor.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(AnycalError::Timeout(self.config.page_timeout.as_secs())),
            }
        })
        .await
    }

    async fn run_pull(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        provider: &dyn Provider,
    ) -> (PullReport, Option<AnycalError>) {
        let mut stats = PullStats::default();
        let mut cursor: Option<String> = None;

        loop {
            let page = match self.fetch_page(link, credential, provider, cursor.clone()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(link = %link.id, error = %e, "pull phase failed");
                    let report = PullReport {
                        success: false,
                        message: format!("Pull failed: {e}"),
                        stats,
                    };
                    return (report, Some(e));
                }
            };

            stats.total_events += (page.events.len() + page.malformed) as u64;
            stats.skipped_count += page.malformed as u64;

            for remote in &page.events {
                let local = self.store.find_by_external_id(&link.id, &remote.external_id);
                match reconcile::classify_pull(remote, local.as_ref()) {
                    Ok(SyncAction::Create) => {
                        self.store
                            .insert(LocalEvent::from_remote(link.id.as_str(), remote));
                        stats.created_count += 1;
                    }
                    Ok(SyncAction::Update) => {
                        if let Some(mut local) = local {
                            local.apply_remote(remote);
                            self.store.update(local);
                            stats.updated_count += 1;
                        }
                    }
                    Ok(SyncAction::Skip) => stats.skipped_count += 1,
                    Err(e) => {
                        tracing::warn!(link = %link.id, error = %e, "skipping unprocessable event");
                        stats.skipped_count += 1;
                    }
                }
            }

            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        let message = format!(
            "Processed {} events: {} created, {} updated, {} skipped",
            stats.total_events, stats.created_count, stats.updated_count, stats.skipped_count
        );
        (PullReport { success: true, message, stats }, None)
    }

    async fn run_push(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        provider: &dyn Provider,
    ) -> (PushReport, Option<AnycalError>) {
        let candidates: Vec<LocalEvent> = self
            .store
            .events_for_link(&link.id)
            .into_iter()
            .filter(|e| e.sync_enabled)
            .collect();

        let mut stats = PushStats {
            total: candidates.len() as u64,
            ..PushStats::default()
        };

        if candidates.is_empty() {
            let report = PushReport {
                success: true,
                message: "No events to push".to_string(),
                stats,
            };
            return (report, None);
        }

        // Snapshot the provider's current events so linked-but-vanished
        // events get recreated and up-to-date ones get skipped, never
        // duplicated.
        let mut remote_by_id: HashMap<String, RemoteEvent> = HashMap::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = match self.fetch_page(link, credential, provider, cursor.clone()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(link = %link.id, error = %e, "push phase failed listing remote events");
                    let report = PushReport {
                        success: false,
                        message: format!("Push failed: could not list remote events: {e}"),
                        stats,
                    };
                    return (report, Some(e));
                }
            };
            for event in page.events {
                remote_by_id.insert(event.external_id.clone(), event);
            }
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        let mut attempted = 0u64;

        for event in &candidates {
            let remote = event
                .external_id
                .as_deref()
                .and_then(|id| remote_by_id.get(id));

            let action = match reconcile::classify_push(event, remote) {
                Ok(action) => action,
                Err(e) => {
                    tracing::warn!(link = %link.id, event = %event.id, error = %e, "skipping unprocessable event");
                    stats.skipped += 1;
                    continue;
                }
            };

            if action == SyncAction::Skip {
                stats.skipped += 1;
                continue;
            }

            // Adapters pick create-vs-update from `external_id`. A linked
            // event whose remote counterpart vanished classifies as Create,
            // so the dead id must be dropped or the adapter would update a
            // resource that no longer exists.
            let outbound = if action == SyncAction::Create && event.external_id.is_some() {
                let mut copy = event.clone();
                copy.external_id = None;
                copy
            } else {
                event.clone()
            };

            attempted += 1;
            let result = retry::with_retry(&self.config.retry, || async {
                match tokio::time::timeout(
                    self.config.page_timeout,
                    provider.upsert_event(link, credential, &outbound),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AnycalError::Timeout(self.config.page_timeout.as_secs())),
                }
            })
            .await;

            match result {
                Ok(pushed) => {
                    // Record the provider id and align timestamps so the
                    // next pull classifies the pair as up to date.
                    let linked_at = pushed.last_modified.unwrap_or(event.last_modified);
                    self.store
                        .set_external_id(&event.id, &pushed.external_id, linked_at);
                    stats.success += 1;
                }
                Err(e) if e.is_auth() => {
                    let report = PushReport {
                        success: false,
                        message: format!("Push failed: {e}"),
                        stats,
                    };
                    return (report, Some(e));
                }
                Err(e) => {
                    tracing::warn!(link = %link.id, event = %event.id, error = %e, "failed to push event");
                    stats.skipped += 1;
                }
            }
        }

        // "Any OK" policy: the phase only fails when every attempted
        // propagation failed.
        let success = attempted == 0 || stats.success > 0;
        let message = format!(
            "Pushed {}/{} events, {} skipped",
            stats.success, stats.total, stats.skipped
        );
        (PushReport { success, message, stats }, None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::*;
    use crate::store::MemoryStore;

    #[derive(Debug, Clone, Copy)]
    enum FailureMode {
        Auth,
        Outage,
    }

    struct FakeProvider {
        remote: Mutex<Vec<RemoteEvent>>,
        fetch_calls: AtomicUsize,
        upsert_calls: AtomicUsize,
        fetch_failure: Mutex<Option<FailureMode>>,
        fetch_delay: Option<Duration>,
        page_size: usize,
    }

    impl FakeProvider {
        fn new(remote: Vec<RemoteEvent>) -> Self {
            FakeProvider {
                remote: Mutex::new(remote),
                fetch_calls: AtomicUsize::new(0),
                upsert_calls: AtomicUsize::new(0),
                fetch_failure: Mutex::new(None),
                fetch_delay: None,
                page_size: 100,
            }
        }

        fn network_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst) + self.upsert_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_events(
            &self,
            _link: &CalendarLink,
            _credential: &Credential,
            cursor: Option<String>,
        ) -> Result<EventPage, AnycalError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            let failure = *self.fetch_failure.lock();
            match failure {
                Some(FailureMode::Auth) => {
                    return Err(AnycalError::Auth(
                        "provider rejected the access token".to_string(),
                    ));
                }
                Some(FailureMode::Outage) => {
                    return Err(AnycalError::provider("service unavailable"));
                }
                None => {}
            }

            let remote = self.remote.lock().clone();
            let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
            let end = (offset + self.page_size).min(remote.len());
            let events = remote[offset..end].to_vec();
            let next_cursor = (end < remote.len()).then(|| end.to_string());
            Ok(EventPage { events, next_cursor, malformed: 0 })
        }

        async fn upsert_event(
            &self,
            _link: &CalendarLink,
            _credential: &Credential,
            event: &LocalEvent,
        ) -> Result<RemoteEvent, AnycalError> {
            self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            let mut remote = self.remote.lock();
            // Like the real APIs: updating an id that no longer exists fails.
            if let Some(id) = &event.external_id {
                if !remote.iter().any(|e| &e.external_id == id) {
                    return Err(AnycalError::provider(format!("no event '{id}'")));
                }
            }
            let external_id = event
                .external_id
                .clone()
                .unwrap_or_else(|| format!("r{}", remote.len() + 1));
            let pushed = RemoteEvent {
                external_id: external_id.clone(),
                title: event.title.clone(),
                description: event.description.clone(),
                start: event.start,
                end: event.end,
                attendees: event.attendees.clone(),
                last_modified: Some(event.last_modified),
            };
            remote.retain(|e| e.external_id != external_id);
            remote.push(pushed.clone());
            Ok(pushed)
        }
    }

    fn sample_remote(count: usize) -> Vec<RemoteEvent> {
        let base = Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();
        (1..=count)
            .map(|i| {
                let start = base + ChronoDuration::hours(i as i64);
                RemoteEvent {
                    external_id: format!("m{i}"),
                    title: format!("Meeting {i}"),
                    description: None,
                    start,
                    end: start + ChronoDuration::minutes(30),
                    attendees: vec![],
                    last_modified: Some(start),
                }
            })
            .collect()
    }

    fn test_link(pull: bool, push: bool) -> CalendarLink {
        CalendarLink {
            id: "main".to_string(),
            provider: ProviderKind::Hubspot,
            calendar_id: "cal1".to_string(),
            location_id: None,
            pull_enabled: pull,
            push_enabled: push,
        }
    }

    fn test_engine(provider: Arc<FakeProvider>, pull: bool, push: bool) -> SyncEngine {
        let config = EngineConfig {
            page_timeout: Duration::from_secs(5),
            retry: RetryConfig {
                max_retries: 1,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
        };
        let mut engine = SyncEngine::new(Arc::new(MemoryStore::new()), config);
        engine.register_provider(ProviderKind::Hubspot, provider);
        engine.add_link(
            test_link(pull, push),
            Some(Credential::Bearer { token: "tok1".to_string() }),
        );
        engine
    }

    #[tokio::test]
    async fn pull_creates_all_remote_events() {
        let mut provider = FakeProvider::new(sample_remote(3));
        provider.page_size = 2;
        let provider = Arc::new(provider);
        let engine = test_engine(provider.clone(), true, false);

        let result = engine.sync("main").await;

        assert!(result.success);
        assert_eq!(
            result.pull_result.stats,
            PullStats { total_events: 3, created_count: 3, updated_count: 0, skipped_count: 0 }
        );
        assert_eq!(engine.store().events_for_link("main").len(), 3);
        // 3 events at page size 2 means exactly two round trips.
        assert_eq!(provider.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pulling_twice_without_remote_changes_is_idempotent() {
        let provider = Arc::new(FakeProvider::new(sample_remote(3)));
        let engine = test_engine(provider, true, false);

        let first = engine.sync("main").await;
        assert_eq!(first.pull_result.stats.created_count, 3);

        let second = engine.sync("main").await;
        assert!(second.success);
        assert_eq!(second.pull_result.stats.created_count, 0);
        assert_eq!(second.pull_result.stats.updated_count, 0);
        assert_eq!(second.pull_result.stats.skipped_count, 3);
        assert_eq!(engine.store().events_for_link("main").len(), 3);
    }

    #[tokio::test]
    async fn pull_applies_remote_updates() {
        let provider = Arc::new(FakeProvider::new(sample_remote(2)));
        let engine = test_engine(provider.clone(), true, false);
        engine.sync("main").await;

        {
            let mut remote = provider.remote.lock();
            remote[0].title = "Renamed".to_string();
            remote[0].last_modified = Some(remote[0].last_modified.unwrap() + ChronoDuration::hours(1));
        }

        let result = engine.sync("main").await;
        assert_eq!(result.pull_result.stats.updated_count, 1);
        assert_eq!(result.pull_result.stats.skipped_count, 1);

        let local = engine.store().find_by_external_id("main", "m1").unwrap();
        assert_eq!(local.title, "Renamed");
    }

    #[tokio::test]
    async fn nothing_enabled_fails_validation_with_no_network_calls() {
        let provider = Arc::new(FakeProvider::new(sample_remote(3)));
        let engine = test_engine(provider.clone(), false, false);

        let result = engine.sync("main").await;

        assert!(!result.success);
        assert!(result.message.contains("Neither pull nor push"));
        assert_eq!(provider.network_calls(), 0);
    }

    #[tokio::test]
    async fn missing_credential_fails_with_token_message() {
        let provider = Arc::new(FakeProvider::new(sample_remote(1)));
        let config = EngineConfig::default();
        let mut engine = SyncEngine::new(Arc::new(MemoryStore::new()), config);
        engine.register_provider(ProviderKind::Hubspot, provider.clone());
        engine.add_link(test_link(true, false), None);

        let result = engine.sync("main").await;

        assert!(!result.success);
        assert!(result.message.contains("token"));
        assert_eq!(provider.network_calls(), 0);
    }

    #[tokio::test]
    async fn auth_error_fails_sync_and_invalidates_credential() {
        let provider = Arc::new(FakeProvider::new(sample_remote(1)));
        *provider.fetch_failure.lock() = Some(FailureMode::Auth);
        let engine = test_engine(provider, true, false);

        let result = engine.sync("main").await;

        assert!(!result.success);
        assert!(result.message.contains("token"));
        assert!(engine.credentials().get("main").is_err());
    }

    #[tokio::test]
    async fn pull_failure_does_not_block_push_phase() {
        let provider = Arc::new(FakeProvider::new(sample_remote(2)));
        *provider.fetch_failure.lock() = Some(FailureMode::Outage);
        let engine = test_engine(provider, true, true);

        let result = engine.sync("main").await;

        assert!(!result.pull_result.success);
        // No local events, so the push phase completes without touching the
        // network.
        assert!(result.push_result.success);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn push_links_created_events_and_round_trips_to_skip() {
        let provider = Arc::new(FakeProvider::new(Vec::new()));
        let engine = test_engine(provider, true, true);

        let start = Utc.with_ymd_and_hms(2025, 7, 2, 10, 0, 0).unwrap();
        engine.store().insert(LocalEvent::new(
            "main",
            "Demo call",
            start,
            start + ChronoDuration::hours(1),
        ));

        let first = engine.sync("main").await;
        assert!(first.success);
        assert_eq!(
            first.push_result.stats,
            PushStats { total: 1, success: 1, skipped: 0 }
        );

        let local = engine.store().events_for_link("main").remove(0);
        assert!(local.external_id.is_some());

        // The pushed event now exists remotely with matching timestamps, so
        // a full sync is a no-op in both directions.
        let second = engine.sync("main").await;
        assert!(second.success);
        assert_eq!(second.pull_result.stats.created_count, 0);
        assert_eq!(second.pull_result.stats.updated_count, 0);
        assert_eq!(second.pull_result.stats.skipped_count, 1);
        assert_eq!(second.push_result.stats.success, 0);
        assert_eq!(second.push_result.stats.skipped, 1);
        assert_eq!(engine.store().events_for_link("main").len(), 1);
    }

    #[tokio::test]
    async fn vanished_remote_counterparts_are_recreated_on_push() {
        let provider = Arc::new(FakeProvider::new(Vec::new()));
        let engine = test_engine(provider.clone(), false, true);

        let start = Utc.with_ymd_and_hms(2025, 7, 3, 11, 0, 0).unwrap();
        let mut event = LocalEvent::new("main", "Review", start, start + ChronoDuration::hours(1));
        event.external_id = Some("ghost".to_string());
        let event_id = event.id.clone();
        engine.store().insert(event);

        let result = engine.push("main").await;

        assert!(result.success);
        assert_eq!(
            result.push_result.stats,
            PushStats { total: 1, success: 1, skipped: 0 }
        );
        // Recreated under a fresh provider id, not updated in place.
        let local = engine.store().events_for_link("main").remove(0);
        assert_eq!(local.id, event_id);
        assert_eq!(local.external_id.as_deref(), Some("r1"));
        assert_eq!(provider.remote.lock().len(), 1);
    }

    #[tokio::test]
    async fn direction_variants_respect_link_toggles() {
        let provider = Arc::new(FakeProvider::new(sample_remote(1)));
        let engine = test_engine(provider.clone(), true, false);

        let result = engine.push("main").await;
        assert!(!result.success);
        assert!(result.message.contains("Push is disabled"));
        assert_eq!(provider.network_calls(), 0);

        let result = engine.pull("main").await;
        assert!(result.success);
        assert_eq!(result.pull_result.stats.created_count, 1);
    }

    #[tokio::test]
    async fn concurrent_syncs_on_the_same_link_do_not_duplicate() {
        let mut provider = FakeProvider::new(sample_remote(3));
        provider.fetch_delay = Some(Duration::from_millis(50));
        let provider = Arc::new(provider);
        let engine = Arc::new(test_engine(provider, true, false));

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.sync("main").await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.sync("main").await }
        });

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let (won, lost) = if a.success { (a, b) } else { (b, a) };

        assert!(won.success);
        assert!(lost.message.contains("already in progress"));
        assert_eq!(won.pull_result.stats.created_count, 3);
        // Exactly what a single serialized run would have produced.
        assert_eq!(engine.store().events_for_link("main").len(), 3);
    }

    #[tokio::test]
    async fn unknown_link_fails() {
        let provider = Arc::new(FakeProvider::new(Vec::new()));
        let engine = test_engine(provider, true, false);

        let result = engine.sync("nope").await;
        assert!(!result.success);
        assert!(result.message.contains("not found"));
    }

    #[test]
    fn sync_result_json_shape_is_stable() {
        let result = SyncResult {
            success: true,
            message: "ok".to_string(),
            pull_result: PullReport {
                success: true,
                message: "pulled".to_string(),
                stats: PullStats { total_events: 3, created_count: 3, updated_count: 0, skipped_count: 0 },
            },
            push_result: PushReport {
                success: true,
                message: "pushed".to_string(),
                stats: PushStats { total: 1, success: 1, skipped: 0 },
            },
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], serde_json::json!(true));
        assert_eq!(value["pull_result"]["stats"]["total_events"], serde_json::json!(3));
        assert_eq!(value["pull_result"]["stats"]["created_count"], serde_json::json!(3));
        assert_eq!(value["pull_result"]["stats"]["updated_count"], serde_json::json!(0));
        assert_eq!(value["pull_result"]["stats"]["skipped_count"], serde_json::json!(0));
        assert_eq!(value["push_result"]["stats"]["total"], serde_json::json!(1));
        assert_eq!(value["push_result"]["stats"]["success"], serde_json::json!(1));
        assert_eq!(value["push_result"]["stats"]["skipped"], serde_json::json!(0));
    }
}
