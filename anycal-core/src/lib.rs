//! Core engine for the anycal ecosystem.
//!
//! This crate provides everything the boundaries (anycal-server, anycal-cli)
//! need to run a two-way calendar sync:
//! - `event` — provider-neutral event types
//! - `link` — calendar link configuration
//! - `credential` — per-link credential store
//! - `provider` — the adapter trait implemented by provider crates
//! - `reconcile` — create/update/skip classification
//! - `sync` — the orchestrator and its result types

pub mod config;
pub mod credential;
pub mod error;
pub mod event;
pub mod link;
pub mod provider;
pub mod reconcile;
pub mod retry;
pub mod store;
pub mod sync;

pub use config::{AnycalConfig, LinkConfig};
pub use credential::{Credential, CredentialStore};
pub use error::{AnycalError, AnycalResult};
pub use event::{Attendee, LocalEvent, RemoteEvent};
pub use link::{CalendarLink, ProviderKind};
pub use provider::{EventPage, Provider};
pub use store::{LocalStore, MemoryStore};
pub use sync::{EngineConfig, SyncEngine, SyncResult};
