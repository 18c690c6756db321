//! Per-link credential storage.
//!
//! Providers differ in auth scheme: HubSpot and GHL use bearer tokens,
//! Goujana uses an API token plus a session cookie. The store hides that
//! difference from the orchestrator and supports invalidation so a rejected
//! credential is not reused on the next sync.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{AnycalError, AnycalResult};

/// A credential for one calendar link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Credential {
    /// `Authorization: Bearer <token>`
    Bearer { token: String },
    /// `X-API-TOKEN` header plus a session cookie (Goujana).
    TokenCookie { token: String, cookie: String },
}

impl Credential {
    pub fn token(&self) -> &str {
        match self {
            Credential::Bearer { token } => token,
            Credential::TokenCookie { token, .. } => token,
        }
    }
}

/// Holds credentials keyed by link id. Entries are scoped per link, so
/// concurrent syncs of different links never contend on shared auth state.
#[derive(Default)]
pub struct CredentialStore {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, link_id: impl Into<String>, credential: Credential) {
        self.credentials.write().insert(link_id.into(), credential);
    }

    /// Fetch the credential for a link. Fails when none is configured or a
    /// previous sync invalidated it.
    pub fn get(&self, link_id: &str) -> AnycalResult<Credential> {
        self.credentials.read().get(link_id).cloned().ok_or_else(|| {
            AnycalError::Auth(format!(
                "No access token configured for link '{link_id}'"
            ))
        })
    }

    /// Drop the cached credential so the next sync has to re-authenticate.
    pub fn invalidate(&self, link_id: &str) {
        self.credentials.write().remove(link_id);
    }
}
