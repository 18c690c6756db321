//! Calendar link configuration.
//!
//! A `CalendarLink` binds a local calendar to one external provider account.
//! Links are created when an integration is configured and validated before
//! every sync attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnycalError, AnycalResult};

/// The external providers anycal can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Hubspot,
    Ghl,
    Goujana,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Hubspot => write!(f, "hubspot"),
            ProviderKind::Ghl => write!(f, "ghl"),
            ProviderKind::Goujana => write!(f, "goujana"),
        }
    }
}

/// Configuration record binding a local calendar to one external provider
/// account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarLink {
    pub id: String,
    pub provider: ProviderKind,
    pub calendar_id: String,
    /// GHL scopes every API call to a location; other providers ignore this.
    pub location_id: Option<String>,
    pub pull_enabled: bool,
    pub push_enabled: bool,
}

impl CalendarLink {
    /// Check the link is complete enough to sync. All providers are held to
    /// the same rules, including the at-least-one-direction requirement.
    pub fn validate(&self) -> AnycalResult<()> {
        if self.calendar_id.trim().is_empty() {
            return Err(AnycalError::Validation(format!(
                "Link '{}' has no calendar_id configured",
                self.id
            )));
        }

        if self.provider == ProviderKind::Ghl
            && self.location_id.as_deref().is_none_or(|l| l.trim().is_empty())
        {
            return Err(AnycalError::Validation(format!(
                "GHL link '{}' requires a location_id",
                self.id
            )));
        }

        if !self.pull_enabled && !self.push_enabled {
            return Err(AnycalError::Validation(format!(
                "Neither pull nor push is enabled for link '{}'",
                self.id
            )));
        }

        Ok(())
    }
}
