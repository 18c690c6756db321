//! Engine configuration.
//!
//! Loaded from ~/.config/anycal/config.toml (or an explicit path). Each
//! `[[links]]` table declares one calendar link together with its credential;
//! secrets never round-trip through the engine's reports or logs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::{AnycalError, AnycalResult};
use crate::link::{CalendarLink, ProviderKind};

fn default_true() -> bool {
    true
}

/// One `[[links]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub id: String,
    pub provider: ProviderKind,
    pub calendar_id: String,

    /// Required for GoHighLevel, unused elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,

    pub access_token: String,

    /// Session cookie for providers that authenticate with token + cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_value: Option<String>,

    #[serde(default = "default_true")]
    pub pull: bool,
    #[serde(default = "default_true")]
    pub push: bool,
}

impl LinkConfig {
    /// Split into the engine-facing link and its credential.
    pub fn into_parts(self) -> (CalendarLink, Credential) {
        let link = CalendarLink {
            id: self.id,
            provider: self.provider,
            calendar_id: self.calendar_id,
            location_id: self.location_id,
            pull_enabled: self.pull,
            push_enabled: self.push,
        };
        let credential = match self.cookie_value {
            Some(cookie) => Credential::TokenCookie { token: self.access_token, cookie },
            None => Credential::Bearer { token: self.access_token },
        };
        (link, credential)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnycalConfig {
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

impl AnycalConfig {
    pub fn config_path() -> AnycalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AnycalError::Config("Could not determine config directory".into()))?
            .join("anycal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from an explicit path.
    pub fn load(path: &Path) -> AnycalResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AnycalError::Config(format!("Could not read {}: {e}", path.display())))?;
        Self::parse(&contents)
    }

    /// Load from the default path, falling back to an empty config when the
    /// file does not exist yet.
    pub fn load_default() -> AnycalResult<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn parse(contents: &str) -> AnycalResult<Self> {
        toml::from_str(contents).map_err(|e| AnycalError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> AnycalResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| AnycalError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AnycalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AnycalError::Config(format!("Could not write config file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_links_with_defaults() {
        let config = AnycalConfig::parse(
            r#"
            [[links]]
            id = "sales"
            provider = "hubspot"
            calendar_id = "cal-1"
            access_token = "pat-123"

            [[links]]
            id = "clinic"
            provider = "goujana"
            calendar_id = "7"
            access_token = "tok-9"
            cookie_value = "sessionid=abc"
            push = false
            "#,
        )
        .unwrap();

        assert_eq!(config.links.len(), 2);

        let (link, credential) = config.links[0].clone().into_parts();
        assert_eq!(link.provider, ProviderKind::Hubspot);
        assert!(link.pull_enabled && link.push_enabled);
        assert!(matches!(credential, Credential::Bearer { .. }));

        let (link, credential) = config.links[1].clone().into_parts();
        assert_eq!(link.provider, ProviderKind::Goujana);
        assert!(link.pull_enabled);
        assert!(!link.push_enabled);
        assert!(matches!(credential, Credential::TokenCookie { .. }));
    }

    #[test]
    fn ghl_link_carries_location_id() {
        let config = AnycalConfig::parse(
            r#"
            [[links]]
            id = "agency"
            provider = "ghl"
            calendar_id = "cal-9"
            location_id = "loc-4"
            access_token = "tok"
            "#,
        )
        .unwrap();

        let (link, _) = config.links[0].clone().into_parts();
        assert_eq!(link.location_id.as_deref(), Some("loc-4"));
        assert!(link.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = AnycalConfig::parse(
            r#"
            [[links]]
            id = "x"
            provider = "fancycal"
            calendar_id = "1"
            access_token = "t"
            "#,
        );
        assert!(matches!(result, Err(AnycalError::Config(_))));
    }

    #[test]
    fn empty_file_is_an_empty_config() {
        let config = AnycalConfig::parse("").unwrap();
        assert!(config.links.is_empty());
    }
}
