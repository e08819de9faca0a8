mod backend;
mod display;
mod session;

pub use backend::*;
pub use display::*;
pub use session::*;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "NEWSDESK_BACKEND_URL";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Render the resolved config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the config at `path`, falling back to defaults when the file
    /// does not exist.  A file that exists but fails to parse is an error.
    /// `NEWSDESK_BACKEND_URL` overrides the backend URL either way.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)
                .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend.base_url = url.trim().to_owned();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if url.is_empty() {
            return Err(Error::Config("backend.base_url must not be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "backend.base_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.backend.timeout_ms == 0 {
            return Err(Error::Config("backend.timeout_ms must be > 0".into()));
        }
        if self.session.storage_key.trim().is_empty() {
            return Err(Error::Config("session.storage_key must not be empty".into()));
        }
        Ok(())
    }
}
