//! Client configuration.
//!
//! Sources, later wins: built-in defaults, an optional JSON file named by
//! `CONECTATECH_CONFIG`, then the individual `CONECTATECH_*` environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage, SessionStore};

pub const ENV_CONFIG_FILE: &str = "CONECTATECH_CONFIG";
pub const ENV_API_BASE_URL: &str = "CONECTATECH_API_BASE_URL";
pub const ENV_SESSION_FILE: &str = "CONECTATECH_SESSION_FILE";
pub const ENV_LOGOUT_ON_401: &str = "CONECTATECH_LOGOUT_ON_401";

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every API path is appended to; a path prefix such as `/api` is kept.
    #[serde(default = "ClientConfig::default_api_base_url")]
    pub api_base_url: String,
    /// File backing the session cache. In-memory storage when unset.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Drop the session when a resource endpoint answers 401.
    #[serde(default = "ClientConfig::default_logout_on_unauthorized")]
    pub logout_on_unauthorized: bool,
}

impl ClientConfig {
    fn default_api_base_url() -> String { "http://127.0.0.1:3000/api".to_string() }
    fn default_logout_on_unauthorized() -> bool { true }

    pub fn with_base_url<S: Into<String>>(base: S) -> Self {
        Self { api_base_url: base.into(), ..Self::default() }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading config file {}", path.display()))?;
        let cfg = serde_json::from_slice::<ClientConfig>(&bytes)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Defaults, then `CONECTATECH_CONFIG` file, then per-field environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_FILE) {
            Ok(p) if !p.trim().is_empty() => Self::from_file(Path::new(p.trim()))?,
            _ => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) -> Result<()> {
        if let Some(v) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = v.trim().to_string();
        }
        if let Some(v) = lookup(ENV_SESSION_FILE).filter(|v| !v.trim().is_empty()) {
            self.session_file = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = lookup(ENV_LOGOUT_ON_401) {
            self.logout_on_unauthorized = parse_bool(&v)
                .with_context(|| format!("{} must be true/false, got '{}'", ENV_LOGOUT_ON_401, v))?;
        }
        Ok(())
    }

    pub fn session_store(&self) -> SessionStore {
        let backend: Arc<dyn KeyValueStorage> = match &self.session_file {
            Some(p) => Arc::new(FileStorage::new(p)),
            None => Arc::new(MemoryStorage::new()),
        };
        SessionStore::new(backend)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            session_file: None,
            logout_on_unauthorized: Self::default_logout_on_unauthorized(),
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
