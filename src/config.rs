//! Runtime settings and API-key resolution
//!
//! An API key given on the command line (or through `SKYSCAN_RAPID_API_KEY`) is
//! remembered in the `profile` collection, so later runs can omit it.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{DocumentStore, StoreError};
use crate::data::MarketScope;

/// Environment variable holding the provider credential
pub const API_KEY_ENV: &str = "SKYSCAN_RAPID_API_KEY";

/// Collection holding the stored [`Profile`]
pub const PROFILE: &str = "profile";

/// Errors that prevent the application from starting
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither an explicit nor a stored API key is available
    #[error("No API key found: pass --api-key or set SKYSCAN_RAPID_API_KEY")]
    MissingApiKey,

    /// No platform data directory and none given
    #[error("Could not determine a data directory; pass --data-dir")]
    NoDataDir,

    /// Reading or writing the stored profile failed
    #[error("profile store error: {0}")]
    Store(#[from] StoreError),
}

/// Persisted user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub api_key: String,
}

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub scope: MarketScope,
    /// Per-request provider timeout
    pub timeout: Duration,
}

impl Settings {
    /// Opens the reference store in the configured or platform data directory
    pub fn store(&self) -> Result<DocumentStore, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(DocumentStore::with_dir(dir.clone())),
            None => DocumentStore::new().ok_or(ConfigError::NoDataDir),
        }
    }
}

/// Picks the API key to use
///
/// A non-blank explicit key wins and replaces the stored profile. Otherwise the
/// stored key is used.
pub fn resolve_api_key(store: &DocumentStore, explicit: Option<&str>) -> Result<String, ConfigError> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        let profile = Profile {
            api_key: key.to_string(),
        };
        store.upsert_by(PROFILE, profile, |_: &Profile| true)?;
        return Ok(key.to_string());
    }

    let profiles: Vec<Profile> = store.read_all(PROFILE)?;
    profiles
        .into_iter()
        .map(|p| p.api_key)
        .find(|k| !k.trim().is_empty())
        .ok_or(ConfigError::MissingApiKey)
}
