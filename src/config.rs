//! Runtime configuration.
//!
//! Everything is read from the environment the launcher starts us in. The
//! launcher exports `alfred_workflow_cache` as the per-workflow cache directory;
//! outside the launcher the XDG cache directory is used.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheManager;
use crate::data::covid_api::DEFAULT_API_BASE_URL;
use crate::update::{DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_SLUG};

/// Cache directory exported by the launcher
pub const ENV_CACHE_DIR: &str = "alfred_workflow_cache";
/// Override for the data API base URL
pub const ENV_API_URL: &str = "COVID_RADAR_API_URL";
/// Set to 0/false/no/off to skip the update check
pub const ENV_UPDATE_CHECK: &str = "COVID_RADAR_UPDATE_CHECK";
/// Override for the GitHub repository releases are checked against
pub const ENV_GITHUB_SLUG: &str = "COVID_RADAR_GITHUB_SLUG";
/// Override for the GitHub API host, e.g. an enterprise instance
pub const ENV_GITHUB_API_URL: &str = "COVID_RADAR_GITHUB_API_URL";
/// Installed workflow version exported by the launcher
pub const ENV_WORKFLOW_VERSION: &str = "alfred_workflow_version";

/// Time-series payloads are refetched after an hour
pub const DATA_MAX_AGE: Duration = Duration::from_secs(3600);
/// The latest-release lookup is repeated once a day
pub const UPDATE_MAX_AGE: Duration = Duration::from_secs(86_400);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find a cache directory; set alfred_workflow_cache")]
    NoCacheDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub api_base_url: String,
    pub update_check: bool,
    pub github_slug: String,
    pub github_api_url: String,
    /// Version releases are compared against
    pub workflow_version: String,
    pub data_max_age: Duration,
    pub update_max_age: Duration,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_dir = match lookup(ENV_CACHE_DIR).filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => CacheManager::new()
                .map(|cache| cache.dir().to_path_buf())
                .ok_or(ConfigError::NoCacheDir)?,
        };

        Ok(Self {
            cache_dir,
            api_base_url: lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            update_check: lookup(ENV_UPDATE_CHECK).map_or(true, |v| parse_flag(&v)),
            github_slug: lookup(ENV_GITHUB_SLUG).unwrap_or_else(|| DEFAULT_GITHUB_SLUG.to_string()),
            github_api_url: lookup(ENV_GITHUB_API_URL)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            workflow_version: lookup(ENV_WORKFLOW_VERSION)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            data_max_age: DATA_MAX_AGE,
            update_max_age: UPDATE_MAX_AGE,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
