//! Self-update check against GitHub releases
//!
//! Looks up the latest published release of the workflow and compares its tag
//! with the running version. The lookup is cached so the launcher only pays
//! for one GitHub request a day. Installing the release is left to the launcher.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::cache::{CacheError, CacheManager};

/// Repository the workflow is released from
pub const DEFAULT_GITHUB_SLUG: &str = "xilopaint/alfred-covid-19-radar";

/// GitHub REST API host
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Cache key for the latest-release lookup
const LATEST_RELEASE_KEY: &str = "latest_release";

/// The check is opportunistic, so it gets a tight timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while checking for an update
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Release lookup failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Release lookup returned HTTP {status}")]
    Http { status: u16 },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// The subset of GitHub's release object we need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestRelease {
    pub tag_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Checks GitHub for a newer release than the running binary
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    client: Client,
    api_url: String,
    slug: String,
    current_version: String,
}

impl UpdateChecker {
    /// Create a checker for `slug` (`owner/repo`) using the crate version
    pub fn new(slug: impl Into<String>) -> Result<Self, UpdateError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            slug: slug.into(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Compare against a different running version
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Query a different API host
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_url.trim_end_matches('/'),
            self.slug
        )
    }

    /// Web page of `release`, falling back to the repository's latest-release page
    pub fn release_page(&self, release: &LatestRelease) -> String {
        release
            .html_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}/releases/latest", self.slug))
    }

    async fn fetch_latest(&self) -> Result<LatestRelease, UpdateError> {
        let url = self.latest_release_url();
        info!(%url, "checking for a newer release");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Http {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<LatestRelease>().await?)
    }

    /// Returns the latest release if it is newer than the running version
    ///
    /// The release lookup is served from `cache` while younger than `max_age`.
    pub async fn update_available(
        &self,
        cache: &CacheManager,
        max_age: Duration,
    ) -> Result<Option<LatestRelease>, UpdateError> {
        let latest: LatestRelease = cache
            .get_or_refresh(LATEST_RELEASE_KEY, max_age, || self.fetch_latest())
            .await?;

        if is_newer(&latest.tag_name, &self.current_version) {
            Ok(Some(latest))
        } else {
            Ok(None)
        }
    }
}

/// Whether version `candidate` is strictly newer than `current`
///
/// Versions are compared numerically component by component, ignoring a leading
/// `v` and any pre-release or build suffix. Missing components count as zero.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = version_parts(a);
    let b = version_parts(b);
    let len = a.len().max(b.len());

    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn version_parts(version: &str) -> Vec<u64> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    let core = version.split(['-', '+']).next().unwrap_or("");
    core.split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}
