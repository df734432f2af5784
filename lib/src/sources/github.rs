//! GitHub code-host adapter.
//!
//! Fetches tagged releases for a repository from the GitHub REST API and
//! normalizes them into [`ReleaseRecord`]s keyed by version, so the
//! pipeline can overlay changelog bodies onto registry records. The API
//! is generous to anonymous callers but rate limited; limit responses
//! degrade to an empty list instead of failing the package.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{REQUEST_TIMEOUT, ReleaseHost, SourceError};
use crate::release::{ReleaseOrigin, ReleaseRecord, parse_timestamp};

/// Public GitHub REST endpoint.
const GITHUB_API_URL: &str = "https://api.github.com";

/// Strip the conventional `v` prefix and surrounding whitespace from a
/// release tag ("v1.2.3" becomes "1.2.3").
///
/// ## Examples
///
/// ```
/// use gazette_lib::sources::github::normalize_tag;
///
/// assert_eq!(normalize_tag("v1.2.3"), "1.2.3");
/// assert_eq!(normalize_tag("2.0.0  "), "2.0.0");
/// assert_eq!(normalize_tag("vv2.0"), "2.0");
/// ```
pub fn normalize_tag(tag: &str) -> String {
    tag.trim_start_matches('v').trim().to_string()
}

/// Client for the GitHub releases API.
pub struct GithubClient {
    http: Client,
    base_url: String,
}

impl GithubClient {
    /// Client against the public GitHub API.
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_URL)
    }

    /// Client against an alternate endpoint. Tests point this at a mock
    /// server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Published releases for an "owner/repo" identifier, ascending by
    /// publication date.
    async fn releases(
        &self,
        repo: &str,
        token: Option<&str>,
    ) -> Result<Vec<ReleaseRecord>, SourceError> {
        let url = format!("{}/repos/{}/releases", self.base_url, repo);
        let mut request = self
            .http
            .get(&url)
            .header("User-Agent", "gazette-lib")
            .header("Accept", "application/vnd.github+json")
            .timeout(REQUEST_TIMEOUT);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await?;
        if matches!(
            response.status(),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
        ) {
            return Err(SourceError::RateLimited);
        }
        let payload: Vec<GithubRelease> = response.error_for_status()?.json().await?;

        let package = repo.rsplit('/').next().unwrap_or(repo);
        let mut releases: Vec<ReleaseRecord> = payload
            .into_iter()
            .filter_map(|release| release.into_record(package, &url))
            .collect();
        releases.sort_by_key(|record| record.release_date);

        debug!(repo, releases = releases.len(), "Fetched code-host releases");
        Ok(releases)
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseHost for GithubClient {
    async fn fetch_releases(&self, repo: &str, token: Option<&str>) -> Vec<ReleaseRecord> {
        match self.releases(repo, token).await {
            Ok(releases) => releases,
            Err(SourceError::RateLimited) => {
                warn!(repo, "Code-host API rate limited, continuing without release notes");
                vec![]
            }
            Err(err) => {
                warn!(repo, "Code-host fetch failed: {err}");
                vec![]
            }
        }
    }
}

// ============================================================================
// Response Structures
// ============================================================================

/// One release from the GitHub `/repos/{owner}/{repo}/releases` endpoint.
#[derive(Debug, Deserialize)]
struct GithubRelease {
    /// Git tag, e.g. "v1.2.3"
    #[serde(default)]
    tag_name: String,
    /// Release title
    #[serde(default)]
    name: Option<String>,
    /// Release notes body (markdown)
    #[serde(default)]
    body: Option<String>,
    /// Human-facing release page
    #[serde(default)]
    html_url: Option<String>,
    /// API URL, fallback when `html_url` is absent
    #[serde(default)]
    url: Option<String>,
    /// Publication timestamp; absent for drafts
    #[serde(default)]
    published_at: Option<String>,
    /// Draft releases are invisible to most callers and skipped here
    #[serde(default)]
    draft: bool,
}

impl GithubRelease {
    /// Normalize into a [`ReleaseRecord`], or `None` for drafts, undated
    /// entries, and empty tags.
    fn into_record(self, package: &str, listing_url: &str) -> Option<ReleaseRecord> {
        if self.draft {
            return None;
        }
        let date = parse_timestamp(self.published_at.as_deref()?)?;
        let version = normalize_tag(&self.tag_name);
        if version.is_empty() {
            return None;
        }

        let url = self
            .html_url
            .filter(|u| !u.is_empty())
            .or(self.url.filter(|u| !u.is_empty()))
            .unwrap_or_else(|| listing_url.to_string());
        let notes = self.body.unwrap_or_default();
        let summary = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => notes.clone(),
        };

        let mut record = ReleaseRecord::new(package, version, date, url, ReleaseOrigin::CodeHost);
        record.notes = notes;
        record.summary = summary;
        Some(record)
    }
}

// ============================================================================
// Tests
// ============================================================================
