//! PyPI registry adapter.
//!
//! Fetches release history from the PyPI JSON API, normalizing each
//! version into a [`ReleaseRecord`]: the release date is the newest upload
//! time across the version's files, and versions with no dated files are
//! skipped rather than failing the package. Also discovers the package's
//! GitHub repository from its advertised project URLs and fetches the
//! external top-downloads ranking used by the `top_only` and
//! `custom_and_top` selection modes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{REQUEST_TIMEOUT, ReleaseRegistry, SourceError};
use crate::release::{ReleaseOrigin, ReleaseRecord, parse_timestamp};

/// Public PyPI instance.
const PYPI_BASE_URL: &str = "https://pypi.org";

/// Monthly download ranking, maintained outside PyPI itself.
const TOP_PACKAGES_URL: &str =
    "https://hugovk.github.io/top-pypi-packages/top-pypi-packages-30-days.min.json";

/// Client for the PyPI JSON API.
pub struct PypiClient {
    http: Client,
    base_url: String,
    top_packages_url: String,
}

impl PypiClient {
    /// Client against the public PyPI endpoints.
    pub fn new() -> Self {
        Self::with_urls(PYPI_BASE_URL, TOP_PACKAGES_URL)
    }

    /// Client against alternate endpoints. Tests point this at a mock
    /// server.
    pub fn with_urls(base_url: impl Into<String>, top_packages_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            top_packages_url: top_packages_url.into(),
        }
    }

    /// All releases for `package` plus its linked repository, if any.
    async fn releases(
        &self,
        package: &str,
    ) -> Result<(Vec<ReleaseRecord>, Option<String>), SourceError> {
        let url = format!("{}/pypi/{}/json", self.base_url, package);
        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let project: PypiProject = response.json().await?;

        let summary = project.info.summary.clone().unwrap_or_default();
        let mut releases: Vec<ReleaseRecord> = project
            .releases
            .into_iter()
            .filter_map(|(version, files)| {
                if version.trim().is_empty() {
                    return None;
                }
                let date = files.iter().filter_map(PypiFile::upload_time).max()?;
                let mut record = ReleaseRecord::new(
                    package,
                    version.as_str(),
                    date,
                    format!("{}/project/{}/{}/", self.base_url, package, version),
                    ReleaseOrigin::Registry,
                );
                record.summary = summary.clone();
                Some(record)
            })
            .collect();
        releases.sort_by_key(|record| record.release_date);

        let linked_repo = find_linked_repo(&project.info);
        debug!(
            package,
            releases = releases.len(),
            repo = linked_repo.as_deref().unwrap_or("-"),
            "Fetched registry history"
        );
        Ok((releases, linked_repo))
    }

    /// The top `limit` package names from the download ranking.
    async fn top_packages(&self, limit: usize) -> Result<Vec<String>, SourceError> {
        let response = self
            .http
            .get(&self.top_packages_url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let ranking: TopPackagesResponse = response.json().await?;
        Ok(ranking
            .rows
            .into_iter()
            .filter(|row| !row.project.is_empty())
            .take(limit)
            .map(|row| row.project)
            .collect())
    }
}

impl Default for PypiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseRegistry for PypiClient {
    async fn fetch_releases(&self, package: &str) -> (Vec<ReleaseRecord>, Option<String>) {
        match self.releases(package).await {
            Ok(result) => result,
            Err(err) => {
                warn!(package, "Registry fetch failed: {err}");
                (vec![], None)
            }
        }
    }

    async fn fetch_top_packages(&self, limit: usize) -> Vec<String> {
        match self.top_packages(limit).await {
            Ok(names) => names,
            Err(err) => {
                error!("Failed to fetch top-packages ranking: {err}");
                vec![]
            }
        }
    }
}

/// Find an "owner/repo" GitHub identifier among the project's advertised
/// URLs. Project URLs are checked before the homepage.
fn find_linked_repo(info: &PypiInfo) -> Option<String> {
    info.project_urls
        .iter()
        .flatten()
        .filter_map(|(_, url)| url.as_deref())
        .chain(info.home_page.as_deref())
        .find_map(parse_repo_url)
}

/// Normalize a GitHub URL to its "owner/repo" identifier.
fn parse_repo_url(url: &str) -> Option<String> {
    let rest = url.trim().split("github.com/").nth(1)?;
    let mut segments = rest.trim_matches('/').split('/');
    let owner = segments.next()?;
    let repo = segments.next().unwrap_or_default().trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(format!("{owner}/{repo}"))
}

// ============================================================================
// Response Structures
// ============================================================================

/// Response from the PyPI `/pypi/{name}/json` endpoint.
#[derive(Debug, Deserialize)]
struct PypiProject {
    /// Project-level metadata
    #[serde(default)]
    info: PypiInfo,
    /// Map of version numbers to uploaded files
    #[serde(default)]
    releases: BTreeMap<String, Vec<PypiFile>>,
}

/// Project-level metadata from PyPI.
#[derive(Debug, Default, Deserialize)]
struct PypiInfo {
    /// One-line project description
    #[serde(default)]
    summary: Option<String>,
    /// Legacy homepage field
    #[serde(default)]
    home_page: Option<String>,
    /// Labeled project URLs; values can be null
    #[serde(default)]
    project_urls: Option<BTreeMap<String, Option<String>>>,
}

/// One uploaded file of a release.
#[derive(Debug, Deserialize)]
struct PypiFile {
    /// Upload timestamp with offset
    #[serde(default)]
    upload_time_iso_8601: Option<String>,
    /// Legacy upload timestamp without offset
    #[serde(default)]
    upload_time: Option<String>,
}

impl PypiFile {
    fn upload_time(&self) -> Option<DateTime<Utc>> {
        self.upload_time_iso_8601
            .as_deref()
            .or(self.upload_time.as_deref())
            .and_then(parse_timestamp)
    }
}

/// Response from the top-packages ranking document.
#[derive(Debug, Deserialize)]
struct TopPackagesResponse {
    #[serde(default)]
    rows: Vec<TopPackageRow>,
}

/// One ranked package.
#[derive(Debug, Deserialize)]
struct TopPackageRow {
    #[serde(default)]
    project: String,
}

// ============================================================================
// Tests
// ============================================================================
