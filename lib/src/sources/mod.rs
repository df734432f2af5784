//! Release source adapters.
//!
//! Two external services feed the pipeline: the package registry and the
//! code host. Each is exposed as a small capability trait so the pipeline
//! can be driven by deterministic fakes in tests. The concrete clients
//! wrap `reqwest`; failures never cross the trait boundary. The impls log
//! and degrade to empty results so an unreachable service costs one
//! package's data, not the run.

pub mod github;
pub mod pypi;

pub use github::GithubClient;
pub use pypi::PypiClient;

use std::time::Duration;

use thiserror::Error;

use crate::release::ReleaseRecord;

/// Timeout applied to every source API request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised inside the concrete source clients.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed or returned an error status
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The code host refused the request as rate limited
    #[error("API rate limit exceeded")]
    RateLimited,
}

/// The package registry the pipeline reads release history from.
#[allow(async_fn_in_trait)]
pub trait ReleaseRegistry {
    /// All published releases for `package`, ascending by release date,
    /// plus the linked "owner/repo" identifier when the package advertises
    /// one. Fetch failures degrade to `(empty, None)`.
    async fn fetch_releases(&self, package: &str) -> (Vec<ReleaseRecord>, Option<String>);

    /// Names of the most-downloaded packages, best effort: any failure
    /// degrades to an empty list.
    async fn fetch_top_packages(&self, limit: usize) -> Vec<String>;
}

/// The code host whose release notes enrich registry records.
#[allow(async_fn_in_trait)]
pub trait ReleaseHost {
    /// Published releases for an "owner/repo" identifier. Rate limiting,
    /// auth failures, and transport errors all degrade to an empty list.
    async fn fetch_releases(&self, repo: &str, token: Option<&str>) -> Vec<ReleaseRecord>;
}
