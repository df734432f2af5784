//! Core types for package release tracking.
//!
//! This module defines the data structures shared by the source adapters,
//! the importance scorer, and the selection pipeline: a normalized release
//! record, the package selection produced from configuration, and the
//! timestamp parsing both adapters rely on.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a release record came from.
///
/// Every record is born in exactly one source; the pipeline may later
/// overlay fields from the code host onto a registry record, but the
/// record keeps its registry origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOrigin {
    /// The package registry (PyPI)
    Registry,
    /// The code-hosting release API (GitHub)
    CodeHost,
}

impl fmt::Display for ReleaseOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseOrigin::Registry => write!(f, "registry"),
            ReleaseOrigin::CodeHost => write!(f, "code_host"),
        }
    }
}

/// A single release of a package, normalized from either source.
///
/// `importance_score` and `categories` start empty and are filled in by the
/// scorer; the first category is the primary bucket used for grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Package name as known to the registry
    pub package: String,
    /// Version string (semantic-version-like, not guaranteed valid)
    pub version: String,
    /// When the release was published
    pub release_date: DateTime<Utc>,
    /// Human-facing page for the release
    pub url: String,
    /// Which source produced this record
    pub source: ReleaseOrigin,
    /// Release notes / changelog body, possibly empty
    #[serde(default)]
    pub notes: String,
    /// One-line description, possibly empty
    #[serde(default)]
    pub summary: String,
    /// Heuristic importance, assigned by the scorer
    #[serde(default)]
    pub importance_score: f64,
    /// Category tags, assigned by the scorer; first entry is primary
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ReleaseRecord {
    /// Creates a record with empty notes, summary, and scoring fields.
    ///
    /// ## Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use gazette_lib::release::{ReleaseOrigin, ReleaseRecord};
    ///
    /// let rel = ReleaseRecord::new(
    ///     "requests",
    ///     "2.32.0",
    ///     Utc::now(),
    ///     "https://pypi.org/project/requests/2.32.0/",
    ///     ReleaseOrigin::Registry,
    /// );
    /// assert_eq!(rel.package, "requests");
    /// assert!(rel.categories.is_empty());
    /// ```
    pub fn new(
        package: impl Into<String>,
        version: impl Into<String>,
        release_date: DateTime<Utc>,
        url: impl Into<String>,
        source: ReleaseOrigin,
    ) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            release_date,
            url: url.into(),
            source,
            notes: String::new(),
            summary: String::new(),
            importance_score: 0.0,
            categories: vec![],
        }
    }
}

/// A package chosen for processing in one pipeline run.
///
/// Built from configuration (and the top-downloads ranking when the mode
/// asks for it); `linked_repo` is filled once from registry metadata and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSelection {
    /// Package name as known to the registry
    pub name: String,
    /// "owner/repo" identifier on the code host, when discovered
    pub linked_repo: Option<String>,
}

impl PackageSelection {
    /// Creates a selection with no linked repository.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            linked_repo: None,
        }
    }
}

/// Parse timestamps as both sources emit them.
///
/// Accepts RFC 3339 ("2024-01-15T10:30:00Z", with or without an offset)
/// and the naive ISO form PyPI uses for older upload times
/// ("2024-01-15T10:30:00"), which is taken as UTC. Returns `None` for
/// anything else so callers can skip the affected release.
///
/// ## Examples
///
/// ```
/// use gazette_lib::release::parse_timestamp;
///
/// let a = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
/// let b = parse_timestamp("2024-01-15T10:30:00").unwrap();
/// assert_eq!(a, b);
/// assert!(parse_timestamp("not a date").is_none());
/// ```
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // PyPI's legacy upload_time field has no offset
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    None
}
