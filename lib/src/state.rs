//! Persisted per-package dedup state.
//!
//! The pipeline remembers the newest version it has seen for each package
//! in a single JSON document. The whole mapping is loaded at run start,
//! owned by the pipeline while it works, and written back atomically once
//! at run end.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur when loading or saving state.
#[derive(Debug, Error)]
pub enum StateError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state document is not valid JSON.
    #[error("Failed to parse state file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Bookkeeping for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Newest version observed in any prior run
    pub last_seen_version: String,
    /// When that version was recorded
    pub last_checked_at: DateTime<Utc>,
}

/// On-disk shape before per-entry validation. Entries stay as raw JSON so
/// one malformed entry cannot abort the whole load.
#[derive(Debug, Deserialize)]
struct RawStateDocument {
    #[serde(default)]
    packages: HashMap<String, serde_json::Value>,
}

/// The persisted package → last-seen-version mapping.
///
/// Stored as a single JSON document with a top-level `"packages"` object:
///
/// ```json
/// {
///   "packages": {
///     "requests": {
///       "last_seen_version": "2.32.3",
///       "last_checked_at": "2026-08-21T09:15:00Z"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageState {
    /// Map of package name to its last-seen entry.
    #[serde(default)]
    packages: HashMap<String, StateEntry>,
}

impl PackageState {
    /// Create a new empty state mapping.
    pub fn new() -> Self {
        Self {
            packages: HashMap::new(),
        }
    }

    /// Load state from a specific path.
    ///
    /// A missing file yields an empty mapping. Individual entries that do
    /// not match the expected shape (missing field, unparseable timestamp)
    /// are dropped with a warning while the rest load normally. A document
    /// that is not valid JSON at all is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let raw: RawStateDocument = serde_json::from_reader(reader)?;

        let mut packages = HashMap::with_capacity(raw.packages.len());
        for (name, value) in raw.packages {
            match serde_json::from_value::<StateEntry>(value) {
                Ok(entry) => {
                    packages.insert(name, entry);
                }
                Err(err) => {
                    warn!(package = %name, "Dropping malformed state entry: {err}");
                }
            }
        }

        Ok(Self { packages })
    }

    /// Save state to a specific path.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption, and
    /// creates parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Get the recorded entry for a package.
    pub fn last_seen(&self, package: &str) -> Option<&StateEntry> {
        self.packages.get(package)
    }

    /// Record the newest observed version for a package.
    ///
    /// Replaces any existing entry wholesale, stamping the current time.
    pub fn record(&mut self, package: &str, version: &str) {
        self.packages.insert(
            package.to_string(),
            StateEntry {
                last_seen_version: version.to_string(),
                last_checked_at: Utc::now(),
            },
        );
    }

    /// Number of tracked packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether any packages are tracked.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate over all tracked packages.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateEntry)> {
        self.packages.iter()
    }
}
