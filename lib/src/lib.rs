//! Gazette Library - Python package release newsletters
//!
//! Tracks new releases of Python packages across the PyPI registry and
//! GitHub, scores each release with a version-bump and keyword heuristic,
//! and renders the notable ones into a grouped markdown digest. A small
//! JSON state file remembers what was already reported, so repeated runs
//! only surface what changed.
//!
//! [`pipeline::Pipeline`] ties the pieces together; the submodules are
//! usable on their own.

pub mod config;
pub mod pipeline;
pub mod release;
pub mod render;
pub mod scoring;
pub mod sources;
pub mod state;
pub mod version;

// Re-export main types and functions for convenience
pub use config::{Config, ConfigError, SelectionMode};
pub use pipeline::{Pipeline, PipelineError, RunOutcome};
pub use release::{PackageSelection, ReleaseOrigin, ReleaseRecord};
pub use sources::{GithubClient, PypiClient, ReleaseHost, ReleaseRegistry};
pub use state::PackageState;
