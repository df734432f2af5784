//! The release selection pipeline.
//!
//! One run: choose packages, pull registry history, overlay code-host
//! release notes, keep the releases not yet reported, score them, write
//! the dated digest, and persist the dedup state. Source failures degrade
//! inside the adapters; the only hard errors here are state persistence
//! and writing the newsletter itself.

use chrono::{Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, SelectionMode};
use crate::release::{PackageSelection, ReleaseRecord};
use crate::render;
use crate::scoring;
use crate::sources::{ReleaseHost, ReleaseRegistry};
use crate::state::{PackageState, StateError};
use crate::version;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading or saving the dedup state failed.
    #[error("State persistence failed: {0}")]
    State(#[from] StateError),

    /// Writing the newsletter failed.
    #[error("Failed to write newsletter: {0}")]
    Io(#[from] std::io::Error),
}

/// What one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Releases that met the importance threshold, newest first
    pub releases: Vec<ReleaseRecord>,
    /// Where the digest was written; `None` when nothing cleared the bar
    pub newsletter_path: Option<PathBuf>,
}

/// Orchestrates one newsletter run over a registry and a code host.
///
/// Generic over the source traits so tests can drive it with canned data.
pub struct Pipeline<R, H> {
    config: Config,
    registry: R,
    host: H,
    state: PackageState,
}

impl<R: ReleaseRegistry, H: ReleaseHost> Pipeline<R, H> {
    /// Build a pipeline, loading dedup state from the configured path.
    ///
    /// A missing state file starts empty; a corrupt one is an error.
    pub fn new(config: Config, registry: R, host: H) -> Result<Self, PipelineError> {
        let state = PackageState::load_from(Path::new(&config.state_file))?;
        Ok(Self {
            config,
            registry,
            host,
            state,
        })
    }

    /// Resolve the package list for this run.
    ///
    /// Custom names are trimmed and blanks dropped. The top-downloads
    /// ranking is fetched only for the modes that use it and only when
    /// `top_n` is positive. In `custom_and_top` mode the two lists merge
    /// with the first occurrence of a name winning.
    async fn select_packages(&self) -> Vec<PackageSelection> {
        let custom: Vec<String> = self
            .config
            .custom_packages
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let mut top: Vec<String> = vec![];
        let ranking_applies = matches!(
            self.config.mode,
            SelectionMode::CustomAndTop | SelectionMode::TopOnly
        );
        if ranking_applies && self.config.top_n > 0 {
            top = self.registry.fetch_top_packages(self.config.top_n).await;
        }

        let custom_count = custom.len();
        let top_count = top.len();
        let packages: Vec<String> = match self.config.mode {
            SelectionMode::CustomOnly => custom,
            SelectionMode::CustomAndTop => {
                let mut merged: Vec<String> = vec![];
                for name in custom.into_iter().chain(top.into_iter()) {
                    if !merged.contains(&name) {
                        merged.push(name);
                    }
                }
                merged
            }
            SelectionMode::TopOnly => top,
        };

        info!(
            selected = packages.len(),
            custom = custom_count,
            top = top_count,
            "Selected packages"
        );
        packages.into_iter().map(PackageSelection::new).collect()
    }

    /// Process one package: fetch, overlay, filter, score.
    ///
    /// Returns the releases that clear the importance bar. The newest
    /// observed version is recorded in state whenever anything new was
    /// seen, important or not, so the next run starts after it.
    async fn process_package(&mut self, selection: &mut PackageSelection) -> Vec<ReleaseRecord> {
        let (releases, linked_repo) = self.registry.fetch_releases(&selection.name).await;
        if linked_repo.is_some() {
            selection.linked_repo = linked_repo;
        }
        if releases.is_empty() {
            return vec![];
        }

        let mut host_releases: HashMap<String, ReleaseRecord> = HashMap::new();
        if let Some(repo) = &selection.linked_repo {
            let token = self.config.github_token();
            for release in self.host.fetch_releases(repo, token.as_deref()).await {
                host_releases.insert(release.version.clone(), release);
            }
        }

        let last_seen: Option<String> = self
            .state
            .last_seen(&selection.name)
            .map(|entry| entry.last_seen_version.clone())
            .filter(|version| !version.is_empty());
        let cutoff = Utc::now() - Duration::days(self.config.since_days);

        // Full version history, for previous-version lookups below
        let history = version::sorted_unique(releases.iter().map(|r| r.version.clone()));

        let mut fresh: Vec<ReleaseRecord> = vec![];
        for mut release in releases {
            if let Some(seen) = &last_seen {
                if version::compare(&release.version, seen) != Ordering::Greater {
                    continue;
                }
            } else if release.release_date < cutoff {
                continue;
            }

            if let Some(host_release) = host_releases.get(&release.version) {
                if !host_release.notes.is_empty() {
                    release.notes = host_release.notes.clone();
                }
                if !host_release.url.is_empty() {
                    release.url = host_release.url.clone();
                }
                if !host_release.summary.is_empty() {
                    release.summary = host_release.summary.clone();
                }
            }
            fresh.push(release);
        }

        let newest = fresh
            .iter()
            .map(|release| release.version.clone())
            .max_by(|a, b| version::compare(a, b));
        if let Some(newest) = &newest {
            self.state.record(&selection.name, newest);
        }

        let mut important: Vec<ReleaseRecord> = vec![];
        for mut release in fresh {
            let previous = match &last_seen {
                Some(seen) => Some(seen.as_str()),
                None => version::previous_version(&history, &release.version),
            };
            let result = scoring::score_release(&release, previous);
            release.importance_score = result.score;
            release.categories = result.categories;
            if release.importance_score >= self.config.min_importance_score {
                important.push(release);
            }
        }
        important
    }

    /// Execute one full run.
    ///
    /// The newsletter is written only when at least one release cleared
    /// the bar; state is saved at the very end, so a failed write leaves
    /// the previous state intact and the next run retries the same span.
    pub async fn run(mut self) -> Result<RunOutcome, PipelineError> {
        let mut selected = self.select_packages().await;

        let mut important: Vec<ReleaseRecord> = vec![];
        for selection in &mut selected {
            let found = self.process_package(selection).await;
            info!(
                package = %selection.name,
                important = found.len(),
                "Processed package"
            );
            important.extend(found);
        }

        important.sort_by(|a, b| b.release_date.cmp(&a.release_date));

        let today = Utc::now().date_naive();
        let newsletter_path = if important.is_empty() {
            info!("No important releases to report");
            None
        } else {
            let path =
                Path::new(&self.config.newsletter_output_dir).join(format!("{today}.md"));
            render::write_newsletter(&path, &important, today)?;
            info!(path = %path.display(), "Wrote newsletter");
            Some(path)
        };

        self.state.save_to(Path::new(&self.config.state_file))?;

        Ok(RunOutcome {
            releases: important,
            newsletter_path,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseOrigin;
    use chrono::{TimeZone, Utc};

    #[derive(Default)]
    struct FakeRegistry {
        top: Vec<String>,
        releases: HashMap<String, (Vec<ReleaseRecord>, Option<String>)>,
    }

    impl ReleaseRegistry for FakeRegistry {
        async fn fetch_releases(&self, package: &str) -> (Vec<ReleaseRecord>, Option<String>) {
            self.releases
                .get(package)
                .cloned()
                .unwrap_or((vec![], None))
        }

        async fn fetch_top_packages(&self, _limit: usize) -> Vec<String> {
            self.top.clone()
        }
    }

    #[derive(Default)]
    struct FakeHost {
        releases: HashMap<String, Vec<ReleaseRecord>>,
    }

    impl ReleaseHost for FakeHost {
        async fn fetch_releases(&self, repo: &str, _token: Option<&str>) -> Vec<ReleaseRecord> {
            self.releases.get(repo).cloned().unwrap_or_default()
        }
    }

    fn test_config(dir: &Path) -> Config {
        Config {
            state_file: dir.join("state.json").display().to_string(),
            newsletter_output_dir: dir.join("letters").display().to_string(),
            ..Config::default()
        }
    }

    fn registry_release(package: &str, version: &str, day: u32) -> ReleaseRecord {
        ReleaseRecord::new(
            package,
            version,
            Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            format!("https://pypi.org/project/{package}/{version}/"),
            ReleaseOrigin::Registry,
        )
    }

    fn pipeline(
        config: Config,
        registry: FakeRegistry,
        host: FakeHost,
    ) -> Pipeline<FakeRegistry, FakeHost> {
        Pipeline::new(config, registry, host).unwrap()
    }

    #[tokio::test]
    async fn test_select_custom_only_trims_and_drops_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            custom_packages: vec![
                "  requests ".to_string(),
                "".to_string(),
                "   ".to_string(),
                "flask".to_string(),
            ],
            ..test_config(dir.path())
        };

        let pipeline = pipeline(config, FakeRegistry::default(), FakeHost::default());
        let selected = pipeline.select_packages().await;

        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["requests", "flask"]);
    }

    #[tokio::test]
    async fn test_select_custom_and_top_merges_first_occurrence_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mode: SelectionMode::CustomAndTop,
            top_n: 10,
            custom_packages: vec!["a".to_string(), "b".to_string()],
            ..test_config(dir.path())
        };
        let registry = FakeRegistry {
            top: vec!["b".to_string(), "c".to_string()],
            ..FakeRegistry::default()
        };

        let pipeline = pipeline(config, registry, FakeHost::default());
        let selected = pipeline.select_packages().await;

        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_select_top_only_ignores_custom_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mode: SelectionMode::TopOnly,
            top_n: 10,
            custom_packages: vec!["ignored".to_string()],
            ..test_config(dir.path())
        };
        let registry = FakeRegistry {
            top: vec!["numpy".to_string(), "pandas".to_string()],
            ..FakeRegistry::default()
        };

        let pipeline = pipeline(config, registry, FakeHost::default());
        let selected = pipeline.select_packages().await;

        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["numpy", "pandas"]);
    }

    #[tokio::test]
    async fn test_select_zero_top_n_skips_ranking() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            mode: SelectionMode::CustomAndTop,
            top_n: 0,
            custom_packages: vec!["requests".to_string()],
            ..test_config(dir.path())
        };
        let registry = FakeRegistry {
            top: vec!["numpy".to_string()],
            ..FakeRegistry::default()
        };

        let pipeline = pipeline(config, registry, FakeHost::default());
        let selected = pipeline.select_packages().await;

        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["requests"]);
    }

    #[tokio::test]
    async fn test_process_package_records_newest_version_even_when_unimportant() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            custom_packages: vec!["tiny".to_string()],
            min_importance_score: 100.0,
            since_days: 36500,
            ..test_config(dir.path())
        };
        let registry = FakeRegistry {
            releases: HashMap::from([(
                "tiny".to_string(),
                (
                    vec![
                        registry_release("tiny", "1.0.0", 1),
                        registry_release("tiny", "1.0.1", 2),
                    ],
                    None,
                ),
            )]),
            ..FakeRegistry::default()
        };

        let mut pipeline = pipeline(config, registry, FakeHost::default());
        let mut selection = PackageSelection::new("tiny");
        let important = pipeline.process_package(&mut selection).await;

        assert!(important.is_empty());
        let entry = pipeline.state.last_seen("tiny").unwrap();
        assert_eq!(entry.last_seen_version, "1.0.1");
    }

    #[tokio::test]
    async fn test_process_package_overlays_host_notes_by_version() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            custom_packages: vec!["widget".to_string()],
            min_importance_score: 0.0,
            since_days: 36500,
            ..test_config(dir.path())
        };
        let registry = FakeRegistry {
            releases: HashMap::from([(
                "widget".to_string(),
                (
                    vec![registry_release("widget", "2.0.0", 5)],
                    Some("acme/widget".to_string()),
                ),
            )]),
            ..FakeRegistry::default()
        };
        let mut host_release = registry_release("widget", "2.0.0", 5);
        host_release.source = ReleaseOrigin::CodeHost;
        host_release.notes = "Breaking: rewrote the API".to_string();
        host_release.url = "https://github.com/acme/widget/releases/tag/v2.0.0".to_string();
        host_release.summary = "The rewrite".to_string();
        let host = FakeHost {
            releases: HashMap::from([("acme/widget".to_string(), vec![host_release])]),
        };

        let mut pipeline = pipeline(config, registry, host);
        let mut selection = PackageSelection::new("widget");
        let important = pipeline.process_package(&mut selection).await;

        assert_eq!(selection.linked_repo.as_deref(), Some("acme/widget"));
        assert_eq!(important.len(), 1);
        assert_eq!(important[0].notes, "Breaking: rewrote the API");
        assert_eq!(
            important[0].url,
            "https://github.com/acme/widget/releases/tag/v2.0.0"
        );
        assert_eq!(important[0].summary, "The rewrite");
        // Overlay keeps the registry origin
        assert_eq!(important[0].source, ReleaseOrigin::Registry);
    }

    #[tokio::test]
    async fn test_process_package_empty_overlay_keeps_registry_fields() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            custom_packages: vec!["widget".to_string()],
            min_importance_score: 0.0,
            since_days: 36500,
            ..test_config(dir.path())
        };
        let mut registry_rel = registry_release("widget", "2.0.0", 5);
        registry_rel.notes = "registry notes".to_string();
        let registry = FakeRegistry {
            releases: HashMap::from([(
                "widget".to_string(),
                (vec![registry_rel], Some("acme/widget".to_string())),
            )]),
            ..FakeRegistry::default()
        };
        let mut host_release = registry_release("widget", "2.0.0", 5);
        host_release.notes = String::new();
        host_release.url = String::new();
        let host = FakeHost {
            releases: HashMap::from([("acme/widget".to_string(), vec![host_release])]),
        };

        let mut pipeline = pipeline(config, registry, host);
        let mut selection = PackageSelection::new("widget");
        let important = pipeline.process_package(&mut selection).await;

        assert_eq!(important[0].notes, "registry notes");
        assert_eq!(important[0].url, "https://pypi.org/project/widget/2.0.0/");
    }
}
