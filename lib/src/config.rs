//! YAML configuration for pipeline runs.
//!
//! A run is driven entirely by one config file. Every field has a default,
//! so an empty file is a valid configuration; loading also prepares the
//! output and state directories so the rest of the run can assume they
//! exist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file does not exist.
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML or fails validation.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// How the set of packages for a run is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Only the packages listed in `custom_packages`
    #[default]
    CustomOnly,
    /// The custom list followed by the top-downloads ranking, deduplicated
    CustomAndTop,
    /// Only the top-downloads ranking
    TopOnly,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::CustomOnly => write!(f, "custom_only"),
            SelectionMode::CustomAndTop => write!(f, "custom_and_top"),
            SelectionMode::TopOnly => write!(f, "top_only"),
        }
    }
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Package selection strategy
    pub mode: SelectionMode,
    /// How many top-downloaded packages to include (0 disables the ranking)
    pub top_n: usize,
    /// Explicitly tracked package names
    pub custom_packages: Vec<String>,
    /// Directory the dated newsletter files are written into
    pub newsletter_output_dir: String,
    /// Path of the JSON dedup state file
    pub state_file: String,
    /// Look-back window for packages with no recorded state
    pub since_days: i64,
    /// Minimum importance score a release needs to appear in the digest
    pub min_importance_score: f64,
    /// Name of the environment variable holding the code-host API token
    pub github_token_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: SelectionMode::CustomOnly,
            top_n: 0,
            custom_packages: vec![],
            newsletter_output_dir: "newsletters".to_string(),
            state_file: "state.json".to_string(),
            since_days: 30,
            min_importance_score: 3.0,
            github_token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

impl Config {
    /// Load a configuration file, filling missing fields with defaults.
    ///
    /// An empty or comments-only file yields the default configuration.
    /// Creates `newsletter_output_dir` and the parent directory of
    /// `state_file` as a side effect.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)?;
        let config: Config = if value.is_null() {
            Config::default()
        } else {
            serde_yaml::from_value(value)?
        };

        fs::create_dir_all(&config.newsletter_output_dir)?;
        let state_parent = Path::new(&config.state_file)
            .parent()
            .filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = state_parent {
            fs::create_dir_all(parent)?;
        }

        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// The code-host API token from the configured environment variable,
    /// trimmed; missing or blank values count as absent.
    pub fn github_token(&self) -> Option<String> {
        std::env::var(&self.github_token_env)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Render the effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.mode, SelectionMode::CustomOnly);
        assert_eq!(config.top_n, 0);
        assert!(config.custom_packages.is_empty());
        assert_eq!(config.newsletter_output_dir, "newsletters");
        assert_eq!(config.state_file, "state.json");
        assert_eq!(config.since_days, 30);
        assert_eq!(config.min_importance_score, 3.0);
        assert_eq!(config.github_token_env, "GITHUB_TOKEN");
    }

    #[test]
    fn test_comments_only_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "# nothing configured yet\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.mode, SelectionMode::CustomOnly);
    }

    #[test]
    fn test_partial_file_overrides_some_fields() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "mode: custom_and_top\ntop_n: 25\ncustom_packages:\n  - requests\n  - flask\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.mode, SelectionMode::CustomAndTop);
        assert_eq!(config.top_n, 25);
        assert_eq!(config.custom_packages, vec!["requests", "flask"]);
        // untouched fields keep their defaults
        assert_eq!(config.since_days, 30);
        assert_eq!(config.min_importance_score, 3.0);
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "mode: weekly\n");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("custom_only"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "frequency: daily\n");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "mode: [unclosed\n");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_prepares_directories() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("out").join("letters");
        let state_file = dir.path().join("data").join("state.json");
        let path = write_config(
            dir.path(),
            &format!(
                "newsletter_output_dir: {}\nstate_file: {}\n",
                out_dir.display(),
                state_file.display()
            ),
        );

        Config::load(&path).unwrap();
        assert!(out_dir.is_dir());
        assert!(state_file.parent().unwrap().is_dir());
    }

    #[test]
    fn test_github_token_read_and_trimmed() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "github_token_env: GAZETTE_TEST_TOKEN_A\n");
        let config = Config::load(&path).unwrap();

        unsafe { env::set_var("GAZETTE_TEST_TOKEN_A", "  s3cret  ") };
        assert_eq!(config.github_token(), Some("s3cret".to_string()));
    }

    #[test]
    fn test_github_token_blank_counts_as_absent() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "github_token_env: GAZETTE_TEST_TOKEN_B\n");
        let config = Config::load(&path).unwrap();

        assert_eq!(config.github_token(), None);
        unsafe { env::set_var("GAZETTE_TEST_TOKEN_B", "   ") };
        assert_eq!(config.github_token(), None);
    }

    #[test]
    fn test_to_yaml_round_trips() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("mode: custom_only"));
        assert!(yaml.contains("state_file: state.json"));

        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.top_n, config.top_n);
        assert_eq!(parsed.mode, config.mode);
    }

    #[test]
    fn test_selection_mode_display() {
        assert_eq!(SelectionMode::CustomOnly.to_string(), "custom_only");
        assert_eq!(SelectionMode::CustomAndTop.to_string(), "custom_and_top");
        assert_eq!(SelectionMode::TopOnly.to_string(), "top_only");
    }
}
