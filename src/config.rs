use anyhow::{Context, Result};
use declarative::{ReconcileOptions, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// Settings from `config.toml`; every field is optional in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parallel provider calls
    pub jobs: usize,
    /// Per-call provider timeout
    pub timeout_secs: u64,
    /// Attempts for calls that time out, including the first
    pub retries: u32,
    /// Extra profile definitions, `*.toml`
    pub profiles_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs: 4,
            timeout_secs: 30,
            retries: 3,
            profiles_dir: None,
        }
    }
}

impl Config {
    /// Load the user config; a missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Expanded profiles directory, if configured
    pub fn profiles_path(&self) -> Option<PathBuf> {
        self.profiles_dir.as_deref().map(paths::expand)
    }

    /// Engine options; `jobs` overrides the configured value when given
    pub fn reconcile_options(&self, jobs: Option<usize>, dry_run: bool) -> ReconcileOptions {
        ReconcileOptions {
            jobs: jobs.unwrap_or(self.jobs).max(1),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryConfig {
                max_attempts: self.retries.max(1),
                ..RetryConfig::default()
            },
            dry_run,
            ..ReconcileOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "jobs = 8\nprofiles_dir = \"/etc/converge/profiles\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.jobs, 8);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(
            config.profiles_path(),
            Some(PathBuf::from("/etc/converge/profiles"))
        );
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "jobs = \"many\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_reconcile_options() {
        let config = Config {
            timeout_secs: 5,
            retries: 0,
            ..Config::default()
        };

        let options = config.reconcile_options(Some(0), true);
        assert_eq!(options.jobs, 1);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.retry.max_attempts, 1);
        assert!(options.dry_run);

        assert_eq!(config.reconcile_options(None, false).jobs, 4);
    }
}
