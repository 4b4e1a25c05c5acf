use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static DEFAULT_STORE_NAME: &str = "tasklight.json";
static PERMISSIONS_NAME: &str = "permissions.json";
static INSTALL_MARKER_NAME: &str = "installed";
static LOG_NAME: &str = "tasklight.log";
static CACHE_DIR_NAME: &str = "caches";
static ENV_DATA_DIR: &str = "TASKLIGHT_DATA_DIR";
static ENV_REMINDER_SECS: &str = "TASKLIGHT_REMINDER_SECS";

/// Reminders fire every two hours unless overridden.
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "tasklight", "tasklight"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    store_path: PathBuf,
    reminder_interval: Duration,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let config = Self::from_data_dir(data_dir)?;
        Ok(match reminder_interval_from_env() {
            Some(interval) => config.with_reminder_interval(interval),
            None => config,
        })
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let store_path = data_dir.join(DEFAULT_STORE_NAME);
        Ok(Self {
            data_dir,
            store_path,
            reminder_interval: DEFAULT_REMINDER_INTERVAL,
        })
    }

    pub fn with_reminder_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.reminder_interval = interval;
        }
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn permissions_path(&self) -> PathBuf {
        self.data_dir.join(PERMISSIONS_NAME)
    }

    pub fn install_marker_path(&self) -> PathBuf {
        self.data_dir.join(INSTALL_MARKER_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_NAME)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join(CACHE_DIR_NAME)
    }

    pub fn reminder_interval(&self) -> Duration {
        self.reminder_interval
    }
}

fn reminder_interval_from_env() -> Option<Duration> {
    let raw = env::var(ENV_REMINDER_SECS).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!(value = raw.as_str(), "ignoring invalid {}", ENV_REMINDER_SECS);
            None
        }
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-tasklight");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".tasklight"));
    }

    Ok(env::current_dir()?.join(".tasklight"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_live_under_data_dir() {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");

        assert_eq!(config.store_path(), dir.path().join("tasklight.json"));
        assert!(config.permissions_path().starts_with(dir.path()));
        assert!(config.cache_dir().starts_with(dir.path()));
        assert_eq!(config.reminder_interval(), DEFAULT_REMINDER_INTERVAL);
    }

    #[test]
    fn discover_creates_missing_override_dir() {
        let dir = TempDir::new().expect("temp dir");
        let nested = dir.path().join("nested").join("data");
        let config = AppConfig::discover(Some(nested.clone())).expect("discover");
        assert!(nested.exists());
        assert_eq!(config.data_dir(), nested.as_path());
    }

    #[test]
    fn zero_reminder_interval_is_ignored() {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf())
            .expect("config")
            .with_reminder_interval(Duration::ZERO);
        assert_eq!(config.reminder_interval(), DEFAULT_REMINDER_INTERVAL);

        let config = config.with_reminder_interval(Duration::from_secs(30));
        assert_eq!(config.reminder_interval(), Duration::from_secs(30));
    }
}
