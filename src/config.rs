//! Configuration management for JobScout.
//!
//! Runtime settings come from three layers, lowest priority first:
//! built-in defaults, a TOML config file, environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "jobscout.db";

/// Default retention of scrape attempt rows, in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// User agent for HTTP requests ("rotate" picks a browser agent).
    pub user_agent: Option<String>,
    /// Per-fetch wall-clock budget in seconds.
    pub request_timeout_secs: u64,
    /// Scheduler tick interval in seconds.
    pub tick_interval_secs: u64,
    /// Worker tasks draining the scheduler queue.
    pub workers: usize,
    /// Transient-failure retries per work item.
    pub max_retries: u32,
    /// Delay before a retried work item re-enters the queue, in seconds.
    pub retry_backoff_secs: u64,
    /// Push webhook endpoint; absent means deliveries are logged only.
    pub push_endpoint: Option<String>,
    /// Scrape attempt retention in days.
    pub retention_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: data dir -> home dir -> current dir.
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jobscout");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            user_agent: None,
            request_timeout_secs: 30,
            tick_interval_secs: 900,
            workers: 4,
            max_retries: 2,
            retry_backoff_secs: 5,
            push_endpoint: None,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl Settings {
    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Full path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        self.database_url.is_some() || self.database_path().exists()
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }

    /// Create a database context for the configured database.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

/// Configuration file structure (`jobscout.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
}

impl Config {
    /// Load configuration from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{}': {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("failed to parse config file '{}': {e}", path.display()))
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = PathBuf::from(data_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout_secs = timeout;
        }
        if let Some(tick) = self.tick_interval {
            settings.tick_interval_secs = tick;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers.max(1);
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
        if let Some(backoff) = self.retry_backoff {
            settings.retry_backoff_secs = backoff;
        }
        if let Some(ref endpoint) = self.push_endpoint {
            settings.push_endpoint = Some(endpoint.clone());
        }
        if let Some(days) = self.retention_days {
            settings.retention_days = days;
        }
    }
}

/// Look for a config file in standard locations:
/// `./jobscout.toml`, then `{data_dir}/jobscout.toml`.
fn discover_config(data_dir: &Path) -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("jobscout.toml"),
        data_dir.join("jobscout.toml"),
    ];
    candidates.into_iter().find(|p| p.exists())
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory override (--data flag).
    pub data_dir: Option<PathBuf>,
}

/// Load settings with explicit options and environment overrides.
pub fn load_settings(options: LoadOptions) -> Settings {
    let mut settings = Settings::default();

    let config_path = options
        .config_path
        .clone()
        .or_else(|| discover_config(options.data_dir.as_deref().unwrap_or(&settings.data_dir)));

    if let Some(path) = config_path {
        match Config::load_from_path(&path) {
            Ok(config) => config.apply_to_settings(&mut settings),
            Err(e) => tracing::warn!("{e}"),
        }
    }

    // --data flag beats the config file.
    if let Some(data_dir) = options.data_dir {
        settings.data_dir = data_dir;
    }

    // Environment variables take highest precedence.
    if let Some(url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using DATABASE_URL from environment");
        settings.database_url = Some(url);
    }
    if let Some(endpoint) = std::env::var("JOBSCOUT_PUSH_ENDPOINT")
        .ok()
        .filter(|s| !s.is_empty())
    {
        settings.push_endpoint = Some(endpoint);
    }
    if let Some(agent) = std::env::var("JOBSCOUT_USER_AGENT")
        .ok()
        .filter(|s| !s.is_empty())
    {
        settings.user_agent = Some(agent);
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_applies_overrides() {
        let mut settings = Settings::default();
        let config: Config = toml::from_str(
            r#"
            data_dir = "/var/lib/jobscout"
            request_timeout = 10
            workers = 8
            push_endpoint = "https://push.example.com/send"
            "#,
        )
        .unwrap();

        config.apply_to_settings(&mut settings);
        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/jobscout"));
        assert_eq!(settings.request_timeout_secs, 10);
        assert_eq!(settings.workers, 8);
        assert_eq!(
            settings.push_endpoint.as_deref(),
            Some("https://push.example.com/send")
        );
        // Untouched fields keep defaults.
        assert_eq!(settings.tick_interval_secs, 900);
    }

    #[test]
    fn test_load_from_path_rejects_bad_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobscout.toml");
        std::fs::write(&path, "workers = \"many\"").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn test_database_url_from_path() {
        let mut settings = Settings::default();
        settings.data_dir = PathBuf::from("/tmp/js");
        assert_eq!(settings.database_url(), "sqlite:/tmp/js/jobscout.db");

        settings.database_url = Some("sqlite:/elsewhere.db".to_string());
        assert_eq!(settings.database_url(), "sqlite:/elsewhere.db");
    }
}
