use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::AppConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Minutes between background syncs, 0 disables them
    #[serde(default = "default_sync_interval_minutes")]
    pub sync_interval_minutes: u64,

    #[serde(default = "default_scrape_timeout_seconds")]
    pub scrape_timeout_seconds: u64,

    /// Screenings not refreshed for this long are hidden from the API
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,

    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Where to keep the JSON snapshot of the store; none keeps it in memory only
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Providers to scrape, in order
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_sync_interval_minutes() -> u64 {
    30
}

fn default_scrape_timeout_seconds() -> u64 {
    300
}

fn default_max_age_hours() -> u64 {
    47
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("web/static")
}

fn default_providers() -> Vec<String> {
    vec!["babylon".to_string(), "yorck".to_string()]
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            sync_interval_minutes: default_sync_interval_minutes(),
            scrape_timeout_seconds: default_scrape_timeout_seconds(),
            max_age_hours: default_max_age_hours(),
            static_dir: default_static_dir(),
            snapshot_path: None,
            providers: default_providers(),
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BackendConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(60 * 60))
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            sync_interval: Duration::from_secs(self.sync_interval_minutes.saturating_mul(60)),
            scrape_timeout: Duration::from_secs(self.scrape_timeout_seconds),
        }
    }
}

/// Load the configuration file. A missing file means defaults.
pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<BackendConfig> {
    let path = path.as_ref();
    let config = if path.exists() {
        BackendConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file {}: {}", path.display(), e))?
    } else {
        BackendConfig::default()
    };

    Ok(config)
}
