use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 2000,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy::new(cfg.max_attempts, std::time::Duration::from_millis(cfg.backoff_ms))
    }
}

/// Curl transport parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Bytes per second below which a transfer counts as stalled.
    pub low_speed_limit: u32,
    /// How long a transfer may stay stalled before it fails.
    pub low_speed_time_secs: u64,
    pub max_redirects: u32,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            max_redirects: 10,
            user_agent: None,
        }
    }
}

/// Global configuration loaded from `~/.config/idg/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdgConfig {
    /// Default number of segments (and concurrent connections) per download.
    pub connections: usize,
    /// Capacity of the progress event channel between workers and the aggregator.
    pub progress_buffer: usize,
    /// Default destination directory (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional transport settings; if missing, built-in defaults are used.
    #[serde(default)]
    pub transport: Option<TransportConfig>,
}

impl Default for IdgConfig {
    fn default() -> Self {
        Self {
            connections: 8,
            progress_buffer: 1024,
            download_dir: None,
            retry: None,
            transport: None,
        }
    }
}

impl IdgConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("idg")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<IdgConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = IdgConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: IdgConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_values() {
        let cfg = IdgConfig::default();
        assert_eq!(cfg.connections, 8);
        assert_eq!(cfg.progress_buffer, 1024);
        assert!(cfg.download_dir.is_none());
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = IdgConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: IdgConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.connections, cfg.connections);
        assert_eq!(parsed.progress_buffer, cfg.progress_buffer);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            connections = 16
            progress_buffer = 64
            download_dir = "/srv/downloads"
        "#;
        let cfg: IdgConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.connections, 16);
        assert_eq!(cfg.progress_buffer, 64);
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/srv/downloads")));
        assert!(cfg.retry.is_none());
        assert!(cfg.transport.is_none());
    }

    #[test]
    fn config_toml_retry_and_transport() {
        let toml = r#"
            connections = 4
            progress_buffer = 1024

            [retry]
            max_attempts = 3
            backoff_ms = 250

            [transport]
            connect_timeout_secs = 10
            low_speed_limit = 512
            low_speed_time_secs = 30
            max_redirects = 5
            user_agent = "custom/1.0"
        "#;
        let cfg: IdgConfig = toml::from_str(toml).unwrap();
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(250));
        let transport = cfg.transport.as_ref().unwrap();
        assert_eq!(transport.connect_timeout_secs, 10);
        assert_eq!(transport.max_redirects, 5);
        assert_eq!(transport.user_agent.as_deref(), Some("custom/1.0"));
    }
}
