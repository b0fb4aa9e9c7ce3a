//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/fileshare/cli.toml`
//! - Windows: `%APPDATA%/fileshare/cli.toml`
//!
//! `FILESHARE_API_URL` overrides `server_url`; the `--server` flag
//! overrides both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fileshare_store_client::ClientConfig;
use fileshare_upload::TransferPolicy;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configured server URL.
pub const API_URL_ENV: &str = "FILESHARE_API_URL";

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the store API, including the `/api` prefix.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout for `fileshare lookup` requests.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout_secs: u64,

    #[serde(default = "default_single_shot_timeout")]
    pub single_shot_timeout_secs: u64,

    /// Additional attempts per chunk.
    #[serde(default = "default_chunk_retries")]
    pub chunk_retries: u32,

    /// Global passes over failed chunks.
    #[serde(default = "default_retry_passes")]
    pub retry_passes: u32,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_server_url() -> String {
    "http://localhost:5000/api".into()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_lookup_timeout() -> u64 {
    30
}

fn default_chunk_timeout() -> u64 {
    60
}

fn default_single_shot_timeout() -> u64 {
    300
}

fn default_chunk_retries() -> u32 {
    2
}

fn default_retry_passes() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            connect_timeout_secs: default_connect_timeout(),
            lookup_timeout_secs: default_lookup_timeout(),
            chunk_timeout_secs: default_chunk_timeout(),
            single_shot_timeout_secs: default_single_shot_timeout(),
            chunk_retries: default_chunk_retries(),
            retry_passes: default_retry_passes(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found,
    /// then applies the environment override.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        config.apply_env_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Loads from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Replaces `server_url` with a non-empty override.
    pub fn apply_env_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            lookup_timeout: Duration::from_secs(self.lookup_timeout_secs.max(1)),
        }
    }

    /// Upload policy with the configured knobs over the built-in defaults.
    pub fn policy(&self) -> TransferPolicy {
        TransferPolicy {
            chunk_retries: self.chunk_retries,
            retry_passes: self.retry_passes,
            chunk_timeout: Duration::from_secs(self.chunk_timeout_secs.max(1)),
            single_shot_timeout: Duration::from_secs(self.single_shot_timeout_secs.max(1)),
            ..TransferPolicy::default()
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("fileshare")
            .join("cli.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("fileshare").join("cli.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/fileshare/cli.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:5000/api");
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.lookup_timeout_secs, 30);
        assert_eq!(config.chunk_timeout_secs, 60);
        assert_eq!(config.single_shot_timeout_secs, 300);
        assert_eq!(config.chunk_retries, 2);
        assert_eq!(config.retry_passes, 2);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(r#"server_url = "https://share.example/api""#).unwrap();
        assert_eq!(config.server_url, "https://share.example/api");
        assert_eq!(config.chunk_retries, 2);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("cli.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, Config::default());

        let config = Config {
            chunk_retries: 5,
            log_level: "debug".into(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cli.toml");
        std::fs::write(&path, "chunk_retries = \"many\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn env_override() {
        let mut config = Config::default();
        config.apply_env_override(Some("  ".into()));
        assert_eq!(config.server_url, default_server_url());
        config.apply_env_override(Some("https://files.example/api".into()));
        assert_eq!(config.server_url, "https://files.example/api");
        config.apply_env_override(None);
        assert_eq!(config.server_url, "https://files.example/api");
    }

    #[test]
    fn policy_from_config() {
        let config = Config {
            chunk_timeout_secs: 30,
            chunk_retries: 4,
            retry_passes: 1,
            ..Config::default()
        };
        let policy = config.policy();
        assert_eq!(policy.chunk_timeout, Duration::from_secs(30));
        assert_eq!(policy.chunk_retries, 4);
        assert_eq!(policy.retry_passes, 1);
        assert_eq!(policy.client_error_retries, 1);
        assert_eq!(config.client_config().connect_timeout, Duration::from_secs(10));
        assert_eq!(config.client_config().lookup_timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("fileshare"));
    }
}
