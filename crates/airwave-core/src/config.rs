//! Airwave configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AirwaveError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AirwaveConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AirwaveConfig {
    /// Load config from the default path (~/.airwave/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AirwaveError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AirwaveError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.is_empty() {
            return Err(AirwaveError::Config("discord.bot_token is not set".into()));
        }
        if self.discord.radio_channel_id == 0 {
            return Err(AirwaveError::Config("discord.radio_channel_id is not set".into()));
        }
        if self.discord.admin_channel_id == 0 {
            return Err(AirwaveError::Config("discord.admin_channel_id is not set".into()));
        }
        if self.sweep.interval_secs == 0 {
            return Err(AirwaveError::Config("sweep.interval_secs must be > 0".into()));
        }
        match self.storage.backend.as_str() {
            "file" => {}
            "postgres" => {
                if self.storage.postgres.url.is_empty() {
                    return Err(AirwaveError::Config("storage.postgres.url is not set".into()));
                }
            }
            other => {
                return Err(AirwaveError::Config(format!(
                    "unknown storage backend {other:?} (expected \"file\" or \"postgres\")"
                )));
            }
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Airwave home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".airwave")
    }
}

/// Discord connection and channel routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token used for both the gateway and the REST API.
    #[serde(default)]
    pub bot_token: String,
    /// The public channel being relayed.
    #[serde(default)]
    pub radio_channel_id: u64,
    /// Operator-facing log channel; also the escalation target.
    #[serde(default)]
    pub admin_channel_id: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            radio_channel_id: 0,
            admin_channel_id: 0,
        }
    }
}

/// Schedule storage backend selection and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "file" or "postgres". Selected once at startup.
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub file: FileStorageConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
}

fn default_backend() -> String {
    "file".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            file: FileStorageConfig::default(),
            postgres: PostgresConfig::default(),
        }
    }
}

/// File-backed storage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageConfig {
    #[serde(default = "default_schedule_path")]
    pub path: String,
}

fn default_schedule_path() -> String {
    "~/.airwave/deletion_schedule.json".into()
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            path: default_schedule_path(),
        }
    }
}

/// Postgres storage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

/// Sweep loop and retention parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Hours a reposted message stays up before deletion.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// Seconds to wait for an in-flight sweep tick during shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}
fn default_retention_hours() -> u64 {
    24
}
fn default_drain_timeout_secs() -> u64 {
    10
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retention_hours: default_retention_hours(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AirwaveConfig::default();
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.sweep.interval_secs, 30);
        assert_eq!(config.sweep.retention_hours, 24);
        assert_eq!(config.storage.postgres.max_connections, 5);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [discord]
            bot_token = "token"
            radio_channel_id = 456
            admin_channel_id = 789

            [storage]
            backend = "postgres"

            [storage.postgres]
            url = "postgres://localhost/airwave"
        "#;

        let config: AirwaveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.discord.radio_channel_id, 456);
        assert_eq!(config.storage.backend, "postgres");
        assert_eq!(config.storage.postgres.url, "postgres://localhost/airwave");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let toml_str = "";
        let config: AirwaveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.sweep.drain_timeout_secs, 10);
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let mut config = AirwaveConfig::default();
        config.discord.radio_channel_id = 1;
        config.discord.admin_channel_id = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_backend() {
        let mut config = AirwaveConfig::default();
        config.discord.bot_token = "t".into();
        config.discord.radio_channel_id = 1;
        config.discord.admin_channel_id = 2;
        config.storage.backend = "redis".into();
        assert!(config.validate().is_err());
    }
}
