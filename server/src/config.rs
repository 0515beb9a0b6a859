//! Server configuration: defaults, TOML file and environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServerConfigValidationError {
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// host:port the HTTP API binds to.
    pub address: String,
    /// HMAC key for verifying signed requests and signing responses.
    /// Unsigned requests always skip verification.
    pub hash_key: String,
    /// Upper bound on graceful shutdown; exceeding it is fatal.
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
    pub backup: BackupConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackupConfig {
    /// Snapshot file path.
    pub path: PathBuf,
    /// Zero disables the periodic backup task.
    #[serde(with = "duration_serde")]
    pub interval: Duration,
    /// Seed the repository from the last snapshot at startup.
    pub restore: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            hash_key: String::new(),
            shutdown_timeout: Duration::from_secs(3),
            backup: BackupConfig {
                path: PathBuf::from("./data/metrics-backup.json"),
                interval: Duration::from_secs(30),
                restore: true,
            },
        }
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = builder.add_source(Config::try_from(&Self::default())?);

        let config_paths = [
            PathBuf::from("server.toml"),
            PathBuf::from("config/server.toml"),
        ];
        let mut config_loaded = false;
        for path in &config_paths {
            if path.exists() {
                info!("Loading server configuration from: {:?}", path);
                if let Some(path_str) = path.to_str() {
                    builder =
                        builder.add_source(File::with_name(path_str.trim_end_matches(".toml")));
                    config_loaded = true;
                    break;
                }
            }
        }
        if !config_loaded {
            warn!("No server configuration file found, using defaults");
        }

        builder = builder.add_source(
            Environment::with_prefix("PULSE_SERVER")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: ServerConfig = builder.build()?.try_deserialize()?;
        if let Err(e) = cfg.validate() {
            return Err(ConfigError::Message(format!(
                "server configuration validation error: {e}"
            )));
        }
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ServerConfigValidationError> {
        if self.address.is_empty() {
            return Err(ServerConfigValidationError::InvalidValue(
                "address must not be empty".to_string(),
            ));
        }
        if self.backup.path.as_os_str().is_empty() {
            return Err(ServerConfigValidationError::InvalidValue(
                "backup path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
