//! Agent configuration: defaults, TOML file and environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AgentConfigValidationError {
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// How often collectors are dispatched.
    #[serde(with = "duration_serde")]
    pub collect_interval: Duration,
    /// How often buffered metrics are exported.
    #[serde(with = "duration_serde")]
    pub export_interval: Duration,
    /// Upper bound on graceful shutdown; exceeding it is fatal.
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
    /// HMAC key for signing exported metrics; empty means unsigned.
    pub hash_key: String,
    pub random: RandomCollectorConfig,
    pub exporter: HttpExporterConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RandomCollectorConfig {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpExporterConfig {
    /// host:port of the collector server.
    pub address: String,
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            collect_interval: Duration::from_secs(2),
            export_interval: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(3),
            hash_key: String::new(),
            random: RandomCollectorConfig { min: 0, max: 100 },
            exporter: HttpExporterConfig {
                address: "127.0.0.1:8080".to_string(),
                timeout: Duration::from_secs(5),
            },
        }
    }
}

impl AgentConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = builder.add_source(Config::try_from(&Self::default())?);

        let config_paths = [
            PathBuf::from("agent.toml"),
            PathBuf::from("config/agent.toml"),
        ];
        let mut config_loaded = false;
        for path in &config_paths {
            if path.exists() {
                info!("Loading agent configuration from: {:?}", path);
                if let Some(path_str) = path.to_str() {
                    builder =
                        builder.add_source(File::with_name(path_str.trim_end_matches(".toml")));
                    config_loaded = true;
                    break;
                }
            }
        }
        if !config_loaded {
            warn!("No agent configuration file found, using defaults");
        }

        builder = builder.add_source(
            Environment::with_prefix("PULSE_AGENT")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: AgentConfig = builder.build()?.try_deserialize()?;
        if let Err(e) = cfg.validate() {
            return Err(ConfigError::Message(format!(
                "agent configuration validation error: {e}"
            )));
        }
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AgentConfigValidationError> {
        if self.collect_interval.is_zero() {
            return Err(AgentConfigValidationError::InvalidValue(
                "collect_interval must be positive".to_string(),
            ));
        }
        if self.export_interval.is_zero() {
            return Err(AgentConfigValidationError::InvalidValue(
                "export_interval must be positive".to_string(),
            ));
        }
        if self.exporter.address.is_empty() {
            return Err(AgentConfigValidationError::InvalidValue(
                "exporter address must not be empty".to_string(),
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
