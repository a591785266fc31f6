//! Configuration for entity stores and logging

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings applied to every entity spawned with this config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Requests that may queue on one entity before callers wait to send.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Upper bound on a single request round trip. `None` waits forever.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_mailbox_capacity() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            request_timeout_ms: None,
        }
    }
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "store.mailbox_capacity must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "store.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `entity_agent=trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        // an empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_partial_document() {
        let config = Config::from_yaml_str("store:\n  request_timeout_ms: 250\n").unwrap();

        assert_eq!(config.store.mailbox_capacity, 64);
        assert_eq!(
            config.store.request_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Config::from_yaml_str("store:\n  mailbox_capacity: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            store: StoreConfig {
                mailbox_capacity: 8,
                request_timeout_ms: Some(1_000),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: true,
            },
        };

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("entity_agent.yaml");
        config.to_yaml(&path).unwrap();

        let loaded = Config::from_yaml(&path).unwrap();
        assert_eq!(config, loaded);
    }
}
