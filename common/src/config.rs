use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topics::Topics;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing mandatory setting {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            user: String::new(),
            pass: String::new(),
            keep_alive_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    pub web_root: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            web_root: None,
        }
    }
}

/// Durable snapshot store settings. No data dir means the store is disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: Option<PathBuf>,
}

/// Names of the record fields read back during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub relay: String,
    pub manual_mode: String,
    pub led: String,
}

impl Default for RecordFields {
    fn default() -> Self {
        Self {
            relay: "Relay".to_string(),
            manual_mode: "ManualMode".to_string(),
            led: "LED2".to_string(),
        }
    }
}

impl RecordFields {
    /// Applies `FIELD_*` overrides from a key lookup such as the environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let overrides = [
            ("FIELD_RELAY", &mut self.relay),
            ("FIELD_MANUAL", &mut self.manual_mode),
            ("FIELD_LED", &mut self.led),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|value| !value.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub topics: Topics,
    #[serde(default)]
    pub fields: RecordFields,
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Missing("MQTT_HOST"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_requires_broker_host() {
        let config = RuntimeConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::Missing("MQTT_HOST")));
    }

    #[test]
    fn blank_host_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.mqtt.host = "   ".to_string();
        assert!(config.validate().is_err());

        config.mqtt.host = "broker.local".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn field_overrides_ignore_blank_values() {
        let fields = RecordFields::default().with_overrides(|key| match key {
            "FIELD_LED" => Some("led".to_string()),
            "FIELD_RELAY" => Some(String::new()),
            _ => None,
        });

        assert_eq!(fields.led, "led");
        assert_eq!(fields.relay, "Relay");
        assert_eq!(fields.manual_mode, "ManualMode");
    }
}
