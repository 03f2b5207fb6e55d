use std::path::PathBuf;

use room_sync_common::{ConfigError, RecordFields, RuntimeConfig, Topics};

const MIN_KEEP_ALIVE_SECS: u64 = 5;

pub fn from_env() -> Result<RuntimeConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the controller configuration from a key lookup. Only `MQTT_HOST` is
/// mandatory; unparsable numbers fall back to their defaults.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<RuntimeConfig, ConfigError> {
    let mut config = RuntimeConfig::default();
    let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(host) = text("MQTT_HOST") {
        config.mqtt.host = host.trim().to_string();
    }
    if let Some(port) = text("MQTT_PORT").and_then(|value| value.trim().parse::<u16>().ok()) {
        config.mqtt.port = port;
    }
    if let Some(user) = text("MQTT_USER") {
        config.mqtt.user = user;
        config.mqtt.pass = lookup("MQTT_PASS").unwrap_or_default();
    }
    if let Some(secs) =
        text("MQTT_KEEP_ALIVE_SECS").and_then(|value| value.trim().parse::<u64>().ok())
    {
        config.mqtt.keep_alive_secs = secs;
    }
    config.mqtt.keep_alive_secs = config.mqtt.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS);

    if let Some(port) =
        text("CONTROLLER_HTTP_PORT").and_then(|value| value.trim().parse::<u16>().ok())
    {
        config.http.port = port;
    }
    config.http.web_root = Some(
        text("CONTROLLER_WEB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/web"))),
    );

    config.store.data_dir = text("SYNC_DATA_DIR").map(PathBuf::from);
    config.topics = Topics::default().with_overrides(&lookup);
    config.fields = RecordFields::default().with_overrides(&lookup);

    config.validate()?;
    Ok(config)
}
