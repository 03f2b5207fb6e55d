use serde::{Deserialize, Serialize};

use crate::types::SyncAction;

pub const TOPIC_RELAY_SET: &str = "myhome/room/relay/set";
pub const TOPIC_LED_SET: &str = "myhome/room/led/set";
pub const TOPIC_LED_MANUAL: &str = "myhome/room/led/manual";
pub const TOPIC_METRICS: &str = "myhome/room/metrics";
pub const TOPIC_FETCH: &str = "myhome/room/fetch";

/// Topic names used on the broker. Every field can be overridden at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    pub relay: String,
    pub led: String,
    pub manual: String,
    pub metrics: String,
    pub fetch: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            relay: TOPIC_RELAY_SET.to_string(),
            led: TOPIC_LED_SET.to_string(),
            manual: TOPIC_LED_MANUAL.to_string(),
            metrics: TOPIC_METRICS.to_string(),
            fetch: TOPIC_FETCH.to_string(),
        }
    }
}

impl Topics {
    /// Applies `TOPIC_*` overrides from a key lookup such as the environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let overrides = [
            ("TOPIC_RELAY", &mut self.relay),
            ("TOPIC_LED", &mut self.led),
            ("TOPIC_MANUAL", &mut self.manual),
            ("TOPIC_METRICS", &mut self.metrics),
            ("TOPIC_FETCH", &mut self.fetch),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|value| !value.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }
        self
    }

    pub fn for_action(&self, action: SyncAction) -> &str {
        match action {
            SyncAction::Relay(_) => &self.relay,
            SyncAction::Led(_) => &self.led,
            SyncAction::ManualMode(_) => &self.manual,
        }
    }
}
