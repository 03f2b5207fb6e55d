use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Metrics;

/// Identity of the single managed device in the durable store.
pub const STATE_ID: u32 = 1;

const STATE_ID_FIELD: &str = "state_id";
const TIMESTAMP_FIELD: &str = "timestamps";

/// One durable snapshot: the metric fields received in a single telemetry
/// message, keyed by the fixed state id and ordered by `timestamps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub state_id: u32,
    #[serde(rename = "timestamps")]
    pub timestamp: i64,
    #[serde(flatten)]
    pub fields: Metrics,
}

impl PersistedRecord {
    /// Builds a record from a telemetry delta. The identity and ordering
    /// attributes always win over same-named metric fields.
    pub fn from_delta(delta: &Metrics, timestamp: i64) -> Self {
        let mut fields = delta.clone();
        fields.remove(STATE_ID_FIELD);
        fields.remove(TIMESTAMP_FIELD);
        Self {
            state_id: STATE_ID,
            timestamp,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Reads a loosely typed stored flag: `true` and `"true"` are on, anything
/// else (missing, other strings, numbers) is off.
pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text == "true",
        _ => false,
    }
}

pub fn parse_metrics(payload: &[u8]) -> Result<Metrics, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Last-write-wins merge. Returns how many keys were inserted or changed.
pub fn merge_metrics(target: &mut Metrics, delta: &Metrics) -> usize {
    let mut changed = 0;
    for (key, value) in delta {
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed += 1;
        }
    }
    changed
}
