pub mod config;
pub mod record;
pub mod reconcile;
pub mod topics;
pub mod types;

pub use config::{ConfigError, HttpConfig, MqttConfig, RecordFields, RuntimeConfig, StoreConfig};
pub use record::{coerce_bool, merge_metrics, parse_metrics, PersistedRecord, STATE_ID};
pub use reconcile::replay_actions;
pub use topics::*;
pub use types::{DeviceState, Metrics, StateView, Switch, SyncAction};
