use serde::{Deserialize, Serialize};

/// Metric name to loosely typed value, as reported by the device.
pub type Metrics = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn from_bool(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Parses a command payload, ignoring case and surrounding whitespace.
    pub fn parse(payload: &str) -> Option<Self> {
        let trimmed = payload.trim();
        if trimmed.eq_ignore_ascii_case("on") {
            Some(Self::On)
        } else if trimmed.eq_ignore_ascii_case("off") {
            Some(Self::Off)
        } else {
            None
        }
    }
}

/// Commanded intent for the room device. This is a cache of what was last
/// asked for, not a record of what the device actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub relay_commanded: bool,
    pub led_state: bool,
    pub manual_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    #[serde(rename = "ledState")]
    pub led_state: bool,
    #[serde(rename = "manualMode")]
    pub manual_mode: bool,
}

impl From<DeviceState> for StateView {
    fn from(state: DeviceState) -> Self {
        Self {
            led_state: state.led_state,
            manual_mode: state.manual_mode,
        }
    }
}

/// An outbound command for the device, independent of topic naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Relay(Switch),
    ManualMode(Switch),
    Led(Switch),
}

impl SyncAction {
    pub fn switch(self) -> Switch {
        match self {
            Self::Relay(switch) | Self::ManualMode(switch) | Self::Led(switch) => switch,
        }
    }
}
