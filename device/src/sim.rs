use serde_json::json;

use room_sync_common::{DeviceState, Metrics, RecordFields, Switch};

/// Light level (0-100) below which the LED switches on by itself.
const DARK_THRESHOLD: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Relay,
    Led,
    ManualMode,
}

/// Simulated room device: a relay, an LED with automatic light-driven control,
/// and a manual override that hands the LED to remote commands.
#[derive(Debug, Clone)]
pub struct DeviceSim {
    state: DeviceState,
    fields: RecordFields,
    temp_c: f64,
    humidity: f64,
    light: u8,
}

impl DeviceSim {
    pub fn new(fields: RecordFields) -> Self {
        Self {
            state: DeviceState::default(),
            fields,
            temp_c: 21.0,
            humidity: 40.0,
            light: 100,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Applies a command payload. Returns whether the device state changed.
    /// LED commands are ignored unless manual mode is on.
    pub fn apply_command(&mut self, kind: CommandKind, payload: &str) -> bool {
        let Some(switch) = Switch::parse(payload) else {
            return false;
        };
        let on = switch.is_on();
        let before = self.state;

        match kind {
            CommandKind::Relay => self.state.relay_commanded = on,
            CommandKind::ManualMode => {
                self.state.manual_mode = on;
                if !on {
                    self.drive_led();
                }
            }
            CommandKind::Led if self.state.manual_mode => self.state.led_state = on,
            CommandKind::Led => {}
        }

        self.state != before
    }

    /// Advances the simulated readings by one sample.
    pub fn tick(&mut self, tick: u64) {
        self.temp_c = 21.0 + (tick % 8) as f64 * 0.25;
        self.humidity = 40.0 + (tick % 6) as f64 * 0.5;
        self.light = ((tick * 37) % 101) as u8;
        self.drive_led();
    }

    pub fn metrics(&self) -> Metrics {
        let mut metrics = Metrics::new();
        metrics.insert("temp".to_string(), json!(self.temp_c));
        metrics.insert("humidity".to_string(), json!(self.humidity));
        metrics.insert("light".to_string(), json!(self.light));
        metrics.insert(self.fields.relay.clone(), json!(self.state.relay_commanded));
        metrics.insert(self.fields.led.clone(), json!(self.state.led_state));
        metrics.insert(self.fields.manual_mode.clone(), json!(self.state.manual_mode));
        metrics
    }

    fn drive_led(&mut self) {
        if !self.state.manual_mode {
            self.state.led_state = self.light < DARK_THRESHOLD;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_commands_need_manual_mode() {
        let mut sim = DeviceSim::new(RecordFields::default());

        assert!(!sim.apply_command(CommandKind::Led, "ON"));
        assert!(!sim.state().led_state);

        assert!(sim.apply_command(CommandKind::ManualMode, "ON"));
        assert!(sim.apply_command(CommandKind::Led, "on"));
        assert!(sim.state().led_state);
    }

    #[test]
    fn leaving_manual_mode_returns_led_to_light_control() {
        let mut sim = DeviceSim::new(RecordFields::default());
        sim.apply_command(CommandKind::ManualMode, "ON");
        sim.apply_command(CommandKind::Led, "ON");

        // Full daylight: automatic control turns the LED back off.
        sim.apply_command(CommandKind::ManualMode, "OFF");
        assert!(!sim.state().led_state);
    }

    #[test]
    fn tick_drives_led_from_light_level() {
        let mut sim = DeviceSim::new(RecordFields::default());

        sim.tick(0);
        assert!(sim.state().led_state);

        sim.tick(1);
        assert_eq!(sim.metrics().get("light"), Some(&json!(37)));
        assert!(!sim.state().led_state);
    }

    #[test]
    fn garbage_payload_is_ignored() {
        let mut sim = DeviceSim::new(RecordFields::default());
        assert!(!sim.apply_command(CommandKind::Relay, "maybe"));
        assert!(sim.apply_command(CommandKind::Relay, "ON"));
        assert!(sim.state().relay_commanded);
    }

    #[test]
    fn metrics_use_record_field_names() {
        let mut sim = DeviceSim::new(RecordFields::default());
        sim.apply_command(CommandKind::Relay, "ON");
        let metrics = sim.metrics();

        assert_eq!(metrics.get("Relay"), Some(&json!(true)));
        assert_eq!(metrics.get("LED2"), Some(&json!(false)));
        assert_eq!(metrics.get("ManualMode"), Some(&json!(false)));
        assert_eq!(metrics.get("temp"), Some(&json!(21.0)));
    }
}
