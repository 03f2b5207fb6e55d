use crate::{
    config::RecordFields,
    record::{coerce_bool, PersistedRecord},
    types::{Switch, SyncAction},
};

/// Derives the commands that bring the device back to a stored snapshot.
///
/// The relay and manual mode are always sent, relay first. The LED is only
/// sent when manual mode is on, right after it: with manual mode off the
/// device drives the LED itself.
pub fn replay_actions(record: &PersistedRecord, fields: &RecordFields) -> Vec<SyncAction> {
    let relay_on = coerce_bool(record.field(&fields.relay));
    let manual_on = coerce_bool(record.field(&fields.manual_mode));

    let mut actions = vec![
        SyncAction::Relay(Switch::from_bool(relay_on)),
        SyncAction::ManualMode(Switch::from_bool(manual_on)),
    ];

    if manual_on {
        let led_on = coerce_bool(record.field(&fields.led));
        actions.push(SyncAction::Led(Switch::from_bool(led_on)));
    }

    actions
}
