use room_sync_common::{Metrics, StateView, Switch, SyncAction};

use crate::state::AppState;

/// Relay commands are fire-and-forget; nothing local records them.
pub async fn command_relay(state: &AppState, switch: Switch) -> anyhow::Result<()> {
    state.publish_action(SyncAction::Relay(switch)).await
}

/// The mirror is updated before publishing, so it reflects the request even
/// when the publish fails.
pub async fn command_led(state: &AppState, switch: Switch) -> anyhow::Result<()> {
    state.mirror.set_led(switch.is_on()).await;
    state.publish_action(SyncAction::Led(switch)).await
}

pub async fn command_manual_mode(state: &AppState, switch: Switch) -> anyhow::Result<()> {
    state.mirror.set_manual_mode(switch.is_on()).await;
    state.publish_action(SyncAction::ManualMode(switch)).await
}

pub async fn current_state(state: &AppState) -> StateView {
    state.mirror.get().await.into()
}

pub async fn current_metrics(state: &AppState) -> Metrics {
    state.metrics.snapshot().await
}
