use tracing::{info, warn};

use room_sync_common::parse_metrics;

use crate::{persist::dispatch_persist, state::AppState};

/// Merges one telemetry message into the metrics book and queues its
/// persistence. A payload that is not a JSON object is logged and dropped
/// without touching any state. Returns whether the message was accepted.
pub async fn ingest_metrics(state: &AppState, payload: &[u8]) -> bool {
    let delta = match parse_metrics(payload) {
        Ok(delta) => delta,
        Err(err) => {
            warn!("failed to parse metrics: {err}");
            return false;
        }
    };

    let changed = state.metrics.merge(&delta).await;
    info!(keys = delta.len(), changed, "received metrics");

    dispatch_persist(state, delta);
    true
}
