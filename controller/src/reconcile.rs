use tracing::{info, warn};

use room_sync_common::{replay_actions, STATE_ID};

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    StoreDisabled,
    NoRecord,
    StoreFailed,
    Replayed {
        timestamp: i64,
        published: usize,
        failed: usize,
    },
}

/// Re-sends relay, manual mode and (under manual mode) LED commands from the
/// latest stored snapshot. The mirror is left untouched: the device answers
/// with fresh telemetry once it has applied the commands.
pub async fn replay_latest(state: &AppState) -> ReplayOutcome {
    let Some(store) = state.store.as_ref() else {
        info!("snapshot store disabled; nothing to sync");
        return ReplayOutcome::StoreDisabled;
    };

    info!("syncing state from snapshot store to device");
    let record = match store.query_latest(STATE_ID).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            info!("no state found in snapshot store");
            return ReplayOutcome::NoRecord;
        }
        Err(err) => {
            warn!("failed to fetch latest snapshot: {err}");
            return ReplayOutcome::StoreFailed;
        }
    };

    let actions = replay_actions(&record, &state.fields);
    let mut failed = 0;
    for action in &actions {
        if state.publish_action(*action).await.is_err() {
            failed += 1;
        }
    }

    info!(
        timestamp = record.timestamp,
        commands = actions.len(),
        failed,
        "device sync finished"
    );
    ReplayOutcome::Replayed {
        timestamp: record.timestamp,
        published: actions.len() - failed,
        failed,
    }
}

pub fn dispatch_replay(state: &AppState) {
    let job_state = state.clone();
    state.jobs.spawn("replay-latest", async move {
        replay_latest(&job_state).await;
    });
}
