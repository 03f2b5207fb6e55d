use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use chrono::Utc;
use tracing::{debug, info, warn};

use room_sync_common::{Metrics, PersistedRecord};

use crate::state::AppState;

/// Hands out snapshot timestamps that never go backwards, even when the wall
/// clock does.
#[derive(Clone, Default)]
pub struct SnapshotClock {
    high_water: Arc<AtomicI64>,
}

impl SnapshotClock {
    pub fn next(&self, now_secs: i64) -> i64 {
        self.high_water.fetch_max(now_secs, Ordering::SeqCst).max(now_secs)
    }
}

#[derive(Default)]
struct QueueState {
    records: VecDeque<PersistedRecord>,
    draining: bool,
}

/// Records waiting to be written, in arrival order. At most one drain job
/// runs at a time, so store writes happen in the order messages arrived.
#[derive(Clone, Default)]
pub struct SnapshotQueue {
    clock: SnapshotClock,
    state: Arc<Mutex<QueueState>>,
}

impl SnapshotQueue {
    /// Stamps and queues a record. Returns true when the caller must start a
    /// drain job because none is running.
    fn push(&self, delta: &Metrics) -> bool {
        let mut state = self.lock();
        let timestamp = self.clock.next(Utc::now().timestamp());
        state
            .records
            .push_back(PersistedRecord::from_delta(delta, timestamp));
        if state.draining {
            false
        } else {
            state.draining = true;
            true
        }
    }

    // Clears the draining flag under the same lock as the empty check so a
    // concurrent push cannot be stranded.
    fn pop(&self) -> Option<PersistedRecord> {
        let mut state = self.lock();
        let next = state.records.pop_front();
        if next.is_none() {
            state.draining = false;
        }
        next
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Best-effort write of one snapshot. Failures are logged and dropped;
/// the next telemetry message produces a fresh snapshot.
pub async fn persist_snapshot(state: &AppState, record: &PersistedRecord) {
    let Some(store) = state.store.as_ref() else {
        debug!("snapshot store disabled; skipping persistence");
        return;
    };

    match store.put(record).await {
        Ok(()) => info!(
            timestamp = record.timestamp,
            fields = record.fields.len(),
            "saved snapshot"
        ),
        Err(err) => warn!("failed to save snapshot: {err}"),
    }
}

/// Timestamps the delta now, in arrival order, and hands it to the single
/// background writer.
pub fn dispatch_persist(state: &AppState, delta: Metrics) {
    if state.store.is_none() {
        debug!("snapshot store disabled; skipping persistence");
        return;
    }
    if !state.snapshots.push(&delta) {
        return;
    }

    let job_state = state.clone();
    state.jobs.spawn("persist-snapshots", async move {
        while let Some(record) = job_state.snapshots.pop() {
            persist_snapshot(&job_state, &record).await;
        }
    });
}
