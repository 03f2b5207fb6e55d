use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use room_sync_common::{PersistedRecord, RecordFields, Topics};

use crate::{
    publish::CommandPublisher,
    state::AppState,
    store::{SnapshotStore, StoreError},
};

#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("broker unreachable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<PersistedRecord>>,
    fail: AtomicBool,
    first_put_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn with_records(records: Vec<PersistedRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// The first `put` sleeps before storing, later ones return at once.
    pub fn with_slow_first_put(delay: Duration) -> Self {
        Self {
            first_put_delay: Mutex::new(Some(delay)),
            ..Self::default()
        }
    }

    pub fn latest(&self, state_id: u32) -> Option<PersistedRecord> {
        let records = self.records.lock().unwrap();
        records
            .iter()
            .filter(|record| record.state_id == state_id)
            .fold(None::<&PersistedRecord>, |latest, record| match latest {
                Some(current) if current.timestamp > record.timestamp => Some(current),
                _ => Some(record),
            })
            .cloned()
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store offline",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn put(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        self.check()?;
        let delay = self.first_put_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn query_latest(&self, state_id: u32) -> Result<Option<PersistedRecord>, StoreError> {
        self.check()?;
        Ok(self.latest(state_id))
    }
}

pub fn record(timestamp: i64, fields: serde_json::Value) -> PersistedRecord {
    let fields = fields.as_object().cloned().unwrap_or_default();
    PersistedRecord::from_delta(&fields, timestamp)
}

pub fn test_state(publisher: Arc<RecordingPublisher>, store: Option<Arc<MemoryStore>>) -> AppState {
    AppState::new(
        publisher,
        store.map(|store| store as Arc<dyn SnapshotStore>),
        Topics::default(),
        RecordFields::default(),
    )
}
