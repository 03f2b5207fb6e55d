use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{io::AsyncWriteExt, sync::Mutex};
use tracing::warn;

use room_sync_common::PersistedRecord;

const SNAPSHOT_FILE: &str = "snapshots.jsonl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable home for snapshots, keyed by `(state_id, timestamps)`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put(&self, record: &PersistedRecord) -> Result<(), StoreError>;

    /// The record with the greatest timestamp for `state_id`, if any.
    async fn query_latest(&self, state_id: u32) -> Result<Option<PersistedRecord>, StoreError>;
}

/// Append-only JSON-lines file. On equal timestamps the later line wins, which
/// gives `put` upsert semantics without rewriting the file.
pub struct FileSnapshotStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSnapshotStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn put(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn query_latest(&self, state_id: u32) -> Result<Option<PersistedRecord>, StoreError> {
        let raw = {
            let _guard = self.lock.lock().await;
            match tokio::fs::read(&self.path).await {
                Ok(raw) => raw,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        };

        let mut latest: Option<PersistedRecord> = None;
        for (index, line) in raw.split(|byte| *byte == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record = match serde_json::from_slice::<PersistedRecord>(line) {
                Ok(record) => record,
                Err(err) => {
                    warn!(line = index + 1, "skipping malformed snapshot line: {err}");
                    continue;
                }
            };
            if record.state_id != state_id {
                continue;
            }
            let newer = match &latest {
                Some(current) => record.timestamp >= current.timestamp,
                None => true,
            };
            if newer {
                latest = Some(record);
            }
        }

        Ok(latest)
    }
}
