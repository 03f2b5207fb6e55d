use std::sync::Arc;

use tracing::{info, warn};

use room_sync_common::{RecordFields, SyncAction, Topics};

use crate::{
    jobs::JobRunner,
    mirror::{DeviceMirror, MetricsBook},
    persist::SnapshotQueue,
    publish::CommandPublisher,
    store::SnapshotStore,
};

/// Process-wide context handed to every handler and background job. The mirror
/// and the metrics book are locked independently; nothing holds both.
#[derive(Clone)]
pub struct AppState {
    pub mirror: DeviceMirror,
    pub metrics: MetricsBook,
    pub publisher: Arc<dyn CommandPublisher>,
    pub store: Option<Arc<dyn SnapshotStore>>,
    pub snapshots: SnapshotQueue,
    pub jobs: JobRunner,
    pub topics: Arc<Topics>,
    pub fields: Arc<RecordFields>,
}

impl AppState {
    pub fn new(
        publisher: Arc<dyn CommandPublisher>,
        store: Option<Arc<dyn SnapshotStore>>,
        topics: Topics,
        fields: RecordFields,
    ) -> Self {
        Self {
            mirror: DeviceMirror::default(),
            metrics: MetricsBook::default(),
            publisher,
            store,
            snapshots: SnapshotQueue::default(),
            jobs: JobRunner::default(),
            topics: Arc::new(topics),
            fields: Arc::new(fields),
        }
    }

    pub async fn publish_action(&self, action: SyncAction) -> anyhow::Result<()> {
        let topic = self.topics.for_action(action);
        let payload = action.switch().as_str();
        match self.publisher.publish(topic, payload).await {
            Ok(()) => {
                info!("published '{payload}' to topic '{topic}'");
                Ok(())
            }
            Err(err) => {
                warn!("publish failed on {topic}: {err:#}");
                Err(err)
            }
        }
    }
}
