use std::sync::Arc;

use tokio::sync::RwLock;

use room_sync_common::{merge_metrics, DeviceState, Metrics};

/// Commanded relay/LED/manual-mode intent, shared between request handlers.
#[derive(Clone, Default)]
pub struct DeviceMirror {
    inner: Arc<RwLock<DeviceState>>,
}

impl DeviceMirror {
    pub async fn get(&self) -> DeviceState {
        *self.inner.read().await
    }

    /// Records a commanded relay state. Relay commands from the gateway are
    /// fire-and-forget and leave `relay_commanded` untouched, so only callers
    /// that want relay intent reported through `get` use this.
    #[allow(dead_code)]
    pub async fn set_relay(&self, on: bool) {
        self.inner.write().await.relay_commanded = on;
    }

    pub async fn set_led(&self, on: bool) {
        self.inner.write().await.led_state = on;
    }

    pub async fn set_manual_mode(&self, on: bool) {
        self.inner.write().await.manual_mode = on;
    }
}

/// Latest value of every metric seen since startup. Keys are never pruned.
#[derive(Clone, Default)]
pub struct MetricsBook {
    inner: Arc<RwLock<Metrics>>,
}

impl MetricsBook {
    /// Merges a whole delta under one write lock so readers never observe a
    /// half-applied message.
    pub async fn merge(&self, delta: &Metrics) -> usize {
        let mut metrics = self.inner.write().await;
        merge_metrics(&mut metrics, delta)
    }

    pub async fn snapshot(&self) -> Metrics {
        self.inner.read().await.clone()
    }
}
