use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};

/// Upper bound on queueing one outbound publish when the event loop is stalled.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outbound side of the device transport.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> anyhow::Result<()>;
}

pub struct MqttPublisher {
    client: AsyncClient,
    timeout: Duration,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self::with_timeout(client, PUBLISH_TIMEOUT)
    }

    pub fn with_timeout(client: AsyncClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl CommandPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> anyhow::Result<()> {
        let request = self
            .client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec());
        tokio::time::timeout(self.timeout, request)
            .await
            .with_context(|| {
                format!(
                    "publish on {topic} not queued within {}ms",
                    self.timeout.as_millis()
                )
            })?
            .with_context(|| format!("failed to queue publish on {topic}"))
    }
}
