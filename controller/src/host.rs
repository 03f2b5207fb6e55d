use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Utc;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use room_sync_common::RuntimeConfig;

use crate::{
    config,
    http,
    ingest::ingest_metrics,
    publish::MqttPublisher,
    reconcile::dispatch_replay,
    state::AppState,
    store::{FileSnapshotStore, SnapshotStore},
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 4096;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = config::from_env().context("invalid controller configuration")?;

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options(&config), 64);

    let store: Option<Arc<dyn SnapshotStore>> = match &config.store.data_dir {
        Some(dir) => {
            let store = FileSnapshotStore::new(dir);
            info!("snapshot store at {}", store.path().display());
            Some(Arc::new(store))
        }
        None => {
            warn!("SYNC_DATA_DIR not set; snapshot persistence and device sync disabled");
            None
        }
    };

    let app_state = AppState::new(
        Arc::new(MqttPublisher::new(mqtt.clone())),
        store,
        config.topics.clone(),
        config.fields.clone(),
    );

    spawn_mqtt_loop(app_state.clone(), mqtt, eventloop);

    let app = http::router(app_state.clone(), config.http.web_root.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("waiting for in-flight background jobs");
    app_state.jobs.wait_idle().await;
    Ok(())
}

fn mqtt_options(config: &RuntimeConfig) -> MqttOptions {
    let client_id = format!("room-sync-controller-{}", Utc::now().timestamp());
    let mut options = MqttOptions::new(client_id, config.mqtt.host.clone(), config.mqtt.port);
    options.set_keep_alive(Duration::from_secs(config.mqtt.keep_alive_secs));
    if !config.mqtt.user.is_empty() {
        options.set_credentials(config.mqtt.user.clone(), config.mqtt.pass.clone());
    }
    options
}

fn spawn_mqtt_loop(app_state: AppState, mqtt: AsyncClient, mut eventloop: EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    handle_mqtt_message(&app_state, &message.topic, &message.payload).await;
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    spawn_subscribe(&app_state, mqtt.clone());
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

// Runs outside the poll loop: the subscribe request is only flushed by poll().
fn spawn_subscribe(app_state: &AppState, mqtt: AsyncClient) {
    let topics = [
        app_state.topics.metrics.clone(),
        app_state.topics.fetch.clone(),
    ];
    tokio::spawn(async move {
        for topic in topics {
            match mqtt.subscribe(topic.as_str(), QoS::AtMostOnce).await {
                Ok(()) => info!("subscribed to {topic}"),
                Err(err) => warn!("mqtt subscribe to {topic} failed: {err}"),
            }
        }
    });
}

async fn handle_mqtt_message(app_state: &AppState, topic: &str, payload: &[u8]) {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return;
    }

    if topic == app_state.topics.metrics {
        ingest_metrics(app_state, payload).await;
    } else if topic == app_state.topics.fetch {
        info!("received fetch event from device, syncing state");
        dispatch_replay(app_state);
    } else {
        debug!("ignoring message on unexpected topic {topic}");
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::{record, test_state, MemoryStore, RecordingPublisher};
    use room_sync_common::{TOPIC_FETCH, TOPIC_LED_MANUAL, TOPIC_LED_SET, TOPIC_METRICS, TOPIC_RELAY_SET};

    #[tokio::test]
    async fn metrics_topic_feeds_ingest_and_persistence() {
        let store = Arc::new(MemoryStore::default());
        let state = test_state(Arc::new(RecordingPublisher::default()), Some(store.clone()));

        handle_mqtt_message(&state, TOPIC_METRICS, br#"{"temp": 22}"#).await;
        state.jobs.wait_idle().await;

        assert_eq!(state.metrics.snapshot().await.get("temp"), Some(&json!(22)));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn fetch_topic_replays_latest_snapshot() {
        let publisher = Arc::new(RecordingPublisher::default());
        let store = MemoryStore::with_records(vec![record(
            7,
            json!({ "Relay": false, "ManualMode": "true", "LED2": "true" }),
        )]);
        let state = test_state(publisher.clone(), Some(Arc::new(store)));

        handle_mqtt_message(&state, TOPIC_FETCH, b"").await;
        state.jobs.wait_idle().await;

        let payloads: Vec<String> = publisher
            .sent()
            .into_iter()
            .map(|(_, payload)| payload)
            .collect();
        assert_eq!(payloads, vec!["OFF", "ON", "ON"]);
    }

    #[tokio::test]
    async fn ingested_state_replays_through_one_store() {
        let publisher = Arc::new(RecordingPublisher::default());
        let store = Arc::new(MemoryStore::default());
        let state = test_state(publisher.clone(), Some(store.clone()));

        handle_mqtt_message(
            &state,
            TOPIC_METRICS,
            br#"{"Relay": true, "ManualMode": true, "LED2": false}"#,
        )
        .await;
        state.jobs.wait_idle().await;
        handle_mqtt_message(&state, TOPIC_FETCH, b"").await;
        state.jobs.wait_idle().await;

        let expected: Vec<(String, String)> = [
            (TOPIC_RELAY_SET, "ON"),
            (TOPIC_LED_MANUAL, "ON"),
            (TOPIC_LED_SET, "OFF"),
        ]
        .into_iter()
        .map(|(topic, payload)| (topic.to_string(), payload.to_string()))
        .collect();
        assert_eq!(publisher.sent(), expected);
    }

    #[tokio::test]
    async fn oversized_and_unknown_messages_are_ignored() {
        let store = Arc::new(MemoryStore::default());
        let state = test_state(Arc::new(RecordingPublisher::default()), Some(store.clone()));

        let mut oversized = br#"{"blob": ""#.to_vec();
        oversized.extend(std::iter::repeat(b'x').take(MAX_MQTT_PAYLOAD_BYTES));
        oversized.extend_from_slice(br#""}"#);
        handle_mqtt_message(&state, TOPIC_METRICS, &oversized).await;
        handle_mqtt_message(&state, "myhome/other", br#"{"temp": 1}"#).await;
        state.jobs.wait_idle().await;

        assert!(state.metrics.snapshot().await.is_empty());
        assert!(store.records().is_empty());
    }
}
