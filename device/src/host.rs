use std::{sync::Arc, time::Duration};

use anyhow::Context;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use room_sync_common::{RecordFields, Topics};

use crate::sim::{CommandKind, DeviceSim};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let env = |key: &str| std::env::var(key).ok();
    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(1883);
    let interval_secs = std::env::var("DEVICE_PUBLISH_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(30);

    let topics = Arc::new(Topics::default().with_overrides(env));
    let sim = Arc::new(Mutex::new(DeviceSim::new(
        RecordFields::default().with_overrides(env),
    )));

    let mut mqtt_options = MqttOptions::new("room-sync-device", mqtt_host, mqtt_port);
    if let Some((user, pass)) = credentials(env) {
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    {
        let mqtt = mqtt.clone();
        let topics = topics.clone();
        let sim = sim.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::Publish(message))) => {
                        let Some(kind) = command_kind(&topics, &message.topic) else {
                            continue;
                        };
                        let payload = String::from_utf8_lossy(&message.payload).into_owned();
                        let changed = sim.lock().await.apply_command(kind, &payload);
                        debug!(?kind, %payload, changed, "device command");
                        if changed {
                            spawn_report(mqtt.clone(), topics.clone(), sim.clone());
                        }
                    }
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("device mqtt connected");
                        spawn_announce(mqtt.clone(), topics.clone());
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!("device mqtt poll error: {err}");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    info!("device simulator started");

    let mut tick: u64 = 0;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;
        tick = tick.saturating_add(1);

        let payload = {
            let mut sim = sim.lock().await;
            sim.tick(tick);
            serde_json::to_vec(&sim.metrics()).context("failed to encode device metrics")?
        };

        mqtt.publish(topics.metrics.as_str(), QoS::AtMostOnce, false, payload)
            .await
            .context("failed to publish device metrics")?;
    }
}

/// Broker credentials, only when a non-blank `MQTT_USER` is set.
fn credentials(lookup: impl Fn(&str) -> Option<String>) -> Option<(String, String)> {
    let user = lookup("MQTT_USER").filter(|user| !user.trim().is_empty())?;
    Some((user, lookup("MQTT_PASS").unwrap_or_default()))
}

fn command_kind(topics: &Topics, topic: &str) -> Option<CommandKind> {
    if topic == topics.relay {
        Some(CommandKind::Relay)
    } else if topic == topics.led {
        Some(CommandKind::Led)
    } else if topic == topics.manual {
        Some(CommandKind::ManualMode)
    } else {
        None
    }
}

// Subscribes to the command topics and asks the controller to replay the
// last stored state, as the device does after every boot or reconnect.
fn spawn_announce(mqtt: AsyncClient, topics: Arc<Topics>) {
    tokio::spawn(async move {
        for topic in [&topics.relay, &topics.led, &topics.manual] {
            if let Err(err) = mqtt.subscribe(topic.as_str(), QoS::AtMostOnce).await {
                warn!("device subscribe to {topic} failed: {err}");
            }
        }
        if let Err(err) = mqtt
            .publish(topics.fetch.as_str(), QoS::AtMostOnce, false, Vec::new())
            .await
        {
            warn!("device fetch request failed: {err}");
        }
    });
}

fn spawn_report(mqtt: AsyncClient, topics: Arc<Topics>, sim: Arc<Mutex<DeviceSim>>) {
    tokio::spawn(async move {
        let metrics = sim.lock().await.metrics();
        match serde_json::to_vec(&metrics) {
            Ok(body) => {
                if let Err(err) = mqtt
                    .publish(topics.metrics.as_str(), QoS::AtMostOnce, false, body)
                    .await
                {
                    warn!("device metrics publish failed: {err}");
                }
            }
            Err(err) => warn!("device metrics serialization failed: {err}"),
        }
    });
}
