//! JetStream round-trip tests
//!
//! These tests require a running NATS server with JetStream enabled.
//! Run with: cargo test -p orders-transport-jetstream -- --ignored

use std::time::Duration;

use bytes::Bytes;

use orders_transport_jetstream::{JetStreamChannel, JetStreamConfig, JetStreamPublisher};

fn config(suffix: &str) -> JetStreamConfig {
    JetStreamConfig {
        url: std::env::var("NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".into()),
        stream: format!("ORDERS_IT_{suffix}"),
        subject: format!("orders.it.{}", suffix.to_lowercase()),
        durable: format!("orders-it-{}", suffix.to_lowercase()),
        ack_wait_secs: 1,
        max_inflight: 8,
    }
}

#[tokio::test]
#[ignore = "Requires NATS server with JetStream"]
async fn published_message_is_delivered_and_acked() {
    let cfg = config("ACK");
    let publisher = JetStreamPublisher::connect(&cfg).await.unwrap();
    let channel = JetStreamChannel::connect(&cfg).await.unwrap();
    let mut deliveries = channel.subscribe().await.unwrap();

    let payload = Bytes::from_static(br#"{"order_uid":"it-ack"}"#);
    publisher.publish(payload.clone()).await.unwrap();

    let delivery = tokio::time::timeout(Duration::from_secs(5), deliveries.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(delivery.payload(), payload);
    assert_eq!(delivery.attempt(), 1);
    delivery.ack().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires NATS server with JetStream"]
async fn deferred_message_is_redelivered() {
    let cfg = config("REDELIVER");
    let publisher = JetStreamPublisher::connect(&cfg).await.unwrap();
    let channel = JetStreamChannel::connect(&cfg).await.unwrap();
    let mut deliveries = channel.subscribe().await.unwrap();

    let payload = Bytes::from_static(br#"{"order_uid":"it-redeliver"}"#);
    publisher.publish(payload.clone()).await.unwrap();

    let first = deliveries.next().await.unwrap().unwrap();
    first.defer();

    let second = tokio::time::timeout(Duration::from_secs(5), deliveries.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(second.payload(), payload);
    assert!(second.attempt() >= 2);
    second.ack().await.unwrap();
}
