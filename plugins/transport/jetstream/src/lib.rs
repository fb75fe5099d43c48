mod config;
mod consumer;
mod publisher;

pub use config::JetStreamConfig;
pub use consumer::{JetStreamChannel, JetStreamDelivery};
pub use publisher::JetStreamPublisher;

use async_nats::jetstream;
use orders_api::ChannelError;

async fn connect(config: &JetStreamConfig) -> Result<jetstream::Context, ChannelError> {
    let client = async_nats::connect(config.url.as_str())
        .await
        .map_err(|e| ChannelError::Connect(format!("{}: {e}", config.url)))?;
    tracing::info!(url = %config.url, "connected to nats");
    Ok(jetstream::new(client))
}

/// Найти stream или создать его с одним subject.
async fn ensure_stream(
    context: &jetstream::Context,
    config: &JetStreamConfig,
) -> Result<jetstream::stream::Stream, ChannelError> {
    context
        .get_or_create_stream(jetstream::stream::Config {
            name: config.stream.clone(),
            subjects: vec![config.subject.clone()],
            ..Default::default()
        })
        .await
        .map_err(|e| ChannelError::Subscribe(format!("stream '{}': {e}", config.stream)))
}
