use std::future::Future;
use std::pin::Pin;

use async_nats::jetstream;
use async_nats::jetstream::consumer::{AckPolicy, Consumer, pull};
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;

use orders_api::{ChannelError, Delivery, DeliveryStream};

use crate::config::JetStreamConfig;

type Item = Result<Box<dyn Delivery>, ChannelError>;

// ═══════════════════════════════════════════════════════════════
//  Delivery
// ═══════════════════════════════════════════════════════════════

/// Сообщение JetStream с явным ack.
///
/// `defer()` ничего не отправляет: сервер доставит сообщение повторно
/// после `ack_wait`.
pub struct JetStreamDelivery {
    message: jetstream::Message,
}

impl Delivery for JetStreamDelivery {
    fn payload(&self) -> Bytes {
        self.message.payload.clone()
    }

    fn attempt(&self) -> u64 {
        self.message
            .info()
            .ok()
            .and_then(|info| u64::try_from(info.delivered).ok())
            .unwrap_or(1)
    }

    fn ack(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send>> {
        Box::pin(async move {
            self.message
                .ack()
                .await
                .map_err(|e| ChannelError::Ack(e.to_string()))
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Channel
// ═══════════════════════════════════════════════════════════════

/// Durable pull consumer на subject заказов.
pub struct JetStreamChannel {
    consumer: Consumer<pull::Config>,
    durable: String,
}

impl JetStreamChannel {
    /// Подключиться, убедиться что stream существует, и создать
    /// (или переиспользовать) durable consumer с явным ack.
    pub async fn connect(config: &JetStreamConfig) -> Result<Self, ChannelError> {
        let context = crate::connect(config).await?;
        let stream = crate::ensure_stream(&context, config).await?;

        let consumer = stream
            .get_or_create_consumer(
                &config.durable,
                pull::Config {
                    durable_name: Some(config.durable.clone()),
                    filter_subject: config.subject.clone(),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: config.ack_wait(),
                    max_ack_pending: i64::try_from(config.max_inflight).unwrap_or(i64::MAX),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ChannelError::Subscribe(format!("consumer '{}': {e}", config.durable)))?;

        tracing::info!(
            stream = %config.stream,
            subject = %config.subject,
            durable = %config.durable,
            ack_wait_secs = config.ack_wait().as_secs(),
            "durable consumer ready"
        );
        Ok(Self {
            consumer,
            durable: config.durable.clone(),
        })
    }

    /// Начать чтение. Сообщения без ack от предыдущих запусков
    /// придут повторно.
    pub async fn subscribe(&self) -> Result<Box<dyn DeliveryStream>, ChannelError> {
        let messages = self
            .consumer
            .messages()
            .await
            .map_err(|e| ChannelError::Subscribe(format!("consumer '{}': {e}", self.durable)))?
            .map(|item| {
                item.map(|message| Box::new(JetStreamDelivery { message }) as Box<dyn Delivery>)
                    .map_err(|e| ChannelError::Receive(e.to_string()))
            })
            .boxed();

        Ok(Box::new(Subscription { messages }))
    }
}

struct Subscription {
    messages: BoxStream<'static, Item>,
}

impl DeliveryStream for Subscription {
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<Item>> + Send + '_>> {
        Box::pin(self.messages.next())
    }
}
