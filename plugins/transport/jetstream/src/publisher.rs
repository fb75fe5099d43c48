use async_nats::jetstream;
use bytes::Bytes;

use orders_api::ChannelError;

use crate::config::JetStreamConfig;

/// Публикация в subject заказов с ожиданием подтверждения от stream.
pub struct JetStreamPublisher {
    context: jetstream::Context,
    subject: String,
}

impl JetStreamPublisher {
    pub async fn connect(config: &JetStreamConfig) -> Result<Self, ChannelError> {
        let context = crate::connect(config).await?;
        crate::ensure_stream(&context, config).await?;
        Ok(Self {
            context,
            subject: config.subject.clone(),
        })
    }

    /// Опубликовать сырые байты. Возвращает sequence сообщения в stream.
    pub async fn publish(&self, payload: Bytes) -> Result<u64, ChannelError> {
        let ack = self
            .context
            .publish(self.subject.clone(), payload)
            .await
            .map_err(|e| ChannelError::Publish(e.to_string()))?
            .await
            .map_err(|e| ChannelError::Publish(e.to_string()))?;
        Ok(ack.sequence)
    }
}
