use bytes::Bytes;

use orders_engine::normalize;
use orders_transport_jetstream::JetStreamPublisher;

use super::config::PublishArgs;
use super::error::PublisherError;

/// Прочитать файл и убедиться, что сервер его примет.
/// Возвращает исходные байты и `order_uid`.
pub async fn load_order(path: &str) -> Result<(Bytes, String), PublisherError> {
    let raw = tokio::fs::read(path).await.map_err(|source| PublisherError::Read {
        path: path.to_string(),
        source,
    })?;
    let order = normalize(&raw).map_err(|source| PublisherError::Invalid {
        path: path.to_string(),
        source,
    })?;
    Ok((Bytes::from(raw), order.id))
}

pub async fn run(args: &PublishArgs) -> Result<(), PublisherError> {
    let (payload, order_uid) = load_order(&args.file).await?;

    let publisher = JetStreamPublisher::connect(&args.channel()).await?;
    let sequence = publisher.publish(payload).await?;

    tracing::info!(
        file = %args.file,
        subject = %args.subject,
        order_uid = %order_uid,
        sequence,
        "published order"
    );
    Ok(())
}
