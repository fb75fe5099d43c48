use orders_api::StoreError;

/// Причина отказа в приёме сообщения. Обе причины постоянные:
/// повторная доставка того же сообщения ничего не исправит.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing identifier: {0}")]
    MissingIdentifier(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("warm-start: {0}")]
    WarmStart(#[source] StoreError),
}
