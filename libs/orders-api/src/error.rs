/// Ошибка durable storage.
///
/// Для ingestion любая `StoreError` транзиентна: сообщение остаётся
/// неподтверждённым и приходит повторно после ack deadline канала.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Хранилище недоступно (сеть, пул соединений, таймаут).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Строка прочитана, но не декодируется в OrderRecord.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Неверная конфигурация backend'а. Постоянная, падаем на старте.
    #[error("store config: {0}")]
    Config(String),
}

/// Ошибка канала доставки (connect / subscribe / ack / publish).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("connect: {0}")]
    Connect(String),

    #[error("subscribe: {0}")]
    Subscribe(String),

    #[error("receive: {0}")]
    Receive(String),

    #[error("ack: {0}")]
    Ack(String),

    #[error("publish: {0}")]
    Publish(String),
}
