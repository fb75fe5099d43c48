use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::ChannelError;

/// Одно доставленное сообщение durable канала.
///
/// Handler обязан явно завершить доставку: `ack()`: сообщение обработано
/// (или отброшено навсегда), `defer()`: оставить неподтверждённым, канал
/// доставит его повторно после ack deadline. Автоматического ack нет.
pub trait Delivery: Send {
    /// Сырые байты сообщения (дешёвый clone).
    fn payload(&self) -> Bytes;

    /// Номер попытки доставки (1 = первая).
    fn attempt(&self) -> u64 {
        1
    }

    fn ack(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send>>;

    /// По умолчанию просто отпускает сообщение без подтверждения.
    fn defer(self: Box<Self>) {}
}

/// Подписка на канал, поток доставок.
pub trait DeliveryStream: Send {
    /// Следующая доставка. None = подписка закрыта.
    fn next(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Result<Box<dyn Delivery>, ChannelError>>> + Send + '_>>;
}
