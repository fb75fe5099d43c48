use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::record::OrderRecord;

/// Ленивая, конечная и одноразовая последовательность записей.
/// Для повторного перечисления нужно снова вызвать `load_recent`.
pub type RecordStream<'a> = BoxStream<'a, Result<OrderRecord, StoreError>>;

/// Durable storage заказов. Единственная авторитетная копия данных.
///
/// Реализации: postgres (sqlx), memory (локальный запуск и тесты).
/// Внутренних retry нет, политика повторов у вызывающей стороны.
pub trait OrderStore: Send + Sync {
    /// Подготовка backend'а (таблицы, индексы).
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Insert-or-replace по идентификатору, одна атомарная запись.
    /// Повтор с тем же payload не меняет наблюдаемое состояние.
    /// `created_at` существующей записи сохраняется.
    fn upsert(
        &self,
        id: &str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Точечное чтение.
    fn get(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OrderRecord>, StoreError>> + Send + '_>>;

    /// Не более `limit` самых свежих записей, по `created_at` desc.
    fn load_recent(&self, limit: usize) -> RecordStream<'_>;
}
