use std::time::Instant;

use futures::TryStreamExt;
use serde::Deserialize;

use orders_api::{OrderRecord, OrderStore, StoreError};

use crate::cache::MirrorCache;
use crate::error::EngineError;

/// Поведение при неудачном warm-start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmStartPolicy {
    /// Залогировать ошибку и стартовать с пустым кешем
    /// (доступность важнее полноты кеша).
    #[default]
    Degraded,
    /// Отказаться стартовать.
    Required,
}

/// Восстановить кеш из storage до запуска subscriber'а.
///
/// Загружается не более `limit` самых свежих заказов. Записи сначала
/// собираются целиком и только потом отдаются кешу: при ошибке на
/// середине выборки кеш остаётся пустым.
pub async fn warm_start(
    store: &dyn OrderStore,
    cache: &MirrorCache,
    limit: usize,
    policy: WarmStartPolicy,
) -> Result<usize, EngineError> {
    let started = Instant::now();

    match collect_recent(store, limit).await {
        Ok(records) => {
            let loaded = cache.bulk_load(records);
            tracing::info!(
                loaded,
                limit,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "cache restored"
            );
            Ok(loaded)
        }
        Err(e) => match policy {
            WarmStartPolicy::Degraded => {
                tracing::warn!(error = %e, "warmup cache failed, starting with empty cache");
                Ok(0)
            }
            WarmStartPolicy::Required => Err(EngineError::WarmStart(e)),
        },
    }
}

async fn collect_recent(store: &dyn OrderStore, limit: usize) -> Result<Vec<OrderRecord>, StoreError> {
    store.load_recent(limit).try_collect().await
}
