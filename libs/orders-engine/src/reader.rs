use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;

use orders_api::{OrderRecord, OrderStore};

use crate::cache::MirrorCache;

/// Всё, что может увидеть читатель кроме валидного payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("order not found")]
    NotFound,

    #[error("storage unavailable")]
    Unavailable,
}

/// Read-фасад над кешем и storage.
///
/// Точечное чтение идёт в кеш; при промахе идёт в storage (warm-start
/// поднимает только N последних заказов), найденное кладётся в кеш
/// через `fill_if_absent`. Список всегда читается из storage.
pub struct OrderReader {
    cache: Arc<MirrorCache>,
    store: Arc<dyn OrderStore>,
    list_limit: usize,
}

impl OrderReader {
    pub fn new(cache: Arc<MirrorCache>, store: Arc<dyn OrderStore>, list_limit: usize) -> Self {
        Self {
            cache,
            store,
            list_limit: list_limit.max(1),
        }
    }

    pub async fn get_order(&self, id: &str) -> Result<Bytes, LookupError> {
        if id.is_empty() {
            return Err(LookupError::NotFound);
        }
        if let Some(payload) = self.cache.get(id) {
            return Ok(payload);
        }

        match self.store.get(id).await {
            Ok(Some(record)) => {
                self.cache.fill_if_absent(&record.id, record.payload.clone());
                // Если ingestion успел записать более новый payload, отдаём его.
                Ok(self.cache.get(id).unwrap_or(record.payload))
            }
            Ok(None) => Err(LookupError::NotFound),
            Err(e) => {
                tracing::warn!(order_uid = %id, error = %e, "fallback lookup failed");
                Err(LookupError::Unavailable)
            }
        }
    }

    /// До `limit` последних заказов (limit ограничен `1..=list_limit`).
    pub async fn list_recent_orders(&self, limit: usize) -> Result<Vec<OrderRecord>, LookupError> {
        let limit = limit.clamp(1, self.list_limit);
        self.store
            .load_recent(limit)
            .try_collect()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "list orders failed");
                LookupError::Unavailable
            })
    }

    pub fn list_limit(&self) -> usize {
        self.list_limit
    }

    pub fn cached_orders(&self) -> usize {
        self.cache.len()
    }
}
