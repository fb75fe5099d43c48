use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use orders_api::{Delivery, OrderStore, StoreError};

use crate::cache::MirrorCache;
use crate::error::NormalizeError;
use crate::normalize::normalize;

// ═══════════════════════════════════════════════════════════════
//  Outcome
// ═══════════════════════════════════════════════════════════════

/// Терминальное состояние обработки одного сообщения.
///
/// `Received → Normalized → Persisted → Cached` сворачивается в `Cached`;
/// подтверждение выполняет `Ingestor::handle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Записано в storage и в кеш. Подлежит ack.
    Cached { id: String },
    /// Сообщение никогда не станет валидным. Подлежит ack без записи.
    Rejected(NormalizeError),
    /// Storage не принял запись. Ack не выполняется, канал доставит повторно.
    Deferred { id: String, error: StoreError },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub deferred: u64,
}

#[derive(Debug, Default)]
struct IngestStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    deferred: AtomicU64,
}

// ═══════════════════════════════════════════════════════════════
//  Ingestor
// ═══════════════════════════════════════════════════════════════

/// Write path: normalize → store.upsert → cache.set → ack.
///
/// Кеш обновляется строго после успешного upsert, поэтому в кеше
/// не бывает идентификатора, которого нет в storage. Повторная
/// доставка того же сообщения безопасна: upsert идемпотентен.
pub struct Ingestor {
    store: Arc<dyn OrderStore>,
    cache: Arc<MirrorCache>,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<MirrorCache>) -> Self {
        Self {
            store,
            cache,
            stats: IngestStats::default(),
        }
    }

    /// Провести payload через normalizer, storage и кеш. Канал не трогает.
    pub async fn process(&self, raw: &[u8]) -> Outcome {
        let order = match normalize(raw) {
            Ok(order) => order,
            Err(reason) => return Outcome::Rejected(reason),
        };

        if let Err(error) = self.store.upsert(&order.id, order.payload.clone()).await {
            return Outcome::Deferred { id: order.id, error };
        }

        self.cache.set(order.id.clone(), order.payload);
        Outcome::Cached { id: order.id }
    }

    /// Обработать доставку и завершить её: ack для `Cached`/`Rejected`,
    /// defer (без ack) для `Deferred`.
    pub async fn handle(&self, delivery: Box<dyn Delivery>) -> Outcome {
        let attempt = delivery.attempt();
        let raw = delivery.payload();
        let outcome = self.process(&raw).await;

        match &outcome {
            Outcome::Cached { id } => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                match delivery.ack().await {
                    Ok(()) => tracing::debug!(order_uid = %id, attempt, "saved order"),
                    Err(e) => {
                        tracing::warn!(order_uid = %id, error = %e, "ack failed, expecting redelivery")
                    }
                }
            }
            Outcome::Rejected(reason) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %reason, bytes = raw.len(), attempt, "skip message");
                if let Err(e) = delivery.ack().await {
                    tracing::warn!(error = %e, "ack of rejected message failed");
                }
            }
            Outcome::Deferred { id, error } => {
                self.stats.deferred.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    order_uid = %id,
                    error = %error,
                    attempt,
                    "persist error, leaving message unacknowledged"
                );
                delivery.defer();
            }
        }

        outcome
    }

    pub fn stats(&self) -> IngestSnapshot {
        IngestSnapshot {
            accepted: self.stats.accepted.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            deferred: self.stats.deferred.load(Ordering::Relaxed),
        }
    }
}
