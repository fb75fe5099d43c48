use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use futures::StreamExt;
use tokio::sync::RwLock;

use orders_api::{OrderRecord, OrderStore, RecordStream, StoreError};

// ═══════════════════════════════════════════════════════════════
//  MemoryOrderStore
// ═══════════════════════════════════════════════════════════════

struct Row {
    payload: Bytes,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<String, Row>,
    last_created: Option<DateTime<Utc>>,
}

impl Inner {
    /// Строго монотонный timestamp вставки (шаг 1µs, как у timestamptz).
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_created = Some(ts);
        ts
    }
}

/// Storage в памяти процесса. Для локального запуска без Postgres
/// и для тестов; данные живут до остановки процесса.
///
/// Контракт тот же, что у postgres: upsert сохраняет `created_at`
/// первой вставки, `load_recent` отдаёт от новых к старым.
#[derive(Default)]
pub struct MemoryOrderStore {
    inner: RwLock<Inner>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl OrderStore for MemoryOrderStore {
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn upsert(
        &self,
        id: &str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let id = id.to_owned();
        Box::pin(async move {
            let mut guard = self.inner.write().await;
            let inner = &mut *guard;

            if let Some(row) = inner.rows.get_mut(&id) {
                row.payload = payload;
                return Ok(());
            }
            let created_at = inner.next_created_at();
            inner.rows.insert(id, Row { payload, created_at });
            Ok(())
        })
    }

    fn get(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OrderRecord>, StoreError>> + Send + '_>> {
        let id = id.to_owned();
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner
                .rows
                .get(&id)
                .map(|row| OrderRecord::new(id.clone(), row.payload.clone(), row.created_at)))
        })
    }

    fn load_recent(&self, limit: usize) -> RecordStream<'_> {
        futures::stream::once(async move {
            let inner = self.inner.read().await;
            let mut records: Vec<OrderRecord> = inner
                .rows
                .iter()
                .map(|(id, row)| OrderRecord::new(id.clone(), row.payload.clone(), row.created_at))
                .collect();
            records.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });
            records.truncate(limit);
            futures::stream::iter(records.into_iter().map(Ok::<_, StoreError>))
        })
        .flatten()
        .boxed()
    }
}
