use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use orders_api::OrderRecord;

// ═══════════════════════════════════════════════════════════════
//  MirrorCache
// ═══════════════════════════════════════════════════════════════

/// In-memory зеркало durable storage: `order_uid → payload`.
///
/// Не является источником истины. Запись попадает сюда только после
/// успешной записи в storage (или успешного чтения из него), поэтому
/// любое значение в кеше совпадает со storage или новее его.
///
/// Шардированная map: чтения не блокируют друг друга, запись атомарна
/// в пределах одного ключа. Payload хранится как неизменяемый `Bytes`, читатель
/// получает либо старое, либо новое значение целиком.
#[derive(Debug, Default)]
pub struct MirrorCache {
    entries: DashMap<String, Bytes>,
}

impl MirrorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Bytes> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Заменить запись (last-write-wins по ключу).
    pub fn set(&self, id: impl Into<String>, payload: Bytes) {
        self.entries.insert(id.into(), payload);
    }

    /// Вставить только если ключа ещё нет. Используется read-through
    /// путём: значение, прочитанное из storage, не должно перетирать
    /// более свежий `set` от ingestion.
    pub fn fill_if_absent(&self, id: &str, payload: Bytes) -> bool {
        match self.entries.entry(id.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(payload);
                true
            }
        }
    }

    /// Warm-start: заполнить кеш записями из storage.
    ///
    /// Записи приходят от новых к старым; при повторе ключа остаётся
    /// первая (самая свежая). Возвращает число вставленных ключей.
    pub fn bulk_load<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = OrderRecord>,
    {
        let mut loaded = 0;
        for record in records {
            if self.fill_if_absent(&record.id, record.payload) {
                loaded += 1;
            }
        }
        loaded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;

    fn record(id: &str, payload: &'static str) -> OrderRecord {
        OrderRecord::new(id, Bytes::from_static(payload.as_bytes()), Utc::now())
    }

    #[test]
    fn set_replaces_previous_payload() {
        let cache = MirrorCache::new();
        assert_eq!(cache.get("X"), None);

        cache.set("X", Bytes::from_static(b"P1"));
        cache.set("X", Bytes::from_static(b"P2"));

        assert_eq!(cache.get("X"), Some(Bytes::from_static(b"P2")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn fill_if_absent_never_overwrites() {
        let cache = MirrorCache::new();
        cache.set("X", Bytes::from_static(b"new"));

        assert!(!cache.fill_if_absent("X", Bytes::from_static(b"old")));
        assert_eq!(cache.get("X"), Some(Bytes::from_static(b"new")));

        assert!(cache.fill_if_absent("Y", Bytes::from_static(b"y")));
        assert_eq!(cache.get("Y"), Some(Bytes::from_static(b"y")));
    }

    #[test]
    fn bulk_load_keeps_newest_duplicate() {
        let cache = MirrorCache::new();
        let loaded = cache.bulk_load(vec![
            record("a", "a-newest"),
            record("b", "b"),
            record("a", "a-older"),
        ]);

        assert_eq!(loaded, 2);
        assert_eq!(cache.get("a"), Some(Bytes::from_static(b"a-newest")));
        assert_eq!(cache.get("b"), Some(Bytes::from_static(b"b")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_and_readers() {
        let cache = Arc::new(MirrorCache::new());
        let mut handles = Vec::new();

        for writer in 0..8u32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..500u32 {
                    let id = format!("order-{}", i % 50);
                    cache.set(id, Bytes::from(format!("w{writer}-{i}")));
                }
            }));
        }
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..500u32 {
                    if let Some(payload) = cache.get(&format!("order-{}", i % 50)) {
                        assert!(payload.starts_with(b"w"));
                    }
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(cache.len(), 50);
    }
}
