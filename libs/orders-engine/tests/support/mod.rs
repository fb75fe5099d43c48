#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{Semaphore, mpsc};

use orders_api::{
    ChannelError, Delivery, DeliveryStream, OrderRecord, OrderStore, RecordStream, StoreError,
};
use orders_storage_memory::MemoryOrderStore;

// ═══════════════════════════════════════════════════════════════
//  In-process channel
// ═══════════════════════════════════════════════════════════════

/// Как была завершена доставка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Acked(Bytes),
    Deferred(Bytes),
}

struct TestDelivery {
    payload: Bytes,
    attempt: u64,
    settled: mpsc::UnboundedSender<Settled>,
}

impl Delivery for TestDelivery {
    fn payload(&self) -> Bytes {
        self.payload.clone()
    }

    fn attempt(&self) -> u64 {
        self.attempt
    }

    fn ack(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send>> {
        let _ = self.settled.send(Settled::Acked(self.payload.clone()));
        Box::pin(async { Ok(()) })
    }

    fn defer(self: Box<Self>) {
        let _ = self.settled.send(Settled::Deferred(self.payload.clone()));
    }
}

type Item = Result<Box<dyn Delivery>, ChannelError>;

pub struct TestChannel {
    rx: mpsc::UnboundedReceiver<Item>,
}

impl DeliveryStream for TestChannel {
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<Item>> + Send + '_>> {
        Box::pin(self.rx.recv())
    }
}

/// Сторона отправителя. Drop закрывает подписку.
pub struct TestPublisher {
    tx: mpsc::UnboundedSender<Item>,
    settled: mpsc::UnboundedSender<Settled>,
}

impl TestPublisher {
    pub fn publish(&self, payload: impl Into<Bytes>) {
        self.redeliver(payload, 1);
    }

    pub fn redeliver(&self, payload: impl Into<Bytes>, attempt: u64) {
        let delivery = TestDelivery {
            payload: payload.into(),
            attempt,
            settled: self.settled.clone(),
        };
        self.tx.send(Ok(Box::new(delivery))).unwrap();
    }

    pub fn fail_receive(&self) {
        self.tx
            .send(Err(ChannelError::Receive("connection reset".into())))
            .unwrap();
    }
}

pub struct Settlements {
    rx: mpsc::UnboundedReceiver<Settled>,
}

impl Settlements {
    pub async fn next(&mut self) -> Settled {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("no settlement within 5s")
            .expect("settlement channel closed")
    }

    pub fn try_next(&mut self) -> Option<Settled> {
        self.rx.try_recv().ok()
    }
}

pub fn channel() -> (TestPublisher, Box<dyn DeliveryStream>, Settlements) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (settled_tx, settled_rx) = mpsc::unbounded_channel();
    (
        TestPublisher { tx, settled: settled_tx },
        Box::new(TestChannel { rx }),
        Settlements { rx: settled_rx },
    )
}

// ═══════════════════════════════════════════════════════════════
//  Stores
// ═══════════════════════════════════════════════════════════════

/// Memory store, которому можно "отключить базу".
///
/// При `fail` upsert и get возвращают `Unavailable`, а `load_recent`
/// успевает отдать одну запись и только потом падает.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryOrderStore,
    fail: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail.load(Ordering::SeqCst)
    }
}

fn outage() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}

impl OrderStore for FlakyStore {
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        self.inner.init()
    }

    fn upsert(
        &self,
        id: &str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        if self.failing() {
            return Box::pin(async { Err(outage()) });
        }
        self.inner.upsert(id, payload)
    }

    fn get(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OrderRecord>, StoreError>> + Send + '_>> {
        if self.failing() {
            return Box::pin(async { Err(outage()) });
        }
        self.inner.get(id)
    }

    fn load_recent(&self, limit: usize) -> RecordStream<'_> {
        if self.failing() {
            return self
                .inner
                .load_recent(limit)
                .take(1)
                .chain(futures::stream::once(async { Err::<OrderRecord, _>(outage()) }))
                .boxed();
        }
        self.inner.load_recent(limit)
    }
}

/// Memory store, где каждый upsert ждёт разрешения от теста.
/// Считает одновременно выполняющиеся upsert'ы.
pub struct GatedStore {
    pub inner: MemoryOrderStore,
    pub gate: Semaphore,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryOrderStore::new(),
            gate: Semaphore::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl OrderStore for GatedStore {
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        self.inner.init()
    }

    fn upsert(
        &self,
        id: &str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let id = id.to_owned();
        Box::pin(async move {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let permit = self.gate.acquire().await.map_err(|_| outage());
            self.active.fetch_sub(1, Ordering::SeqCst);
            permit?.forget();
            self.inner.upsert(&id, payload).await
        })
    }

    fn get(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OrderRecord>, StoreError>> + Send + '_>> {
        self.inner.get(id)
    }

    fn load_recent(&self, limit: usize) -> RecordStream<'_> {
        self.inner.load_recent(limit)
    }
}
