use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use orders_api::DeliveryStream;

use crate::ingest::{IngestSnapshot, Ingestor};

/// Пауза после ошибки чтения из канала.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct SubscriberConfig {
    /// Максимум одновременно обрабатываемых доставок.
    pub max_inflight: usize,
    /// Сколько ждать in-flight обработчики после отмены.
    pub shutdown_grace: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            max_inflight: 64,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Subscriber task: deliveries → bounded handler pool
// ═══════════════════════════════════════════════════════════════

/// Запустить subscriber: читает доставки из канала и обрабатывает каждую
/// в отдельной задаче, не более `max_inflight` одновременно.
///
/// После отмены `token` новые доставки не читаются; запущенные обработчики
/// получают `shutdown_grace` на завершение upsert → cache → ack, остальные
/// прерываются (их сообщения останутся без ack и придут повторно).
pub fn spawn_subscriber(
    mut deliveries: Box<dyn DeliveryStream>,
    ingestor: Arc<Ingestor>,
    config: SubscriberConfig,
    token: CancellationToken,
) -> JoinHandle<IngestSnapshot> {
    tokio::spawn(async move {
        let limit = Arc::new(Semaphore::new(config.max_inflight.max(1)));
        let mut inflight: JoinSet<()> = JoinSet::new();
        tracing::info!(max_inflight = config.max_inflight, "subscriber started");

        loop {
            while let Some(res) = inflight.try_join_next() {
                log_join_error(res);
            }

            let permit = tokio::select! {
                permit = limit.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = token.cancelled() => break,
            };

            let next = tokio::select! {
                next = deliveries.next() => next,
                _ = token.cancelled() => break,
            };

            match next {
                Some(Ok(delivery)) => {
                    let ingestor = ingestor.clone();
                    inflight.spawn(async move {
                        let _permit = permit;
                        ingestor.handle(delivery).await;
                    });
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "receive error");
                    tokio::select! {
                        _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                        _ = token.cancelled() => break,
                    }
                }
                None => {
                    tracing::info!("subscription closed");
                    break;
                }
            }
        }

        drain(&mut inflight, config.shutdown_grace).await;

        let snapshot = ingestor.stats();
        tracing::info!(
            accepted = snapshot.accepted,
            rejected = snapshot.rejected,
            deferred = snapshot.deferred,
            "subscriber stopped"
        );
        snapshot
    })
}

/// Дождаться in-flight обработчиков, но не дольше `grace`.
async fn drain(inflight: &mut JoinSet<()>, grace: Duration) {
    if inflight.is_empty() {
        return;
    }
    tracing::info!(
        pending = inflight.len(),
        grace_ms = grace.as_millis() as u64,
        "waiting for in-flight deliveries"
    );

    let finished = tokio::time::timeout(grace, async {
        while let Some(res) = inflight.join_next().await {
            log_join_error(res);
        }
    })
    .await;

    if finished.is_err() {
        tracing::warn!(
            abandoned = inflight.len(),
            "grace period elapsed, aborting in-flight deliveries"
        );
        inflight.abort_all();
        while inflight.join_next().await.is_some() {}
    }
}

fn log_join_error(res: Result<(), JoinError>) {
    if let Err(e) = res {
        if e.is_panic() {
            tracing::error!(error = %e, "delivery handler panicked, message left unacknowledged");
        }
    }
}
