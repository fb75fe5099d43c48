use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{ServeArgs, ServerConfig, StorageConfig};
use crate::error::ServerError;
use orders_api::OrderStore;
use orders_engine::{
    Ingestor, MirrorCache, OrderReader, SubscriberConfig, WarmStartPolicy, spawn_subscriber,
    warm_start,
};
use orders_storage_memory::MemoryOrderStore;
use orders_storage_postgres::PgOrderStore;
use orders_transport_jetstream::JetStreamChannel;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("orders-server starting");

    // --- Load config ---
    let config = ServerConfig::resolve(&args)?;
    tracing::info!(
        config = args.config.as_deref().unwrap_or("<defaults>"),
        api_port = config.api_port,
        warm_start = ?config.warm_start,
        "loaded config"
    );

    // --- Storage ---
    let store = open_store(&config.storage)?;
    if let Err(e) = store.init().await {
        match config.warm_start {
            WarmStartPolicy::Degraded => {
                tracing::warn!(error = %e, "storage not ready, continuing");
            }
            WarmStartPolicy::Required => return Err(e.into()),
        }
    }

    // --- Warm start ---
    let cache = Arc::new(MirrorCache::new());
    warm_start(store.as_ref(), &cache, config.warm_start_limit, config.warm_start).await?;

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    // --- Channel + subscriber ---
    let channel = JetStreamChannel::connect(&config.channel).await?;
    let deliveries = channel.subscribe().await?;
    let ingestor = Arc::new(Ingestor::new(store.clone(), cache.clone()));
    let subscriber = spawn_subscriber(
        deliveries,
        ingestor,
        SubscriberConfig {
            max_inflight: config.channel.max_inflight,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        },
        token.clone(),
    );

    // --- API server ---
    let reader = Arc::new(OrderReader::new(cache, store, config.list_limit));
    let mut api_handle = tokio::spawn(orders_api_server::run(
        config.api_port,
        reader,
        token.clone(),
    ));
    tracing::info!("server ready");

    // --- Ожидание сигнала (или падения API) ---
    let api_exited = tokio::select! {
        signal = shutdown_signal() => {
            signal?;
            tracing::info!("shutting down...");
            None
        }
        res = &mut api_handle => Some(res),
    };

    // Subscriber сам дожидается in-flight обработчиков (shutdown_grace).
    token.cancel();
    if let Err(e) = subscriber.await {
        tracing::error!(error = %e, "subscriber task failed");
    }

    let api_result = match api_exited {
        Some(res) => res,
        None => api_handle.await,
    };
    match api_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(e) => tracing::error!(error = %e, "api task failed"),
    }

    tracing::info!("shutdown complete");
    Ok(())
}

fn open_store(config: &StorageConfig) -> Result<Arc<dyn OrderStore>, ServerError> {
    match config {
        StorageConfig::Postgres(pg) => {
            let store = PgOrderStore::connect_lazy(pg)?;
            tracing::info!(
                table = %pg.table,
                max_connections = pg.max_connections,
                "storage: postgres"
            );
            Ok(Arc::new(store))
        }
        StorageConfig::Memory => {
            tracing::warn!("storage: memory, orders are lost on restart");
            Ok(Arc::new(MemoryOrderStore::new()))
        }
    }
}

/// Ctrl+C или SIGTERM.
async fn shutdown_signal() -> Result<(), ServerError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(())
    }
}
