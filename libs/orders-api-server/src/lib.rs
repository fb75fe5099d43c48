mod http;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio_util::sync::CancellationToken;

use orders_engine::OrderReader;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bind api :{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("axum serve: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Clone)]
struct AppState {
    reader: Arc<OrderReader>,
}

/// Маршруты read API поверх `OrderReader`.
pub fn router(reader: Arc<OrderReader>) -> Router {
    Router::new()
        .route("/api/orders", get(http::handle_list_orders))
        .route("/api/orders/{id}", get(http::handle_get_order))
        .route("/healthz", get(http::handle_health))
        .with_state(AppState { reader })
}

/// HTTP read API. Завершается после отмены `shutdown`, дождавшись
/// активных запросов.
pub async fn run(
    port: u16,
    reader: Arc<OrderReader>,
    shutdown: CancellationToken,
) -> Result<(), ApiError> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| ApiError::Bind { port, source })?;
    tracing::info!(port, "orders api listening");

    axum::serve(listener, router(reader))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ApiError::Serve)?;

    tracing::info!("orders api stopped");
    Ok(())
}
