use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use orders_engine::LookupError;

use super::AppState;

fn lookup_failure(e: LookupError) -> Response {
    let status = match e {
        LookupError::NotFound => StatusCode::NOT_FOUND,
        LookupError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, axum::Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/orders/{id}
// ═══════════════════════════════════════════════════════════════

/// Payload отдаётся как есть, без повторной сериализации.
pub(crate) async fn handle_get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.reader.get_order(&id).await {
        Ok(payload) => ([(header::CONTENT_TYPE, "application/json")], payload).into_response(),
        Err(e) => lookup_failure(e),
    }
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/orders?limit=N
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct ListParams {
    limit: Option<usize>,
}

pub(crate) async fn handle_list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let limit = params.limit.unwrap_or(state.reader.list_limit());
    match state.reader.list_recent_orders(limit).await {
        Ok(records) => axum::Json(records).into_response(),
        Err(e) => lookup_failure(e),
    }
}

// ═══════════════════════════════════════════════════════════════
//  GET /healthz
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({ "cached_orders": state.reader.cached_orders() }))
}
