use axum::{extract::State, http::HeaderMap, Json};
use serde_json::Value;

use super::{observe, ApiJson};
use crate::distribution;
use crate::error::{AppError, AppResult};
use crate::metrics::RequestKind;
use crate::middleware::ip::MaybeRemoteAddr;
use crate::schema;
use crate::state::AppState;
use crate::types::BookDistribution;

/// `POST /api/books/distribution`: validates the batch of `{studentId, bookId, status}`
/// triples and upserts all of them in one transaction.
pub async fn distribute(
    State(state): State<AppState>,
    remote: MaybeRemoteAddr,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<Value>,
) -> AppResult<Json<Vec<BookDistribution>>> {
    state.metrics.inc_request(RequestKind::Update);
    let client = remote.client_ip(&headers);

    let rows = observe(&state.metrics, store_batch(&state, &payload).await)?;

    state.metrics.record_distribution(rows.len());
    tracing::info!(%client, rows = rows.len(), "Distribution batch stored");
    Ok(Json(rows))
}

async fn store_batch(state: &AppState, payload: &Value) -> AppResult<Vec<BookDistribution>> {
    let batch = schema::validate_distributions(payload, state.config.distribution.max_batch_size)?;
    distribution::reconcile(&state.db, &batch).await.map_err(AppError::persistence("Unable to distribute the book/s"))
}
