use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use super::{observe, ApiJson};
use crate::error::{AppError, AppResult, OptionExt};
use crate::metrics::RequestKind;
use crate::schema;
use crate::state::AppState;
use crate::store;
use crate::types::{Book, BookInput};

async fn ensure_year(state: &AppState, input: &BookInput, failed: &'static str) -> AppResult<()> {
    match store::years::get(&state.db, &input.year_id).await.map_err(AppError::persistence(failed))? {
        Some(_) => Ok(()),
        None => Err(AppError::invalid_field("yearId", "Year does not exist")),
    }
}

pub async fn create_book(State(state): State<AppState>, ApiJson(payload): ApiJson<Value>) -> AppResult<Json<Book>> {
    state.metrics.inc_request(RequestKind::Create);
    observe(&state.metrics, create(&state, &payload).await).map(Json)
}

async fn create(state: &AppState, payload: &Value) -> AppResult<Book> {
    const FAILED: &str = "Unable to create a new book";
    let input = schema::validate_book(payload)?;
    ensure_year(state, &input, FAILED).await?;
    let book = store::books::create(&state.db, &input).await.map_err(AppError::persistence(FAILED))?;
    tracing::info!(id = %book.id, title = %book.title, "Book created");
    Ok(book)
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Value>,
) -> AppResult<Json<Book>> {
    state.metrics.inc_request(RequestKind::Update);
    observe(&state.metrics, update(&state, &id, &payload).await).map(Json)
}

async fn update(state: &AppState, id: &str, payload: &Value) -> AppResult<Book> {
    const FAILED: &str = "Unable to update book";
    let input = schema::validate_book(payload)?;
    ensure_year(state, &input, FAILED).await?;
    store::books::update(&state.db, id, &input).await.map_err(AppError::persistence(FAILED))?.ok_or_not_found("Book")
}

/// Deletes the book and every distribution row that references it.
pub async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.metrics.inc_request(RequestKind::Delete);
    let res = store::books::delete(&state.db, &id).await.map_err(AppError::persistence("Unable to delete book"));
    if !observe(&state.metrics, res)? {
        return Err(AppError::NotFound("Book not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
