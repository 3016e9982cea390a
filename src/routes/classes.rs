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
use crate::types::{Class, ClassInput};

async fn ensure_year(state: &AppState, input: &ClassInput, failed: &'static str) -> AppResult<()> {
    match store::years::get(&state.db, &input.year_id).await.map_err(AppError::persistence(failed))? {
        Some(_) => Ok(()),
        None => Err(AppError::invalid_field("yearId", "Year does not exist")),
    }
}

pub async fn create_class(State(state): State<AppState>, ApiJson(payload): ApiJson<Value>) -> AppResult<Json<Class>> {
    state.metrics.inc_request(RequestKind::Create);
    observe(&state.metrics, create(&state, &payload).await).map(Json)
}

async fn create(state: &AppState, payload: &Value) -> AppResult<Class> {
    const FAILED: &str = "Unable to create a new class";
    let input = schema::validate_class(payload)?;
    ensure_year(state, &input, FAILED).await?;
    let class = store::classes::create(&state.db, &input).await.map_err(AppError::persistence(FAILED))?;
    tracing::info!(id = %class.id, year_id = %class.year_id, "Class created");
    Ok(class)
}

pub async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Value>,
) -> AppResult<Json<Class>> {
    state.metrics.inc_request(RequestKind::Update);
    observe(&state.metrics, update(&state, &id, &payload).await).map(Json)
}

async fn update(state: &AppState, id: &str, payload: &Value) -> AppResult<Class> {
    const FAILED: &str = "Unable to update class";
    let input = schema::validate_class(payload)?;
    ensure_year(state, &input, FAILED).await?;
    store::classes::update(&state.db, id, &input).await.map_err(AppError::persistence(FAILED))?.ok_or_not_found("Class")
}

/// Deletes the class with its students and their distributions.
pub async fn delete_class(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.metrics.inc_request(RequestKind::Delete);
    let res = store::classes::delete(&state.db, &id).await.map_err(AppError::persistence("Unable to delete class"));
    if !observe(&state.metrics, res)? {
        return Err(AppError::NotFound("Class not found".to_string()));
    }
    Ok(Json(json!({ "message": "Class deleted successfully" })))
}
