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
use crate::types::{SchoolLevel, Year};

fn duplicate(level: SchoolLevel, year_number: i64) -> AppError {
    AppError::BadRequest(format!("Year {} already exists for {}", year_number, level))
}

pub async fn create_year(State(state): State<AppState>, ApiJson(payload): ApiJson<Value>) -> AppResult<Json<Year>> {
    state.metrics.inc_request(RequestKind::Create);
    observe(&state.metrics, create(&state, &payload).await).map(Json)
}

async fn create(state: &AppState, payload: &Value) -> AppResult<Year> {
    const FAILED: &str = "Unable to create a new year";
    let input = schema::validate_year(payload)?;

    let existing = store::years::find_by_level_number(&state.db, input.level, input.year_number)
        .await
        .map_err(AppError::persistence(FAILED))?;
    if existing.is_some() {
        return Err(duplicate(input.level, input.year_number));
    }

    let year = store::years::create(&state.db, &input).await.map_err(AppError::persistence(FAILED))?;
    tracing::info!(id = %year.id, level = %year.level, year_number = year.year_number, "Year created");
    Ok(year)
}

pub async fn update_year(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Value>,
) -> AppResult<Json<Year>> {
    state.metrics.inc_request(RequestKind::Update);
    observe(&state.metrics, update(&state, &id, &payload).await).map(Json)
}

async fn update(state: &AppState, id: &str, payload: &Value) -> AppResult<Year> {
    const FAILED: &str = "Unable to update year";
    let patch = schema::validate_year_update(payload)?;

    let current =
        store::years::get(&state.db, id).await.map_err(AppError::persistence(FAILED))?.ok_or_not_found("Year")?;

    // Moving a year onto another year's (level, number) slot is rejected like a duplicate create.
    if patch.level.is_some() || patch.year_number.is_some() {
        let level = patch.level.unwrap_or(current.level);
        let year_number = patch.year_number.unwrap_or(current.year_number);
        let clash = store::years::find_by_level_number(&state.db, level, year_number)
            .await
            .map_err(AppError::persistence(FAILED))?;
        if clash.is_some_and(|y| y.id != id) {
            return Err(duplicate(level, year_number));
        }
    }

    store::years::update(&state.db, id, &patch).await.map_err(AppError::persistence(FAILED))?.ok_or_not_found("Year")
}

/// Deletes the year with its classes, students, books and their distributions.
pub async fn delete_year(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.metrics.inc_request(RequestKind::Delete);
    let res = store::years::delete(&state.db, &id).await.map_err(AppError::persistence("Unable to delete year"));
    match observe(&state.metrics, res)? {
        true => {
            tracing::info!(%id, "Year deleted");
            Ok(Json(json!({ "message": "Year deleted successfully" })))
        }
        false => Err(AppError::NotFound("Year not found".to_string())),
    }
}
