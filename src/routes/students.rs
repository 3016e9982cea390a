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
use crate::types::{Student, StudentInput};

async fn ensure_class(state: &AppState, input: &StudentInput, failed: &'static str) -> AppResult<()> {
    match store::classes::get(&state.db, &input.class_id).await.map_err(AppError::persistence(failed))? {
        Some(_) => Ok(()),
        None => Err(AppError::invalid_field("classId", "Class does not exist")),
    }
}

/// A reused enrollment number surfaces as 409 through the UNIQUE constraint.
pub async fn create_student(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> AppResult<Json<Student>> {
    state.metrics.inc_request(RequestKind::Create);
    observe(&state.metrics, create(&state, &payload).await).map(Json)
}

async fn create(state: &AppState, payload: &Value) -> AppResult<Student> {
    const FAILED: &str = "Unable to create a new student";
    let input = schema::validate_student(payload)?;
    ensure_class(state, &input, FAILED).await?;
    let student = store::students::create(&state.db, &input).await.map_err(AppError::persistence(FAILED))?;
    tracing::info!(id = %student.id, class_id = %student.class_id, "Student enrolled");
    Ok(student)
}

pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Value>,
) -> AppResult<Json<Student>> {
    state.metrics.inc_request(RequestKind::Update);
    observe(&state.metrics, update(&state, &id, &payload).await).map(Json)
}

async fn update(state: &AppState, id: &str, payload: &Value) -> AppResult<Student> {
    const FAILED: &str = "Unable to update student";
    let input = schema::validate_student(payload)?;
    ensure_class(state, &input, FAILED).await?;
    store::students::update(&state.db, id, &input)
        .await
        .map_err(AppError::persistence(FAILED))?
        .ok_or_not_found("Student")
}

pub async fn delete_student(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.metrics.inc_request(RequestKind::Delete);
    let res = store::students::delete(&state.db, &id).await.map_err(AppError::persistence("Unable to delete student"));
    if !observe(&state.metrics, res)? {
        return Err(AppError::NotFound("Student not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
