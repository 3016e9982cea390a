//! Read-only views over [`crate::loaders`].
//!
//! Collections come back empty rather than failing; single lookups answer 404.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{AppError, AppResult, OptionExt};
use crate::loaders;
use crate::metrics::RequestKind;
use crate::state::AppState;
use crate::types::{
    Book, BookWithYear, ClassRoster, ClassWithYear, SchoolLevel, StudentWithClass, Year, YearOverview,
    YearWithClasses,
};

fn parse_level(raw: &str) -> AppResult<SchoolLevel> {
    raw.parse::<SchoolLevel>().map_err(AppError::BadRequest)
}

pub async fn levels_overview(State(state): State<AppState>) -> Json<BTreeMap<SchoolLevel, Vec<YearOverview>>> {
    state.metrics.inc_request(RequestKind::Read);
    Json(loaders::levels_overview(&state.db).await)
}

pub async fn classes_by_level(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> AppResult<Json<Vec<ClassRoster>>> {
    state.metrics.inc_request(RequestKind::Read);
    let level = parse_level(&level)?;
    Ok(Json(loaders::classes_by_level(&state.db, level).await))
}

pub async fn year_classes(
    State(state): State<AppState>,
    Path((level, year_number)): Path<(String, String)>,
) -> AppResult<Json<YearWithClasses>> {
    state.metrics.inc_request(RequestKind::Read);
    let level = parse_level(&level)?;
    let year_number = year_number
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("invalid year number: {}", year_number)))?;
    loaders::year_classes(&state.db, level, year_number).await.ok_or_not_found("Year").map(Json)
}

pub async fn list_years(State(state): State<AppState>) -> Json<Vec<Year>> {
    state.metrics.inc_request(RequestKind::Read);
    Json(loaders::years(&state.db).await)
}

pub async fn list_classes(State(state): State<AppState>) -> Json<Vec<ClassWithYear>> {
    state.metrics.inc_request(RequestKind::Read);
    Json(loaders::classes(&state.db).await)
}

pub async fn list_students(State(state): State<AppState>) -> Json<Vec<StudentWithClass>> {
    state.metrics.inc_request(RequestKind::Read);
    Json(loaders::students(&state.db).await)
}

pub async fn get_student(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<StudentWithClass>> {
    state.metrics.inc_request(RequestKind::Read);
    loaders::student_by_id(&state.db, &id).await.ok_or_not_found("Student").map(Json)
}

pub async fn list_books(State(state): State<AppState>) -> Json<Vec<BookWithYear>> {
    state.metrics.inc_request(RequestKind::Read);
    Json(loaders::books(&state.db).await)
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Book>> {
    state.metrics.inc_request(RequestKind::Read);
    loaders::book_by_id(&state.db, &id).await.ok_or_not_found("Book").map(Json)
}
