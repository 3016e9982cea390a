//! HTTP handlers and the router that mounts them.
//!
//! - `years`, `classes`, `students`, `books`: CRUD, each validated by [`crate::schema`]
//! - `distribution`: the batch endpoint in front of the reconciler
//! - `catalog`: read-only views backed by [`crate::loaders`]
//! - `health`: liveness, readiness, metrics and version

use axum::extract::{DefaultBodyLimit, FromRequest};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware;
use crate::state::AppState;

pub mod books;
pub mod catalog;
pub mod classes;
pub mod distribution;
pub mod health;
pub mod students;
pub mod years;

/// `Json` whose rejection uses the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Counts validation and persistence failures on their way out.
pub(crate) fn observe<T>(metrics: &Metrics, res: AppResult<T>) -> AppResult<T> {
    match &res {
        Err(AppError::Validation(_)) => metrics.inc_validation_failures(),
        Err(AppError::Persistence { .. }) => metrics.inc_persistence_failures(),
        _ => {}
    }
    res
}

/// The full application router with every middleware except transport concerns
/// (compression, CORS), which the binary adds.
pub fn router(state: AppState) -> Router {
    let cfg = state.config.clone();

    let api = Router::new()
        .route("/books/distribution", post(distribution::distribute))
        .route("/years", post(years::create_year).get(catalog::list_years))
        .route("/years/{id}", patch(years::update_year).delete(years::delete_year))
        .route("/classes", post(classes::create_class).get(catalog::list_classes))
        .route("/classes/{id}", patch(classes::update_class).delete(classes::delete_class))
        .route("/students", post(students::create_student).get(catalog::list_students))
        .route(
            "/students/{id}",
            get(catalog::get_student).patch(students::update_student).delete(students::delete_student),
        )
        .route("/books", post(books::create_book).get(catalog::list_books))
        .route("/books/{id}", get(catalog::get_book).patch(books::update_book).delete(books::delete_book))
        .route("/levels", get(catalog::levels_overview))
        .route("/levels/{level}/classes", get(catalog::classes_by_level))
        .route("/levels/{level}/years/{year_number}", get(catalog::year_classes));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(cfg.server.max_body_bytes))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn_with_state(cfg.clone(), middleware::validation::validate_request_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg, middleware::security_headers::security_headers_middleware))
        .with_state(state)
}
