use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::fmt;

/// A single offending field reported by the schema validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path of the field inside the payload, e.g. `title` or `[2].status`.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// The primary error type for the application.
///
/// Every handler returns `AppResult<T>`; the `IntoResponse` impl below turns
/// each variant into the JSON error envelope used across the API.
#[derive(Debug)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    BadRequest(String),
    /// For when a requested resource is not found.
    NotFound(String),
    /// For when a request conflicts with a unique constraint.
    Conflict(String),
    /// For when a service is temporarily unavailable.
    ServiceUnavailable(String),
    /// For errors related to database operations.
    Database(String),
    /// For payloads rejected by the schema validator.
    Validation(Vec<FieldError>),
    /// A persistence failure reported to the client with a fixed, endpoint-specific message.
    Persistence {
        message: &'static str,
        detail: String,
    },
    /// For when a client has sent too many requests in a given amount of time.
    RateLimited {
        /// The number of seconds to wait before retrying the request.
        retry_after_seconds: u64,
    },
}

impl AppError {
    /// Builds a `map_err` adapter that hides database/internal failures behind `message`.
    ///
    /// Client-facing variants (not found, conflict, validation) pass through untouched.
    pub fn persistence(message: &'static str) -> impl FnOnce(AppError) -> AppError {
        move |err| match err {
            AppError::Database(detail) => AppError::Persistence { message, detail },
            AppError::Internal(e) => AppError::Persistence { message, detail: format!("{:#}", e) },
            AppError::ServiceUnavailable(detail) => AppError::Persistence { message, detail },
            other => other,
        }
    }

    /// Convenience for a single-field validation failure.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Validation(fields) => {
                let names: Vec<&str> = fields.iter().map(|fe| fe.field.as_str()).collect();
                write!(f, "Validation failed for: {}", names.join(", "))
            }
            AppError::Persistence { message, detail } => write!(f, "{}: {}", message, detail),
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Payload failed validation".to_string(),
                Some(json!({ "fields": fields })),
            ),
            AppError::Persistence { message, detail } => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "{}: {}", message, detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    message.to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::RateLimited { retry_after_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                // SQLite reports "UNIQUE constraint failed: students.enrollment_no"
                if msg.contains("UNIQUE constraint failed") {
                    AppError::Conflict(msg)
                } else {
                    AppError::Database(format!("Database error: {}", msg))
                }
            }
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(format!("Database error: {}", err)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// An extension trait for `Option` that provides a convenient way to convert
/// an `Option` to a `Result` with a `NotFound` error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, AppError>`.
    ///
    /// # Arguments
    ///
    /// * `entity` - A string describing the entity that was not found.
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} not found", entity)))
    }
}
