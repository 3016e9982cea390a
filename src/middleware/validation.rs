use axum::{
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;

/// Rejects traversal-looking paths and declared bodies over `server.max_body_bytes`
/// before any extractor runs. `DefaultBodyLimit` still guards bodies without a
/// `Content-Length`.
pub async fn validate_request_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if contains_path_traversal(path) {
        tracing::warn!(path = %sanitize_for_logging(path), "Rejected suspicious request path");
        return AppError::BadRequest("Path traversal detected in request".to_string()).into_response();
    }

    if matches!(*req.method(), Method::POST | Method::PATCH | Method::PUT) {
        let declared = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if let Some(len) = declared {
            let max = cfg.server.max_body_bytes;
            if len > max {
                return payload_too_large(max);
            }
        }
    }

    next.run(req).await
}

fn payload_too_large(max: usize) -> Response {
    let mut res = AppError::BadRequest(format!("Request body exceeds maximum size of {} bytes", max)).into_response();
    *res.status_mut() = axum::http::StatusCode::PAYLOAD_TOO_LARGE;
    res
}

fn contains_path_traversal(path: &str) -> bool {
    if path.contains("/..") || path.contains("\\..") || path.starts_with("..") || path.contains("/./") {
        return true;
    }
    let lower = path.to_ascii_lowercase();
    ["%2e%2e", "%252e%252e", "%2e/", "/%2e", "%2f%2e", "%5c", "%00"].iter().any(|p| lower.contains(p))
        || path.contains('\0')
}

/// Strips control characters and truncates, for echoing client input into logs.
pub fn sanitize_for_logging(input: &str) -> String {
    input.chars().filter(|c| !c.is_control()).take(200).collect()
}
