#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use http_body_util::BodyExt;
    use serde_json::Value;

    use crate::error::{AppError, FieldError, OptionExt};

    async fn envelope(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            (AppError::Internal(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            (AppError::RateLimited { retry_after_seconds: 7 }, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        ];
        for (err, status, code) in cases {
            let (got, body) = envelope(err).await;
            assert_eq!(got, status);
            assert_eq!(body["error"]["code"], code);
            assert_eq!(body["status"], status.as_u16());
            assert!(body["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn test_database_detail_not_leaked() {
        let (_, body) = envelope(AppError::Database("no such table: years".into())).await;
        assert_eq!(body["error"]["message"], "A database error occurred");
    }

    #[tokio::test]
    async fn test_validation_envelope_lists_fields() {
        let err = AppError::Validation(vec![
            FieldError::new("title", "Title is required"),
            FieldError::new("totalQuantity", "Required"),
        ]);
        let (status, body) = envelope(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        let fields = body["error"]["details"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["field"], "title");
        assert_eq!(fields[0]["message"], "Title is required");
    }

    #[tokio::test]
    async fn test_persistence_adapter() {
        let hidden = AppError::persistence("Unable to create a new book")(AppError::Database("disk I/O error".into()));
        let (status, body) = envelope(hidden).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "PERSISTENCE_ERROR");
        assert_eq!(body["error"]["message"], "Unable to create a new book");
        assert!(body["error"]["details"]["error_id"].is_string());

        let passed = AppError::persistence("Unable to create a new student")(AppError::Conflict("dup".into()));
        assert!(matches!(passed, AppError::Conflict(_)));
        let passed = AppError::persistence("Unable to update book")(AppError::NotFound("Book not found".into()));
        assert!(matches!(passed, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_conflict() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (k TEXT UNIQUE)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO t (k) VALUES ('a')").execute(&pool).await.unwrap();

        let err: AppError = sqlx::query("INSERT INTO t (k) VALUES ('a')").execute(&pool).await.unwrap_err().into();

        assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("UNIQUE constraint failed")));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_ok_or_not_found() {
        let missing: Option<u8> = None;
        match missing.ok_or_not_found("Student") {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Student not found"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(Some(3).ok_or_not_found("Book").unwrap(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(AppError::BadRequest("oops".into()).to_string(), "Bad request: oops");
        let err = AppError::invalid_field("yearId", "Year does not exist");
        assert_eq!(err.to_string(), "Validation failed for: yearId");
    }
}
