//! Crate-wide error taxonomy and its HTTP mapping.
//!
//! Every failure a handler can produce is one of these variants; the
//! `IntoResponse` impl turns it into the `{ "error": "..." }` envelope the
//! clients expect. Only the status code and the presence of the `error` key
//! are a stable contract, not the message text.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

use crate::routes::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input (400).
    #[error("{0}")]
    Validation(String),
    /// Missing, invalid, or expired credentials (401).
    #[error("{0}")]
    Authentication(String),
    /// Authenticated but insufficient role or status (403).
    #[error("{0}")]
    Authorization(String),
    /// Referenced entity absent (404).
    #[error("{0}")]
    NotFound(String),
    /// Duplicate unique key surfaced by the store (409).
    #[error("{0}")]
    Conflict(String),
    /// The image host exhausted its retries. Responds 500 like any other
    /// unexpected failure, but stays a distinct kind internally.
    #[error("{0}")]
    Upstream(String),
    /// Database pool not configured (503).
    #[error("{0}")]
    Unavailable(String),
    /// Catch-all (500).
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) | ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Upstream(msg) => {
                tracing::error!("upstream image host failure: {}", msg);
            }
            ApiError::Unexpected(msg) => {
                tracing::error!("unexpected error: {}", msg);
            }
            ApiError::Unavailable(msg) => {
                tracing::warn!("service unavailable: {}", msg);
            }
            _ => {}
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::RowNotFound) {
            return ApiError::NotFound("Not found".to_string());
        }
        if let Some(db_err) = e.as_database_error() {
            // 23505: unique_violation. The unique indexes on users.email and
            // blogs.slug are the real uniqueness guard; the inline existence
            // checks are only a fast path for a friendlier message.
            if db_err.code().as_deref() == Some("23505") {
                return ApiError::Conflict("A record with this value already exists".to_string());
            }
        }
        tracing::error!("database error: {}", e);
        ApiError::Unexpected("Database error".to_string())
    }
}

impl From<crate::media::MediaError> for ApiError {
    fn from(e: crate::media::MediaError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_matches_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Authentication("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Authorization("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Upstream("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Unavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_error_response_carries_error_key() {
        let response = ApiError::Validation("All fields must be filled".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "All fields must be filled");
    }
}
