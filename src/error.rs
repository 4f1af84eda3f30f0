use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::ffi::ErrorCode;

use crate::db::models::ContentStatus;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// The video or comment a reaction/comment targets does not exist.
    #[error("Subject not found")]
    SubjectNotFound,

    /// A mutating operation was attempted without an identity.
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ContentStatus,
        to: ContentStatus,
    },

    /// The store rejected the composed filter (bad column, missing index).
    #[error("Query rejected: {0}")]
    Query(String),

    /// Availability failure; the identical request may be retried.
    #[error("Store unavailable: {0}")]
    TransientStore(String),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransientStore(_))
    }

    /// Stable machine-readable kind, used where there is no HTTP status.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::SubjectNotFound => "SUBJECT_NOT_FOUND",
            AppError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::Query(_) => "QUERY_ERROR",
            AppError::TransientStore(_) => "TRANSIENT_STORE_ERROR",
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Internal(_)
            | AppError::Json(_) => "INTERNAL",
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(inner, _) = &e {
            if matches!(inner.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
                return AppError::TransientStore(e.to_string());
            }
        }
        AppError::Database(e)
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::TransientStore(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::SubjectNotFound => (StatusCode::NOT_FOUND, "Subject not found".to_string()),
            AppError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::Query(msg) => {
                tracing::warn!("Query rejected by store: {}", msg);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Could not load content".to_string(),
                )
            }
            AppError::TransientStore(msg) => {
                tracing::warn!("Transient store error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Temporarily unavailable, please retry".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "retryable": self.is_retryable(),
            })),
        )
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            response_status(AppError::SubjectNotFound),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn missing_identity_returns_401() {
        assert_eq!(
            response_status(AppError::AuthenticationRequired),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn invalid_transition_returns_409() {
        let err = AppError::InvalidTransition {
            from: ContentStatus::Published,
            to: ContentStatus::Processing,
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition from published to processing"
        );
        assert_eq!(response_status(err), StatusCode::CONFLICT);
    }

    #[test]
    fn query_and_transient_errors_map_to_distinct_statuses() {
        assert_eq!(
            response_status(AppError::Query("no such index".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            response_status(AppError::TransientStore("busy".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn busy_sqlite_errors_are_retryable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = AppError::from(busy);
        assert!(err.is_retryable());

        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(!AppError::from(constraint).is_retryable());
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
