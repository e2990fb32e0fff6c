use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog_reconcile::ReconcileError;
use catalog_storage::{ErrorCategory, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
}

/// High-level API errors to be mapped to HTTP responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// The message is returned verbatim; clients match on it.
    #[error("{0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Part of a multi-step write was applied before a later step failed.
    #[error("Partially applied: {0}")]
    PartialApplication(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
    pub fn partial_application(msg: impl Into<String>) -> Self {
        Self::PartialApplication(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::PartialApplication(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid",
            ApiError::NotFound(_) => "not_found",
            ApiError::ServiceUnavailable(_) => "unavailable",
            ApiError::PartialApplication(_) => "partial_application",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            ApiError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        };
        ErrorBody {
            message,
            code: self.code().to_string(),
        }
    }

    fn from_category(category: ErrorCategory, message: String) -> Self {
        match category {
            ErrorCategory::Validation => Self::BadRequest(message),
            ErrorCategory::NotFound => Self::NotFound(message),
            ErrorCategory::Infrastructure => Self::ServiceUnavailable(message),
            ErrorCategory::Internal => Self::Internal(message),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = match &err {
            StorageError::InvalidInput { message } => message.clone(),
            other => other.to_string(),
        };
        Self::from_category(err.category(), message)
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match &err {
            ReconcileError::InvalidInput { message } => Self::BadRequest(message.clone()),
            // Nothing was applied; the store's own failure decides the status.
            ReconcileError::StoreUnavailable { source, .. } => {
                Self::from_category(source.category(), err.to_string())
            }
            ReconcileError::BatchesFailed { .. } => Self::ServiceUnavailable(err.to_string()),
            ReconcileError::PartialApplication { .. } => Self::PartialApplication(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_reconcile::StoreOperation;

    #[test]
    fn api_error_variants_map_to_status_and_codes() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST, "invalid"),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND, "not_found"),
            (
                ApiError::service_unavailable("x"),
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
            ),
            (
                ApiError::partial_application("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_application",
            ),
            (
                ApiError::internal("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];
        for (err, status, code) in cases.into_iter() {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.to_body().code, code);
        }
    }

    #[test]
    fn not_found_message_is_verbatim() {
        let body = ApiError::not_found("No product found with this id!").to_body();
        assert_eq!(body.message, "No product found with this id!");
    }

    #[test]
    fn storage_errors_map_by_category() {
        let err: ApiError = StorageError::invalid_input("price must be >= 0").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_body().message, "Bad request: price must be >= 0");

        let err: ApiError = StorageError::connection("refused").into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = StorageError::timeout("pool").into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = StorageError::internal("boom").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn reconcile_errors_map_to_status() {
        let err: ApiError = ReconcileError::invalid_input("bad id").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = ReconcileError::StoreUnavailable {
            operation: StoreOperation::List,
            source: StorageError::connection("refused"),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = ReconcileError::StoreUnavailable {
            operation: StoreOperation::Insert,
            source: StorageError::invalid_input("tag 9 does not exist"),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = ReconcileError::BatchesFailed {
            delete: StorageError::connection("a"),
            insert: StorageError::connection("b"),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = ReconcileError::PartialApplication {
            failed: StoreOperation::Insert,
            applied: StoreOperation::Delete,
            source: StorageError::connection("reset"),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.to_body();
        assert_eq!(body.code, "partial_application");
        assert!(body.message.contains("insert"));
    }
}
