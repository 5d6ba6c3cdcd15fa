//! HTTP-facing error type
//!
//! Every failure leaves the service as `{"error": {"code", "message", "fields"?}}`
//! with the status fixed per variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clubsite_common::api::{ErrorBody, ErrorDetail, FieldErrorBody};
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::WriteError;
use crate::orchestrator::form::FormError;
use crate::orchestrator::schema::FieldError;
use crate::orchestrator::SubmitError;
use crate::reader::ReaderError;
use crate::storage::UploadError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Form failed validation (400)
    #[error("{}", join_messages(.0))]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    UploadFailed(String),

    #[error("{0}")]
    StorageUnavailable(String),

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    NotConfigured(String),

    /// A backend the read path needs is unreachable (503)
    #[error("{0}")]
    BackendUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => e.status(),
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UploadFailed(_)
            | ApiError::StorageUnavailable(_)
            | ApiError::Persistence(_)
            | ApiError::NotConfigured(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(e) => e.code(),
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UploadFailed(_) => "UPLOAD_FAILED",
            ApiError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            ApiError::Persistence(_) => "PERSISTENCE_ERROR",
            ApiError::NotConfigured(_) => "NOT_CONFIGURED",
            ApiError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let message = self.to_string();

        let fields = match self {
            ApiError::Validation(errors) => errors
                .into_iter()
                .map(|e| FieldErrorBody {
                    field: e.field,
                    message: e.message,
                })
                .collect(),
            _ => Vec::new(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code = %code, message = %message, "Request failed");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                fields,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
            e @ UploadError::UploadFailed(_) => ApiError::UploadFailed(e.to_string()),
        }
    }
}

impl From<WriteError> for ApiError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::NotConfigured(msg) => ApiError::NotConfigured(msg),
            e @ WriteError::Persistence(_) => ApiError::Persistence(e.to_string()),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(errors) => ApiError::Validation(errors),
            SubmitError::Upload(e) => e.into(),
            SubmitError::Write(e) => e.into(),
        }
    }
}

impl From<ReaderError> for ApiError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::NotConfigured(msg) => ApiError::NotConfigured(msg),
            e @ ReaderError::Unavailable(_) => ApiError::BackendUnavailable(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        match err {
            e @ FormError::TooLarge => ApiError::PayloadTooLarge(e.to_string()),
            e @ FormError::Malformed(_) => ApiError::BadRequest(e.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use clubsite_common::api::TokenRejection;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let (status, body) = body_of(ApiError::Validation(vec![FieldError::new(
            "logo",
            "Logo file is required",
        )]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert_eq!(body.error.message, "Logo file is required");
        assert_eq!(body.error.fields[0].field, "logo");
    }

    #[tokio::test]
    async fn test_auth_errors_keep_their_status() {
        let (status, body) =
            body_of(AuthError::InvalidOrExpiredCredential(TokenRejection::Expired).into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error.code, "INVALID_OR_EXPIRED_CREDENTIAL");
        assert!(body.error.fields.is_empty());

        let (status, _) = body_of(AuthError::ProviderUnavailable("down".into()).into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_write_error_mapping() {
        let err: ApiError = WriteError::Persistence("quota exceeded".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
        assert!(err.to_string().contains("quota exceeded"));

        let err: ApiError = WriteError::NotConfigured("no project".into()).into();
        assert_eq!(err.code(), "NOT_CONFIGURED");
    }
}
