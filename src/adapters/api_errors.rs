use {
    crate::domain::error::{DomainError, StoreError},
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    thiserror::Error,
};

/// Transport-level failures. The verification and access endpoints render
/// their own structured result bodies even on failure; this type covers
/// everything that genuinely is an HTTP error: rejected webhooks, bad
/// request payloads, the admin surface, and unexpected internal failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid webhook signature: {0}")]
    Signature(String),

    #[error("{0}")]
    Invalid(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("internal error")]
    Internal(#[from] StoreError),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Invalid(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Signature(reason) => {
                tracing::warn!(reason, "rejected webhook signature");
                (
                    StatusCode::BAD_REQUEST,
                    "invalid webhook signature".to_string(),
                )
            }
            ApiError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "store failure surfaced to transport");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
