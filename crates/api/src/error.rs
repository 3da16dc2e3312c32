use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kb_core::document::RevisionId;
use kb_core::KbError;
use serde_json::json;

/// API error type mapped to JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A `based_on` outside the origin document; the client must resubmit.
    #[error("bad based_on: {message}")]
    StaleBasedOn {
        message: String,
        suggested: Option<RevisionId>,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<KbError> for ApiError {
    fn from(err: KbError) -> Self {
        let message = err.to_string();
        match err {
            KbError::InvariantViolation(_) => ApiError::Unprocessable(message),
            KbError::Collision { .. } => ApiError::Conflict(message),
            KbError::CallerContract { suggested, .. } => {
                ApiError::StaleBasedOn { message, suggested }
            }
            KbError::NotFound { .. } => ApiError::NotFound(message),
            KbError::Storage(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::StaleBasedOn { message, .. } => {
                (StatusCode::BAD_REQUEST, "badBasedOn", message.clone())
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required".to_string(),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invariantViolation", msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "type": error_type,
            "message": message,
            "statusCode": status.as_u16(),
        });
        if let ApiError::StaleBasedOn { suggested, .. } = &self {
            error["suggestedBasedOn"] = json!(suggested);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
