use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::chat::ChatValidationError;
use parley_core::error::{ApiError, messages};
use parley_core::records::RecordValidationError;

/// Internal error type that converts to `{error}` responses
#[derive(Debug)]
pub enum AppError {
    /// Endpoint only accepts POST (405)
    MethodNotAllowed,
    /// Caller sent a malformed or incomplete body (400)
    Validation { message: String },
    /// Tool secret missing or wrong (401)
    Unauthorized,
    /// Operator has not set a required secret (500)
    NotConfigured { missing: &'static str },
    /// Agent service rejected every shape, was unreachable, or broke its
    /// response contract (502)
    Upstream { message: String },
    /// Record store refused or failed the insert (500)
    Storage { message: String },
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, messages::POST_ONLY.to_string())
            }
            AppError::Validation { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, messages::UNAUTHORIZED.to_string()),
            AppError::NotConfigured { missing } => {
                tracing::error!(missing = missing, "Request refused: server not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    messages::SERVER_NOT_CONFIGURED.to_string(),
                )
            }
            AppError::Upstream { message } => {
                tracing::warn!(error = %message, "Upstream agent negotiation failed");
                (StatusCode::BAD_GATEWAY, message)
            }
            AppError::Storage { message } => {
                tracing::error!(error = %message, "Record store error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ApiError::new(message))).into_response()
    }
}

impl From<ChatValidationError> for AppError {
    fn from(err: ChatValidationError) -> Self {
        if let ChatValidationError::MissingField { field } = &err {
            tracing::debug!(field = *field, "Chat request rejected");
        }
        AppError::Validation {
            message: err.to_string(),
        }
    }
}

impl From<RecordValidationError> for AppError {
    fn from(err: RecordValidationError) -> Self {
        AppError::Validation {
            message: err.to_string(),
        }
    }
}
