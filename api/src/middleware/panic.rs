use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::error::ApiError;

/// Response for a handler panic, used with `CatchPanicLayer::custom`.
///
/// The panic payload becomes the `{error}` message so the caller still gets
/// the single-field error body.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "Internal server error".to_string()
    };

    tracing::error!(panic = %message, "Handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::new(message))).into_response()
}
