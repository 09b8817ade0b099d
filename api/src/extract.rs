//! Body extractor that converts axum rejections to structured AppError responses.
//!
//! Handlers take the body as raw bytes and validate it themselves, so a
//! missing or wrong `Content-Type` never turns into axum's plain-text 415.
//! JSON parsing (and the "Body must be JSON" answer) happens in `parley-core`.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, Request};

use crate::error::AppError;

pub struct RawBody(pub Bytes);

impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Bytes::from_request(req, state).await {
            Ok(bytes) => Ok(RawBody(bytes)),
            Err(rejection) => Err(map_bytes_rejection(rejection)),
        }
    }
}

/// Convert a `BytesRejection` (oversized or unreadable body) to `AppError::Validation`.
pub fn map_bytes_rejection(rejection: BytesRejection) -> AppError {
    AppError::Validation {
        message: format!("Request body could not be read: {}", rejection.body_text()),
    }
}
