pub mod chat;
pub mod health;
pub mod records;

use crate::error::AppError;

/// Method fallback for POST-only endpoints, so 405 still carries `{error}`.
pub async fn post_only() -> AppError {
    AppError::MethodNotAllowed
}
