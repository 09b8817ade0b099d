use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every Parley endpoint.
///
/// Deliberately a single string: chat widgets and agent tools that call the
/// relay display or log it verbatim. Upstream diagnostics (status, body text,
/// transport cause) are folded into the message rather than split into fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human/operator-readable description of what went wrong
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Fixed messages shared by the chat and record endpoints.
pub mod messages {
    pub const POST_ONLY: &str = "POST only";
    pub const BODY_MUST_BE_JSON: &str = "Body must be JSON";
    pub const SERVER_NOT_CONFIGURED: &str = "Server not configured";
    pub const UNAUTHORIZED: &str = "Unauthorized";
}
