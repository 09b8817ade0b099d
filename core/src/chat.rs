use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use utoipa::ToSchema;

/// Grouping id used when neither the request nor the server supplies one.
pub const FALLBACK_GROUPING_ID: &str = "unknown";

/// Inbound chat call from the end-user client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's chat message, forwarded to the agent verbatim
    pub message: String,
    /// Stable identifier of the end user (usually the signed-in email)
    pub identifier: String,
    /// Household the user belongs to; falls back to the server default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_id: Option<String>,
}

/// Successful relay response. `raw` is the upstream body, untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    /// Display text extracted from the agent response
    pub reply: String,
    /// Upstream response body as received
    pub raw: Value,
}

/// A validated chat request with its grouping resolved. Every request shape
/// is built from this and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub message: String,
    pub identifier: String,
    pub grouping_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatValidationError {
    #[error("Body must be JSON")]
    MalformedBody,
    #[error("message and identifier required")]
    MissingField { field: &'static str },
}

/// Parse and validate a raw chat body.
///
/// The body is parsed as JSON whatever the declared content type. A `null` or
/// non-object body is treated as having no fields at all.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, ChatValidationError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ChatValidationError::MalformedBody)?;
    let empty = Map::new();
    let fields = value.as_object().unwrap_or(&empty);

    let message = required_text(fields, "message")?;
    let identifier = required_text(fields, "identifier")?;
    let household_id = non_blank_text(fields, "household_id").map(str::to_string);

    Ok(ChatRequest {
        message: message.to_string(),
        identifier: identifier.to_string(),
        household_id,
    })
}

fn required_text<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ChatValidationError> {
    non_blank_text(fields, field).ok_or(ChatValidationError::MissingField { field })
}

fn non_blank_text<'a>(fields: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    fields
        .get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

impl ChatRequest {
    /// Resolve the grouping id: the request's own value, then the server
    /// default, then [`FALLBACK_GROUPING_ID`].
    pub fn into_turn(self, default_grouping_id: Option<&str>) -> ChatTurn {
        let grouping_id = self
            .household_id
            .or_else(|| default_grouping_id.map(str::to_string))
            .unwrap_or_else(|| FALLBACK_GROUPING_ID.to_string());

        ChatTurn {
            message: self.message,
            identifier: self.identifier,
            grouping_id,
        }
    }
}
