use serde_json::{Value, json};

use crate::chat::ChatTurn;

/// One hypothesis about the body the agent's `messages` endpoint accepts.
///
/// Deployments of the agent service have disagreed on this contract, so the
/// relay carries several encodings and lets the upstream pick one by
/// accepting it. Building a body never fails; only the upstream can reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTemplate {
    /// `{input: "...", user: {identifier_key}}`
    InputWithUser,
    /// `{input: {type: "text", text}, user: {identifier_key}}`
    StructuredInput,
    /// `{message: {role: "user", content}}`
    SingleMessage,
    /// `{messages: [{role: "user", content}]}`
    MessageList,
    /// Typed two-entry transcript; the first entry carries the session
    /// context (user + household) the agent needs to file records.
    ContextTranscript,
}

/// Negotiation order: most likely match for current deployments first.
pub const SHAPE_CATALOG: &[ShapeTemplate] = &[
    ShapeTemplate::InputWithUser,
    ShapeTemplate::StructuredInput,
    ShapeTemplate::SingleMessage,
    ShapeTemplate::MessageList,
    ShapeTemplate::ContextTranscript,
];

impl ShapeTemplate {
    pub fn name(self) -> &'static str {
        match self {
            Self::InputWithUser => "input_with_user",
            Self::StructuredInput => "structured_input",
            Self::SingleMessage => "single_message",
            Self::MessageList => "message_list",
            Self::ContextTranscript => "context_transcript",
        }
    }

    pub fn build(self, turn: &ChatTurn) -> Value {
        match self {
            Self::InputWithUser => json!({
                "input": turn.message,
                "user": { "identifier_key": turn.identifier },
            }),
            Self::StructuredInput => json!({
                "input": { "type": "text", "text": turn.message },
                "user": { "identifier_key": turn.identifier },
            }),
            Self::SingleMessage => json!({
                "message": { "role": "user", "content": turn.message },
            }),
            Self::MessageList => json!({
                "messages": [{ "role": "user", "content": turn.message }],
            }),
            Self::ContextTranscript => json!({
                "messages": [
                    typed_user_message(&session_context_line(turn)),
                    typed_user_message(&turn.message),
                ],
            }),
        }
    }
}

/// Hidden first line telling the agent who is speaking and where their
/// records belong.
pub fn session_context_line(turn: &ChatTurn) -> String {
    format!(
        "SESSION_CONTEXT: user_email={}; household_id={}",
        turn.identifier, turn.grouping_id
    )
}

fn typed_user_message(text: &str) -> Value {
    json!({
        "type": "message",
        "role": "user",
        "content": [{ "type": "text", "text": text }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> ChatTurn {
        ChatTurn {
            message: "spent 250 on groceries".to_string(),
            identifier: "asha@example.com".to_string(),
            grouping_id: "home-001".to_string(),
        }
    }

    #[test]
    fn catalog_is_non_empty_and_names_are_unique() {
        assert!(!SHAPE_CATALOG.is_empty());
        let mut names: Vec<_> = SHAPE_CATALOG.iter().map(|shape| shape.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SHAPE_CATALOG.len());
    }

    #[test]
    fn catalog_starts_with_free_text_input() {
        assert_eq!(SHAPE_CATALOG[0], ShapeTemplate::InputWithUser);
        assert_eq!(
            SHAPE_CATALOG[0].build(&turn()),
            json!({
                "input": "spent 250 on groceries",
                "user": { "identifier_key": "asha@example.com" },
            })
        );
    }

    #[test]
    fn structured_input_wraps_text() {
        let body = ShapeTemplate::StructuredInput.build(&turn());
        assert_eq!(body["input"]["type"], "text");
        assert_eq!(body["input"]["text"], "spent 250 on groceries");
        assert_eq!(body["user"]["identifier_key"], "asha@example.com");
    }

    #[test]
    fn message_shapes_carry_role_and_content() {
        let single = ShapeTemplate::SingleMessage.build(&turn());
        assert_eq!(single["message"]["role"], "user");
        assert_eq!(single["message"]["content"], "spent 250 on groceries");

        let list = ShapeTemplate::MessageList.build(&turn());
        let messages = list["messages"].as_array().expect("messages array");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"], "spent 250 on groceries");
    }

    #[test]
    fn context_transcript_puts_session_context_first() {
        let body = ShapeTemplate::ContextTranscript.build(&turn());
        let messages = body["messages"].as_array().expect("messages array");
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0]["content"][0]["text"],
            "SESSION_CONTEXT: user_email=asha@example.com; household_id=home-001"
        );
        assert_eq!(messages[1]["content"][0]["text"], "spent 250 on groceries");
        assert!(messages.iter().all(|m| m["type"] == "message" && m["role"] == "user"));
    }

    #[test]
    fn message_text_is_escaped_not_interpolated() {
        let mut tricky = turn();
        tricky.message = r#"say "hi" \n {"input":1}"#.to_string();
        let body = ShapeTemplate::InputWithUser.build(&tricky);
        assert_eq!(body["input"], r#"say "hi" \n {"input":1}"#);
    }
}
