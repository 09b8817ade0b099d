use serde_json::Value;

use crate::negotiate::{Step, first_success};

type Rule = fn(&Value) -> Option<String>;

/// Extraction rules, highest precedence first. A full transcript is the
/// richest signal; the scalar fields cover older agent deployments that
/// never return one.
const RULES: &[(&str, Rule)] = &[
    ("last_assistant_message", last_assistant_message),
    ("message.content.text", nested_message_text),
    ("output.text", output_text),
    ("text", top_level_text),
];

/// Pick the display text out of an agent response.
///
/// Never fails: when no rule matches, the whole body is returned as compact
/// JSON so the user sees *something* rather than an empty bubble.
pub fn extract_reply(body: &Value) -> String {
    first_success(RULES, |(rule, extract)| match extract(body) {
        Some(text) if !text.is_empty() => Step::Accept(text),
        _ => Step::Continue(*rule),
    })
    .unwrap_or_else(|_| body.to_string())
}

fn last_assistant_message(body: &Value) -> Option<String> {
    body.get("messages")?
        .as_array()?
        .iter()
        .rev()
        .find(|entry| is_assistant(entry))
        .and_then(|entry| entry.get("content"))
        .and_then(content_text)
}

/// Agent deployments mark speakers either with `role` or with a
/// `message_type` tag.
fn is_assistant(entry: &Value) -> bool {
    entry.get("role").and_then(Value::as_str) == Some("assistant")
        || entry.get("message_type").and_then(Value::as_str) == Some("assistant_message")
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Value::Object(_) => content.get("text").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn nested_message_text(body: &Value) -> Option<String> {
    text_at(body, "/message/content/text")
}

fn output_text(body: &Value) -> Option<String> {
    text_at(body, "/output/text")
}

fn top_level_text(body: &Value) -> Option<String> {
    text_at(body, "/text")
}

fn text_at(body: &Value, pointer: &str) -> Option<String> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}
