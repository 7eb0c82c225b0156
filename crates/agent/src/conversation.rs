use serde_json::Value;
use twin_core::domain::turn::{Role, Turn};

/// Converts chat-surface history records into canonical [`Turn`]s.
///
/// A record is a JSON object with a `role` tag and a `content` payload that is
/// either a string or a list of content blocks. Records with an unsupported or
/// missing role, or with no usable text, are dropped. Order is preserved.
#[derive(Clone, Debug, Default)]
pub struct MessageNormalizer;

impl MessageNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, records: &[Value]) -> Vec<Turn> {
        records.iter().filter_map(normalize_record).collect()
    }
}

fn normalize_record(record: &Value) -> Option<Turn> {
    let role = record.get("role").and_then(Value::as_str).and_then(Role::from_tag)?;
    let text = record.get("content").map(extract_text).unwrap_or_default();
    Turn::new(role, text).ok()
}

/// Text of a content payload: a plain string verbatim, or the space-joined
/// text of every `text` block in a block list. Other block kinds are ignored.
pub fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks.iter().filter_map(block_text).collect::<Vec<_>>().join(" "),
        _ => String::new(),
    }
}

fn block_text(block: &Value) -> Option<&str> {
    match block {
        Value::String(text) => Some(text.as_str()),
        Value::Object(fields) if fields.get("type").and_then(Value::as_str) == Some("text") => {
            Some(fields.get("text").and_then(Value::as_str).unwrap_or_default())
        }
        _ => None,
    }
}

/// Message text from the chat surface, which sends either a string or `{"text": ...}`.
pub fn message_text(message: &Value) -> String {
    match message {
        Value::String(text) => text.clone(),
        Value::Object(fields) => {
            fields.get("text").and_then(Value::as_str).unwrap_or_default().to_string()
        }
        _ => String::new(),
    }
}
