use serde_json::Value;

use crate::parser::turn::{Role, Turn};

const TEXT_FIELDS: &[&str] = &["text", "completion"];
const PART_FIELDS: &[&str] = &["text", "content", "value"];

/// Nested `message` objects deeper than this are not followed.
const MAX_MESSAGE_NESTING: usize = 8;

/// Normalize raw records into turns. Records without extractable content are dropped.
pub fn normalize_records(records: &[Value], responder_name: &str) -> Vec<Turn> {
    let responder = responder_name.to_lowercase();
    records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let content = record_content(record, 0)?;
            let role = speaker_of(record)
                .and_then(|s| classify_speaker(&s, &responder))
                .unwrap_or_else(|| Role::at(i));
            Some(Turn::new(role, content))
        })
        .collect()
}

/// First non-empty text found: text/completion, string content, content parts, nested message.
pub fn record_content(record: &Value, nesting: usize) -> Option<String> {
    let obj = record.as_object()?;

    let direct = TEXT_FIELDS
        .iter()
        .filter_map(|f| obj.get(*f).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty());
    if let Some(s) = direct {
        return Some(s.trim().to_string());
    }

    match obj.get("content") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
        Some(Value::Array(parts)) => {
            let joined = parts
                .iter()
                .filter_map(part_text)
                .collect::<Vec<_>>()
                .join("\n");
            if !joined.trim().is_empty() {
                return Some(joined.trim().to_string());
            }
        }
        _ => {}
    }

    if nesting < MAX_MESSAGE_NESTING {
        if let Some(message) = obj.get("message").filter(|m| m.is_object()) {
            return record_content(message, nesting + 1);
        }
    }

    None
}

fn part_text(part: &Value) -> Option<&str> {
    let text = match part {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => PART_FIELDS
            .iter()
            .filter_map(|f| obj.get(*f).and_then(Value::as_str))
            .next(),
        _ => None,
    };
    text.filter(|s| !s.trim().is_empty())
}

/// Lowercased value of the first string-typed speaker field.
pub fn speaker_of(record: &Value) -> Option<String> {
    let candidates = [
        record.get("role"),
        record.get("speaker"),
        record.get("sender"),
        record.get("author").and_then(|a| a.get("role")),
        record.get("author"),
        record.get("message").and_then(|m| m.get("role")),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .map(str::to_lowercase)
}

/// Keyword match on a lowercased speaker string. `None` when nothing matches.
pub fn classify_speaker(speaker: &str, responder_name: &str) -> Option<Role> {
    let named = !responder_name.is_empty() && speaker.contains(responder_name);
    if speaker.contains("assistant") || named {
        Some(Role::Responder)
    } else if speaker.contains("user") || speaker.contains("human") {
        Some(Role::Questioner)
    } else {
        None
    }
}
