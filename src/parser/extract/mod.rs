pub mod markup;
pub mod record;

use std::borrow::Cow;

use serde_json::Value;
use tracing::debug;

use super::turn::Turn;

/// Places where share pages are known to keep their message list.
const KNOWN_PATHS: &[&[&str]] = &[
    &["conversation", "messages"],
    &["conversation", "chat_messages"],
    &["props", "pageProps", "conversation", "messages"],
    &["props", "pageProps", "conversation", "chat_messages"],
    &["props", "pageProps", "messages"],
    &["chat_messages"],
    &["messages"],
];

const SPEAKER_FIELDS: &[&str] = &["role", "sender", "speaker", "author"];
const CONTENT_FIELDS: &[&str] = &["content", "text", "completion", "message"];

/// Locate the turn records of a decoded document and normalize them.
/// An empty result means nothing usable was found.
pub fn extract_turns(doc: &Value, max_depth: usize, responder_name: &str) -> Vec<Turn> {
    for path in KNOWN_PATHS {
        let Some(records) = probe(doc, path) else {
            continue;
        };
        let turns = record::normalize_records(records_of(&records), responder_name);
        if !turns.is_empty() {
            debug!("Found {} turns at {}", turns.len(), path.join("."));
            return turns;
        }
    }

    match find_turn_array(doc, 0, max_depth) {
        Some(records) => {
            let turns = record::normalize_records(records, responder_name);
            debug!("Structural search found {} records, {} turns", records.len(), turns.len());
            turns
        }
        None => {
            debug!("No turn array in document");
            Vec::new()
        }
    }
}

/// Follow `path` and return a non-empty array. A string found there is decoded as embedded JSON.
fn probe<'a>(doc: &'a Value, path: &[&str]) -> Option<Cow<'a, Value>> {
    let mut node = doc;
    for key in path {
        node = node.get(*key)?;
    }

    let node = match node {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(decoded) => Cow::Owned(decoded),
            Err(e) => {
                debug!("Embedded data at {} is not JSON: {}", path.join("."), e);
                return None;
            }
        },
        other => Cow::Borrowed(other),
    };

    match node.as_array() {
        Some(items) if !items.is_empty() => Some(node),
        _ => None,
    }
}

fn records_of<'a>(value: &'a Cow<'_, Value>) -> &'a [Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Depth-first walk; the first array whose first element looks like a turn record wins.
fn find_turn_array(value: &Value, depth: usize, max_depth: usize) -> Option<&[Value]> {
    if depth > max_depth {
        return None;
    }
    match value {
        Value::Array(items) => {
            if items.first().is_some_and(looks_like_record) {
                return Some(items.as_slice());
            }
            items
                .iter()
                .find_map(|item| find_turn_array(item, depth + 1, max_depth))
        }
        Value::Object(map) => map
            .values()
            .find_map(|v| find_turn_array(v, depth + 1, max_depth)),
        _ => None,
    }
}

fn looks_like_record(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let has = |fields: &[&str]| {
        fields
            .iter()
            .any(|f| obj.get(*f).is_some_and(|v| !v.is_null()))
    };
    has(SPEAKER_FIELDS) && has(CONTENT_FIELDS)
}
