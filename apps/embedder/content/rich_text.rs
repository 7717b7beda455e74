//! Flattening of rich-text document trees into plain text.
//!
//! Trees come from the CMS editor as JSON: a `root` wrapper holding nodes that
//! either carry `text` (leaves) or `children` (paragraphs, lists, links, ...).
//! Extraction never fails; whatever cannot be understood contributes nothing,
//! or at worst goes through a crude scrub of its serialized form.

use serde_json::Value;

/// Upper bound on extracted text, in characters.
pub const MAX_EXTRACTED_CHARS: usize = 2000;

/// Nodes nested deeper than this are ignored.
const MAX_DEPTH: usize = 64;

/// The closed set of node shapes the walker understands.
enum Node<'a> {
    Root(&'a Value),
    Text(&'a str),
    Container(&'a [Value]),
    Unknown,
}

impl<'a> Node<'a> {
    fn classify(value: &'a Value) -> Self {
        if let Value::Array(items) = value {
            return Node::Container(items);
        }
        let Some(object) = value.as_object() else {
            return Node::Unknown;
        };
        if let Some(text) = object.get("text").and_then(Value::as_str) {
            let is_text_type = object
                .get("type")
                .and_then(Value::as_str)
                .is_none_or(|kind| kind == "text");
            if is_text_type {
                return Node::Text(text);
            }
        }
        if let Some(children) = object.get("children").and_then(Value::as_array) {
            return Node::Container(children);
        }
        if let Some(root) = object.get("root") {
            return Node::Root(root);
        }
        Node::Unknown
    }
}

/// Extracts the plain text of a rich-text value, truncated to
/// [`MAX_EXTRACTED_CHARS`].
///
/// Strings holding serialized JSON trees are parsed first; other strings are
/// taken as already-plain text.
pub fn extract_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => extract_structured(&parsed),
            _ => truncate_chars(&collapse_whitespace(raw), MAX_EXTRACTED_CHARS),
        },
        other => extract_structured(other),
    }
}

fn extract_structured(value: &Value) -> String {
    if matches!(Node::classify(value), Node::Unknown) {
        return scrub_fallback(value);
    }
    let mut pieces = Vec::new();
    let mut budget = MAX_EXTRACTED_CHARS;
    walk(value, 0, &mut pieces, &mut budget);
    truncate_chars(&pieces.join(" "), MAX_EXTRACTED_CHARS)
}

fn walk<'a>(value: &'a Value, depth: usize, pieces: &mut Vec<&'a str>, budget: &mut usize) {
    if depth > MAX_DEPTH || *budget == 0 {
        return;
    }
    match Node::classify(value) {
        Node::Text(text) => {
            let text = text.trim();
            if !text.is_empty() {
                *budget = budget.saturating_sub(text.chars().count() + 1);
                pieces.push(text);
            }
        }
        Node::Container(children) => {
            for child in children {
                walk(child, depth + 1, pieces, budget);
            }
        }
        Node::Root(inner) => walk(inner, depth + 1, pieces, budget),
        Node::Unknown => {}
    }
}

/// Last resort for values with no recognizable shape: serialize and strip the
/// JSON punctuation.
fn scrub_fallback(value: &Value) -> String {
    let serialized = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let scrubbed: String = serialized
        .chars()
        .map(|ch| match ch {
            '{' | '}' | '[' | ']' | '"' => ' ',
            other => other,
        })
        .collect();
    truncate_chars(&collapse_whitespace(&scrubbed), MAX_EXTRACTED_CHARS)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
