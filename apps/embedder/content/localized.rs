//! Resolution of fields that are either shared by every locale or stored as a
//! per-locale map.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A value that counts as missing for fallback purposes even when present.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for str {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.as_str().is_blank()
    }
}

impl Blank for Value {
    fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_blank(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

/// Returns the value stored for `locale`, or the one for `fallback` when the
/// former is absent or blank. `None` when neither has anything usable.
pub fn pick<'a, T: Blank>(
    map: &'a BTreeMap<String, T>,
    locale: &str,
    fallback: &str,
) -> Option<&'a T> {
    map.get(locale)
        .filter(|value| !value.is_blank())
        .or_else(|| map.get(fallback).filter(|value| !value.is_blank()))
}

/// A plain-text field as the CMS hands it over.
///
/// Older single-locale content stores a bare string; localized content stores
/// a map keyed by locale code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum LocalizedText {
    Plain(String),
    PerLocale(BTreeMap<String, Value>),
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl From<Value> for LocalizedText {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => LocalizedText::Plain(s),
            Value::Object(map) => LocalizedText::PerLocale(map.into_iter().collect()),
            Value::Number(n) => LocalizedText::Plain(n.to_string()),
            Value::Bool(b) => LocalizedText::Plain(b.to_string()),
            Value::Null | Value::Array(_) => LocalizedText::default(),
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        LocalizedText::Plain(value.to_string())
    }
}

impl LocalizedText {
    /// Resolves the text for `locale`, falling back to `fallback`. Absence is
    /// not an error: the result is simply empty.
    pub fn resolve(&self, locale: &str, fallback: &str) -> String {
        match self {
            LocalizedText::Plain(text) => text.clone(),
            LocalizedText::PerLocale(map) => pick(map, locale, fallback)
                .map(scalar_to_string)
                .unwrap_or_default(),
        }
    }
}

/// A rich-text field: either one document tree for all locales or a map of
/// locale code to tree.
///
/// Anything that is neither (a bare string, an array of nodes, junk) is kept
/// as `Raw` and left to the extractor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum LocalizedRichText {
    Document(Value),
    PerLocale(BTreeMap<String, Value>),
    Raw(Value),
}

impl Default for LocalizedRichText {
    fn default() -> Self {
        LocalizedRichText::Raw(Value::Null)
    }
}

impl From<Value> for LocalizedRichText {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) if is_document_shaped(&map) => {
                LocalizedRichText::Document(Value::Object(map))
            }
            Value::Object(map) => LocalizedRichText::PerLocale(map.into_iter().collect()),
            other => LocalizedRichText::Raw(other),
        }
    }
}

impl LocalizedRichText {
    /// Resolves the tree for `locale`, falling back to `fallback`.
    pub fn resolve(&self, locale: &str, fallback: &str) -> Option<&Value> {
        match self {
            LocalizedRichText::Document(tree) => Some(tree),
            LocalizedRichText::PerLocale(map) => pick(map, locale, fallback),
            LocalizedRichText::Raw(value) => Some(value).filter(|value| !value.is_blank()),
        }
    }
}

fn is_document_shaped(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("root") || map.contains_key("children") || map.contains_key("type")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
