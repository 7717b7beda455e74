use super::localized::{Blank, LocalizedRichText, LocalizedText};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Publication state of a tour. Content without drafts enabled carries no
/// status at all (or `null`) and is treated as published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum TourStatus {
    Draft,
    #[default]
    Published,
}

impl From<Value> for TourStatus {
    fn from(value: Value) -> Self {
        match value.as_str().map(str::trim) {
            Some(status) if status.eq_ignore_ascii_case("draft") => TourStatus::Draft,
            _ => TourStatus::Published,
        }
    }
}

/// Snapshot of a tour as handed over by the CMS after a save.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TourRecord {
    pub id: i32,
    #[serde(alias = "_status")]
    pub status: TourStatus,
    pub title: LocalizedText,
    pub short_description: LocalizedText,
    pub description: LocalizedRichText,
    #[serde(deserialize_with = "related_entities")]
    pub highlights: Vec<RelatedEntity>,
    #[serde(deserialize_with = "related_entities")]
    pub categories: Vec<RelatedEntity>,
    #[serde(alias = "targetAudience", deserialize_with = "related_entities")]
    pub audience: Vec<RelatedEntity>,
}

impl TourRecord {
    pub fn is_draft(&self) -> bool {
        self.status == TourStatus::Draft
    }
}

/// Reads a relationship or tag list of any shape: `null` is empty, a lone
/// value is a one-element list.
fn related_entities<'de, D>(deserializer: D) -> Result<Vec<RelatedEntity>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(RelatedEntity::from).collect(),
        other => vec![RelatedEntity::from(other)],
    })
}

/// An entry of a relationship field.
///
/// Depending on query depth the CMS sends the related document itself, only
/// its id, or (for free-text highlights) a bare label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum RelatedEntity {
    Populated {
        name: Option<LocalizedText>,
        title: Option<LocalizedText>,
    },
    Label(String),
    Reference(Value),
}

impl From<Value> for RelatedEntity {
    fn from(value: Value) -> Self {
        match value {
            Value::String(label) => RelatedEntity::Label(label),
            Value::Object(mut object)
                if object.contains_key("name") || object.contains_key("title") =>
            {
                RelatedEntity::Populated {
                    name: object.remove("name").map(LocalizedText::from),
                    title: object.remove("title").map(LocalizedText::from),
                }
            }
            other => RelatedEntity::Reference(other),
        }
    }
}

impl RelatedEntity {
    /// Display name in `locale`; empty for unpopulated references.
    pub fn display_name(&self, locale: &str, fallback: &str) -> String {
        match self {
            RelatedEntity::Populated { name, title } => {
                let name = name
                    .as_ref()
                    .map(|field| field.resolve(locale, fallback))
                    .unwrap_or_default();
                if !name.is_blank() {
                    return name;
                }
                title
                    .as_ref()
                    .map(|field| field.resolve(locale, fallback))
                    .unwrap_or_default()
            }
            RelatedEntity::Label(label) => label.clone(),
            RelatedEntity::Reference(_) => String::new(),
        }
    }
}
