//! Assembly of the per-locale input handed to the embedding model.

use crate::content::{Blank, RelatedEntity, TourRecord, extract_text};
use serde::Serialize;

/// Everything about one tour in one locale that feeds its embedding.
///
/// Built fresh on every pipeline run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddableDocument {
    pub title: String,
    pub description: String,
    pub short_description: String,
    pub highlights: Vec<String>,
    pub categories: Vec<String>,
    pub audience_tags: Vec<String>,
    pub locale: String,
}

impl EmbeddableDocument {
    /// Resolves every localizable field of `record` for `locale`.
    pub fn assemble(record: &TourRecord, locale: &str, fallback: &str) -> Self {
        let description = record
            .description
            .resolve(locale, fallback)
            .map(extract_text)
            .unwrap_or_default();

        Self {
            title: record.title.resolve(locale, fallback),
            description,
            short_description: record.short_description.resolve(locale, fallback),
            highlights: display_names(&record.highlights, locale, fallback),
            categories: display_names(&record.categories, locale, fallback),
            audience_tags: display_names(&record.audience, locale, fallback),
            locale: locale.to_string(),
        }
    }

    /// False when title, short description and description are all empty.
    /// Highlights, categories and tags alone are not worth an embedding.
    pub fn has_content(&self) -> bool {
        !(self.title.is_blank() && self.short_description.is_blank() && self.description.is_blank())
    }

    /// Deterministic text rendering, used as the model input and as the
    /// input of the content fingerprint. Empty sections are omitted.
    pub fn canonical_text(&self) -> String {
        let sections = [
            ("Title", self.title.trim().to_string()),
            ("Summary", self.short_description.trim().to_string()),
            ("Description", self.description.trim().to_string()),
            ("Highlights", self.highlights.join(", ")),
            ("Categories", self.categories.join(", ")),
            ("Audience", self.audience_tags.join(", ")),
        ];

        sections
            .iter()
            .filter(|(_, body)| !body.is_empty())
            .map(|(label, body)| format!("{label}: {body}"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Non-blank display names, otherwise unchanged (no trimming or case folding).
fn display_names(entities: &[RelatedEntity], locale: &str, fallback: &str) -> Vec<String> {
    entities
        .iter()
        .map(|entity| entity.display_name(locale, fallback))
        .filter(|name| !name.is_blank())
        .collect()
}
