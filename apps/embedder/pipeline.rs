//! After-save orchestration: gates, per-locale fan-out and failure isolation.

use crate::cache::{CacheDecision, CacheGate, MissReason};
use crate::content::TourRecord;
use crate::document::EmbeddableDocument;
use crate::embeddings::{EmbeddingClient, EmbeddingInput, EmbeddingStore};
use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use utils::tracing::{capture_panic_details, panic_message};

/// Kind of write that triggered the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Payload of the after-save hook.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveEvent {
    #[serde(alias = "doc")]
    pub document: TourRecord,
    pub operation: Operation,
}

/// What happens to stored embeddings when their tour is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Leave rows in place; cleanup is someone else's job.
    #[default]
    Keep,
    /// Delete every locale's row for the tour.
    Purge,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub locales: Vec<String>,
    pub fallback_locale: String,
    pub credentials_present: bool,
    pub parallel_locales: bool,
    pub stale_policy: StalePolicy,
}

/// Reason the whole run was skipped before touching any locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateSkip {
    Deleted,
    Draft,
    MissingCredentials,
    /// The hook body could not be read as a save event.
    InvalidPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LocaleOutcome {
    /// Title, summary and description were all empty.
    EmptyContent,
    /// Stored fingerprint matched; nothing regenerated.
    Unchanged,
    Stored { reason: MissReason },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleReport {
    pub locale: String,
    #[serde(flatten)]
    pub outcome: LocaleOutcome,
}

/// Summary of one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub tour_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<GateSkip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purged: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub locales: Vec<LocaleReport>,
}

impl PipelineReport {
    /// Report for a hook call whose body never became a [`SaveEvent`].
    pub fn rejected(tour_id: i32, error: impl Into<String>) -> Self {
        Self {
            tour_id,
            skipped: Some(GateSkip::InvalidPayload),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    fn count(&self, predicate: impl Fn(&LocaleOutcome) -> bool) -> usize {
        self.locales
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }

    pub fn stored(&self) -> usize {
        self.count(|outcome| matches!(outcome, LocaleOutcome::Stored { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|outcome| matches!(outcome, LocaleOutcome::Unchanged))
    }

    pub fn empty(&self) -> usize {
        self.count(|outcome| matches!(outcome, LocaleOutcome::EmptyContent))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, LocaleOutcome::Failed { .. }))
    }

    pub fn outcome(&self, locale: &str) -> Option<&LocaleOutcome> {
        self.locales
            .iter()
            .find(|report| report.locale == locale)
            .map(|report| &report.outcome)
    }
}

/// Keeps tour embeddings in sync with saved content.
///
/// Nothing in here fails the save that triggered it: every error is caught,
/// logged and folded into the returned report.
pub struct EmbeddingPipeline {
    client: Arc<dyn EmbeddingClient>,
    store: Arc<dyn EmbeddingStore>,
    gate: CacheGate,
    settings: PipelineSettings,
}

impl EmbeddingPipeline {
    pub fn new(
        client: Arc<dyn EmbeddingClient>,
        store: Arc<dyn EmbeddingStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            gate: CacheGate::new(store.clone()),
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Hook entry point. Runs the pipeline and hands the saved record back
    /// untouched.
    pub async fn after_save(&self, event: SaveEvent) -> TourRecord {
        self.run(&event.document, event.operation).await;
        event.document
    }

    #[instrument(skip_all, fields(tour_id = document.id, operation = ?operation))]
    pub async fn run(&self, document: &TourRecord, operation: Operation) -> PipelineReport {
        let mut report = PipelineReport {
            tour_id: document.id,
            ..Default::default()
        };

        if let Some(skip) = self.gate_skip(document, operation) {
            report.skipped = Some(skip);
            if skip == GateSkip::Deleted && self.settings.stale_policy == StalePolicy::Purge {
                report.purged = self.purge(document.id).await;
            }
            return report;
        }

        report.locales = if self.settings.parallel_locales {
            join_all(
                self.settings
                    .locales
                    .iter()
                    .map(|locale| self.process_locale_isolated(document, locale)),
            )
            .await
        } else {
            let mut locales = Vec::with_capacity(self.settings.locales.len());
            for locale in &self.settings.locales {
                locales.push(self.process_locale_isolated(document, locale).await);
            }
            locales
        };

        info!(
            tour_id = document.id,
            stored = report.stored(),
            unchanged = report.unchanged(),
            empty = report.empty(),
            failed = report.failed(),
            "Embedding sync finished"
        );

        report
    }

    fn gate_skip(&self, document: &TourRecord, operation: Operation) -> Option<GateSkip> {
        if operation == Operation::Delete {
            debug!(tour_id = document.id, "Tour deleted, skipping embeddings");
            return Some(GateSkip::Deleted);
        }
        if document.is_draft() {
            debug!(tour_id = document.id, "Tour is a draft, skipping embeddings");
            return Some(GateSkip::Draft);
        }
        if !self.settings.credentials_present {
            warn!(
                tour_id = document.id,
                "Embeddings API key not configured, skipping embeddings"
            );
            return Some(GateSkip::MissingCredentials);
        }
        None
    }

    async fn purge(&self, tour_id: i32) -> Option<u64> {
        match self.store.delete_for_tour(tour_id).await {
            Ok(deleted) => Some(deleted),
            Err(e) => {
                error!(
                    tour_id = tour_id,
                    error = %e,
                    error_chain = ?e,
                    "Failed to purge embeddings of deleted tour"
                );
                None
            }
        }
    }

    /// Runs one locale, turning errors and panics into a `Failed` outcome.
    async fn process_locale_isolated(&self, document: &TourRecord, locale: &str) -> LocaleReport {
        let result = AssertUnwindSafe(self.process_locale(document, locale))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(
                    tour_id = document.id,
                    locale = %locale,
                    error = %e,
                    error_chain = ?e,
                    "Failed to sync tour embedding"
                );
                LocaleOutcome::Failed {
                    error: format!("{e:#}"),
                }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    tour_id = document.id,
                    locale = %locale,
                    panic_message = %message,
                    "Tour embedding sync panicked"
                );
                capture_panic_details(panic);
                LocaleOutcome::Failed { error: message }
            }
        };

        LocaleReport {
            locale: locale.to_string(),
            outcome,
        }
    }

    async fn process_locale(&self, document: &TourRecord, locale: &str) -> Result<LocaleOutcome> {
        let assembled =
            EmbeddableDocument::assemble(document, locale, &self.settings.fallback_locale);
        if !assembled.has_content() {
            debug!(tour_id = document.id, locale = %locale, "No content for locale");
            return Ok(LocaleOutcome::EmptyContent);
        }

        let fingerprint = self.client.fingerprint(&assembled);
        let reason = match self.gate.check(document.id, locale, &fingerprint).await {
            CacheDecision::Hit => return Ok(LocaleOutcome::Unchanged),
            CacheDecision::Miss(reason) => reason,
        };

        let generated = self
            .client
            .generate(&assembled)
            .await
            .context("Failed to generate embedding")?;

        self.store
            .upsert(EmbeddingInput {
                tour_id: document.id,
                locale: locale.to_string(),
                embedding: generated.vector,
                content_hash: generated.fingerprint,
                model_version: self.client.model().to_string(),
            })
            .await?;

        info!(
            tour_id = document.id,
            locale = %locale,
            reason = ?reason,
            "Stored tour embedding"
        );

        Ok(LocaleOutcome::Stored { reason })
    }
}
