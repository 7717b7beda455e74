//! Content-addressed gate in front of embedding regeneration.

use crate::embeddings::EmbeddingStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a fingerprint comparison asked for regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// No row stored for (tour, locale) yet.
    Missing,
    /// Stored fingerprint differs from the fresh one.
    Changed,
    /// The lookup itself failed; regenerate rather than risk skipping real work.
    LookupFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Hit,
    Miss(MissReason),
}

impl CacheDecision {
    pub fn needs_regeneration(self) -> bool {
        matches!(self, CacheDecision::Miss(_))
    }
}

pub struct CacheGate {
    store: Arc<dyn EmbeddingStore>,
}

impl CacheGate {
    pub fn new(store: Arc<dyn EmbeddingStore>) -> Self {
        Self { store }
    }

    /// Compares the stored fingerprint for (tour, locale) with `fingerprint`.
    /// Only an exact match is a hit; lookup errors fail open.
    pub async fn check(&self, tour_id: i32, locale: &str, fingerprint: &str) -> CacheDecision {
        match self.store.stored_fingerprint(tour_id, locale).await {
            Ok(Some(stored)) if stored == fingerprint => {
                debug!(tour_id = tour_id, locale = %locale, "Fingerprint unchanged");
                CacheDecision::Hit
            }
            Ok(Some(_)) => CacheDecision::Miss(MissReason::Changed),
            Ok(None) => CacheDecision::Miss(MissReason::Missing),
            Err(e) => {
                warn!(
                    tour_id = tour_id,
                    locale = %locale,
                    error = %e,
                    error_chain = ?e,
                    "Fingerprint lookup failed, regenerating"
                );
                CacheDecision::Miss(MissReason::LookupFailed)
            }
        }
    }

    pub async fn should_regenerate(&self, tour_id: i32, locale: &str, fingerprint: &str) -> bool {
        self.check(tour_id, locale, fingerprint)
            .await
            .needs_regeneration()
    }
}
