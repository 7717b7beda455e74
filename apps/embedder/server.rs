//! HTTP surface: the CMS after-save hook plus health and stats.

use crate::embeddings::EmbeddingStore;
use crate::pipeline::{EmbeddingPipeline, PipelineReport, SaveEvent};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<EmbeddingPipeline>,
    pub store: Arc<dyn EmbeddingStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/stats", get(stats))
        .route("/hooks/tours", post(tour_saved))
        .with_state(state)
}

/// The save has already happened by the time this fires, so the hook always
/// answers 200. Unreadable bodies and per-locale failures show up in the
/// report, never in the status code.
async fn tour_saved(State(state): State<AppState>, body: Bytes) -> Json<PipelineReport> {
    let report = match parse_event(&body) {
        Ok(event) => state.pipeline.run(&event.document, event.operation).await,
        Err(report) => report,
    };
    Json(report)
}

/// Reads a save event from a raw hook body. On failure the returned report
/// carries whatever tour id could still be recovered.
pub fn parse_event(body: &[u8]) -> Result<SaveEvent, PipelineReport> {
    serde_json::from_slice::<SaveEvent>(body).map_err(|e| {
        let tour_id = recover_tour_id(body);
        warn!(
            tour_id = tour_id,
            error = %e,
            "Unreadable tour save event, skipping embeddings"
        );
        PipelineReport::rejected(tour_id, e.to_string())
    })
}

fn recover_tour_id(body: &[u8]) -> i32 {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return 0;
    };
    ["document", "doc"]
        .iter()
        .find_map(|key| value.get(key)?.get("id")?.as_i64())
        .and_then(|id| i32::try_from(id).ok())
        .unwrap_or(0)
}

async fn stats(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let settings = state.pipeline.settings();
    match state.store.count().await {
        Ok(rows) => (
            StatusCode::OK,
            Json(json!({
                "embeddings": rows,
                "locales": settings.locales,
                "fallbackLocale": settings.fallback_locale,
                "credentialsPresent": settings.credentials_present,
            })),
        ),
        Err(e) => {
            error!(error = %e, error_chain = ?e, "Failed to count embeddings");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{e:#}") })),
            )
        }
    }
}
