use super::types::GeneratedEmbedding;
use crate::document::EmbeddableDocument;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Boundary to the external embedding model.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Identifier of the model producing the vectors.
    fn model(&self) -> &str;

    /// Content fingerprint of `document`. Pure: identical documents yield
    /// identical fingerprints for the same model.
    fn fingerprint(&self, document: &EmbeddableDocument) -> String {
        hash_content(&format!("{}\n{}", self.model(), document.canonical_text()))
    }

    /// Embeds `document`, returning the vector along with the fingerprint of
    /// the input it was computed from.
    async fn generate(&self, document: &EmbeddableDocument) -> Result<GeneratedEmbedding>;
}

/// Compute SHA256 hash of content for change detection
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embeddings request failed ({status}): {body}")]
    Status { status: StatusCode, body: String },
    #[error("embeddings response contained no vectors")]
    EmptyResponse,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Builds the client. Without an API key requests go out unauthenticated,
    /// which is what local OpenAI-compatible servers expect.
    pub fn new(
        api_key: Option<&str>,
        base_url: &str,
        model: String,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        anyhow::ensure!(dimensions > 0, "embedding dimension must be positive");

        let mut headers = HeaderMap::new();
        if let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .context("invalid embeddings API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build embeddings HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_text(&self, input: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input,
            dimensions: self.dimensions,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Failed to send embeddings request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbeddingError::Status { status, body }.into());
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embeddings response")?;
        parsed.data.sort_by_key(|entry| entry.index);
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or(EmbeddingError::EmptyResponse)?;

        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            }
            .into());
        }

        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, document: &EmbeddableDocument) -> Result<GeneratedEmbedding> {
        let text = document.canonical_text();
        debug!(locale = %document.locale, chars = text.len(), "Requesting embedding");
        let vector = self.embed_text(&text).await?;
        Ok(GeneratedEmbedding {
            vector,
            fingerprint: self.fingerprint(document),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
