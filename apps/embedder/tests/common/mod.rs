#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use embedder::{
    document::EmbeddableDocument,
    embeddings::{EmbeddingClient, EmbeddingInput, EmbeddingStore, GeneratedEmbedding},
};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

pub const MODEL: &str = "test-embedding-model";

#[derive(Default)]
pub struct CountingClient {
    calls: Mutex<Vec<String>>,
    fail_locale: Option<&'static str>,
    panic_locale: Option<&'static str>,
}

impl CountingClient {
    pub fn failing_on(locale: &'static str) -> Self {
        Self {
            fail_locale: Some(locale),
            ..Default::default()
        }
    }

    pub fn panicking_on(locale: &'static str) -> Self {
        Self {
            panic_locale: Some(locale),
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, locale: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == locale)
            .count()
    }
}

#[async_trait]
impl EmbeddingClient for CountingClient {
    fn model(&self) -> &str {
        MODEL
    }

    async fn generate(&self, document: &EmbeddableDocument) -> Result<GeneratedEmbedding> {
        self.calls.lock().unwrap().push(document.locale.clone());
        if self.fail_locale == Some(document.locale.as_str()) {
            return Err(anyhow!("embedding service unavailable"));
        }
        if self.panic_locale == Some(document.locale.as_str()) {
            panic!("tokenizer blew up");
        }
        let text = document.canonical_text();
        Ok(GeneratedEmbedding {
            vector: vec![text.len() as f32, 0.5, 1.0],
            fingerprint: self.fingerprint(document),
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub content_hash: String,
    pub model: String,
}

#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<HashMap<(i32, String), StoredRow>>,
    pub upserts: AtomicUsize,
    pub fail_lookups: AtomicBool,
}

impl MemoryStore {
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn hash_of(&self, tour_id: i32, locale: &str) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .get(&(tour_id, locale.to_string()))
            .map(|row| row.content_hash.clone())
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    async fn stored_fingerprint(&self, tour_id: i32, locale: &str) -> Result<Option<String>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset"));
        }
        Ok(self.hash_of(tour_id, locale))
    }

    async fn upsert(&self, input: EmbeddingInput) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().unwrap().insert(
            (input.tour_id, input.locale),
            StoredRow {
                content_hash: input.content_hash,
                model: input.model_version,
            },
        );
        Ok(())
    }

    async fn delete_for_tour(&self, tour_id: i32) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(id, _), _| *id != tour_id);
        Ok((before - rows.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}
