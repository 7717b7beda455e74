use serde::{Deserialize, Serialize};

/// Output of one embedding call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEmbedding {
    pub vector: Vec<f32>,
    pub fingerprint: String,
}

/// Row written for one (tour, locale) pair.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub tour_id: i32,
    pub locale: String,
    pub embedding: Vec<f32>,
    pub content_hash: String,
    pub model_version: String,
}

/// Build parameters of the HNSW index over the embedding column.
///
/// `m` is the graph connectivity (recall vs. memory), `ef_construction` the
/// candidate list size while building (quality vs. build time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswParams {
    pub m: u32,
    pub ef_construction: u32,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 64,
        }
    }
}
