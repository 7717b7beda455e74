use crate::embeddings::{HnswParams, StoreSettings};
use crate::pipeline::{PipelineSettings, StalePolicy};
use serde::Deserialize;
use std::{env, fs};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EmbedderConfig {
    pub locales: LocaleConfig,
    pub embedding: EmbeddingConfig,
    pub index: HnswParams,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
    /// Credential for the embeddings API. Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub supported: Vec<String>,
    pub fallback: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            supported: vec!["sv".to_string(), "en".to_string(), "de".to_string()],
            fallback: "sv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parallel_locales: bool,
    pub stale_policy: StalePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel_locales: true,
            stale_policy: StalePolicy::Keep,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl EmbedderConfig {
    pub fn credentials_present(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            locales: self.locales.supported.clone(),
            fallback_locale: self.locales.fallback.clone(),
            credentials_present: self.credentials_present(),
            parallel_locales: self.pipeline.parallel_locales,
            stale_policy: self.pipeline.stale_policy,
        }
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            dimensions: self.embedding.dimensions,
            default_model: self.embedding.model.clone(),
            hnsw: self.index,
        }
    }
}

/// Loads the YAML config file (falling back to defaults), then applies
/// environment overrides.
pub fn load() -> EmbedderConfig {
    let path = env::var("EMBEDDER_CONFIG_PATH").unwrap_or_else(|_| "embedder.yaml".to_string());
    let mut config = match fs::read_to_string(&path) {
        Ok(contents) => parse(&contents).unwrap_or_else(|err| {
            warn!(error = %err, path = %path, "Failed to parse embedder config, using defaults");
            EmbedderConfig::default()
        }),
        Err(err) => {
            warn!(error = %err, path = %path, "Embedder config not found, using defaults");
            EmbedderConfig::default()
        }
    };

    apply_env_overrides(&mut config);
    normalize(&mut config);

    info!(
        locales = ?config.locales.supported,
        fallback_locale = %config.locales.fallback,
        model = %config.embedding.model,
        dimensions = config.embedding.dimensions,
        hnsw_m = config.index.m,
        hnsw_ef_construction = config.index.ef_construction,
        parallel_locales = config.pipeline.parallel_locales,
        stale_policy = ?config.pipeline.stale_policy,
        credentials_present = config.credentials_present(),
        "Embedder config loaded"
    );

    config
}

pub fn parse(contents: &str) -> Result<EmbedderConfig, serde_yaml::Error> {
    serde_yaml::from_str::<EmbedderConfig>(contents)
}

fn apply_env_overrides(config: &mut EmbedderConfig) {
    if let Ok(value) = env::var("EMBEDDER_LOCALES") {
        config.locales.supported = value.split(',').map(|locale| locale.to_string()).collect();
    }

    if let Ok(value) = env::var("EMBEDDER_FALLBACK_LOCALE") {
        config.locales.fallback = value;
    }

    if let Ok(value) = env::var("EMBEDDING_MODEL") {
        config.embedding.model = value;
    }

    if let Ok(value) = env::var("OPENAI_BASE_URL") {
        config.embedding.base_url = value;
    }

    if let Ok(value) = env::var("EMBEDDING_DIMENSIONS") {
        match value.parse::<usize>() {
            Ok(dimensions) => config.embedding.dimensions = dimensions,
            Err(err) => {
                warn!(error = %err, "Failed to parse EMBEDDING_DIMENSIONS override");
            }
        }
    }

    if let Ok(value) = env::var("EMBEDDER_PARALLEL_LOCALES") {
        match value.parse::<bool>() {
            Ok(parallel) => config.pipeline.parallel_locales = parallel,
            Err(err) => {
                warn!(error = %err, "Failed to parse EMBEDDER_PARALLEL_LOCALES override");
            }
        }
    }

    if let Ok(value) = env::var("EMBEDDER_STALE_POLICY") {
        match serde_yaml::from_str::<StalePolicy>(&value) {
            Ok(policy) => config.pipeline.stale_policy = policy,
            Err(err) => {
                warn!(error = %err, "Failed to parse EMBEDDER_STALE_POLICY override");
            }
        }
    }

    if let Ok(value) = env::var("EMBEDDER_BIND_ADDRESS") {
        config.server.bind_address = value;
    }

    config.api_key = env::var("OPENAI_API_KEY")
        .or_else(|_| env::var("EMBEDDER_API_KEY"))
        .ok()
        .filter(|key| !key.trim().is_empty());
}

/// Trims locale codes, drops empties and duplicates (keeping the first
/// occurrence), and makes sure a fallback locale is set.
fn normalize(config: &mut EmbedderConfig) {
    let mut supported: Vec<String> = Vec::with_capacity(config.locales.supported.len());
    for locale in &config.locales.supported {
        let locale = locale.trim();
        if !locale.is_empty() && !supported.iter().any(|seen| seen == locale) {
            supported.push(locale.to_string());
        }
    }
    if supported.is_empty() {
        warn!("No supported locales configured, using defaults");
        supported = LocaleConfig::default().supported;
    }
    config.locales.supported = supported;

    config.locales.fallback = config.locales.fallback.trim().to_string();
    if config.locales.fallback.is_empty() {
        config.locales.fallback = config.locales.supported[0].clone();
    }
}
