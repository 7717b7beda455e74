#![warn(unused_extern_crates)]
use anyhow::{Context, Result};
use dotenv::dotenv;
use embedder::{
    config::{self, EmbedderConfig},
    db::{initialize_db, try_db},
    embeddings::{OpenAiEmbedder, PgEmbeddingStore},
    pipeline::EmbeddingPipeline,
    server::{self, AppState},
};
use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};
use tracing::{error, info};
use utils::{errors::HOOK_BIND_ADDRESS_INVALID, tracing::run_with_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    run_with_tracing(run).await
}

async fn run() -> Result<()> {
    info!("Embedder service starting up");
    let config = config::load();

    info!("Initializing database connection...");
    initialize_db().await?;
    info!("Database connection established");

    let store = Arc::new(PgEmbeddingStore::new(
        try_db()?.clone(),
        config.store_settings(),
    ));
    store.ensure_schema().await?;

    let pipeline = build_pipeline(&config, store.clone())?;
    let state = AppState {
        pipeline: Arc::new(pipeline),
        store,
    };

    let app = server::router(state);

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .context(HOOK_BIND_ADDRESS_INVALID)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(address = %addr, "Listening for tour save hooks");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Hook server error")?;

    info!("Embedder service stopped");
    Ok(())
}

fn build_pipeline(
    config: &EmbedderConfig,
    store: Arc<PgEmbeddingStore>,
) -> Result<EmbeddingPipeline> {
    let client = OpenAiEmbedder::new(
        config.api_key.as_deref(),
        &config.embedding.base_url,
        config.embedding.model.clone(),
        config.embedding.dimensions,
        Duration::from_secs(config.embedding.timeout_secs),
    )?;

    info!(
        model = %config.embedding.model,
        dimensions = client.dimensions(),
        base_url = %config.embedding.base_url,
        "Embedding client ready"
    );

    Ok(EmbeddingPipeline::new(
        Arc::new(client),
        store,
        config.pipeline_settings(),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
