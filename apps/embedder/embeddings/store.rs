use super::types::{EmbeddingInput, HnswParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, Statement,
};
use tours_db::models::tour_embedding;
use tracing::{info, instrument};
use utils::errors::{
    EMBEDDING_COUNT_FAILED, EMBEDDING_DELETE_FAILED, EMBEDDING_UPSERT_FAILED,
    FINGERPRINT_LOOKUP_FAILED, SCHEMA_SETUP_FAILED,
};

/// Table holding one embedding per (tour, locale).
pub const TABLE_NAME: &str = "tour_embeddings";

/// Persistence boundary for tour embeddings.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Stored content hash for (tour, locale), `None` when nothing is stored.
    async fn stored_fingerprint(&self, tour_id: i32, locale: &str) -> Result<Option<String>>;

    /// Inserts the row, or overwrites vector, hash, model and `updated_at` of
    /// the existing row for the same (tour, locale).
    async fn upsert(&self, input: EmbeddingInput) -> Result<()>;

    /// Removes every locale's row for a tour. Returns the number of rows deleted.
    async fn delete_for_tour(&self, tour_id: i32) -> Result<u64>;

    async fn count(&self) -> Result<u64>;
}

/// Table and index shape of the embedding store.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub dimensions: usize,
    pub default_model: String,
    pub hnsw: HnswParams,
}

/// Store for embedding operations using pgvector
pub struct PgEmbeddingStore {
    db: DatabaseConnection,
    settings: StoreSettings,
}

#[derive(Debug, FromQueryResult)]
struct ColumnDimensionRow {
    dimensions: i32,
}

impl PgEmbeddingStore {
    pub fn new(db: DatabaseConnection, settings: StoreSettings) -> Self {
        Self { db, settings }
    }

    /// Creates the extension, table and indexes if missing, then checks that
    /// an existing table was declared with the configured dimension.
    #[instrument(skip(self), fields(dimensions = self.settings.dimensions))]
    pub async fn ensure_schema(&self) -> Result<()> {
        for sql in schema_statements(&self.settings) {
            self.db
                .execute_unprepared(&sql)
                .await
                .with_context(|| format!("{SCHEMA_SETUP_FAILED}: {sql}"))?;
        }

        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            r#"
            SELECT atttypmod AS dimensions
            FROM pg_attribute
            WHERE attrelid = $1::regclass
              AND attname = 'embedding'
            "#,
            vec![TABLE_NAME.into()],
        );
        let declared = ColumnDimensionRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .context(SCHEMA_SETUP_FAILED)?
            .map(|row| row.dimensions);

        if let Some(declared) = declared {
            anyhow::ensure!(
                declared == self.settings.dimensions as i32,
                "{TABLE_NAME}.embedding is declared as vector({declared}) but the model produces {} dimensions",
                self.settings.dimensions
            );
        }

        info!(table = TABLE_NAME, "Embedding schema ready");
        Ok(())
    }
}

#[async_trait]
impl EmbeddingStore for PgEmbeddingStore {
    async fn stored_fingerprint(&self, tour_id: i32, locale: &str) -> Result<Option<String>> {
        let row = tour_embedding::Entity::find()
            .filter(tour_embedding::Column::TourId.eq(tour_id))
            .filter(tour_embedding::Column::Locale.eq(locale))
            .one(&self.db)
            .await
            .context(FINGERPRINT_LOOKUP_FAILED)?;

        Ok(row.map(|row| row.content_hash))
    }

    async fn upsert(&self, input: EmbeddingInput) -> Result<()> {
        anyhow::ensure!(
            input.embedding.len() == self.settings.dimensions,
            "Embedding dimension mismatch: expected {}, got {}",
            self.settings.dimensions,
            input.embedding.len()
        );

        let now = Utc::now().naive_utc();
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            upsert_sql(),
            vec![
                input.tour_id.into(),
                input.locale.into(),
                format_embedding(&input.embedding).into(),
                input.model_version.into(),
                input.content_hash.into(),
                now.into(),
            ],
        );

        self.db
            .execute(stmt)
            .await
            .context(EMBEDDING_UPSERT_FAILED)?;

        Ok(())
    }

    async fn delete_for_tour(&self, tour_id: i32) -> Result<u64> {
        let result = tour_embedding::Entity::delete_many()
            .filter(tour_embedding::Column::TourId.eq(tour_id))
            .exec(&self.db)
            .await
            .context(EMBEDDING_DELETE_FAILED)?;

        if result.rows_affected > 0 {
            info!(
                tour_id = tour_id,
                deleted = result.rows_affected,
                "Deleted tour embeddings"
            );
        }

        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        tour_embedding::Entity::find()
            .count(&self.db)
            .await
            .context(EMBEDDING_COUNT_FAILED)
    }
}

/// DDL for the embedding table and its indexes, in execution order. Every
/// statement is idempotent.
pub fn schema_statements(settings: &StoreSettings) -> Vec<String> {
    let HnswParams { m, ef_construction } = settings.hnsw;
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                id BIGSERIAL PRIMARY KEY,
                tour_id INTEGER NOT NULL,
                locale TEXT NOT NULL,
                embedding VECTOR({dims}) NOT NULL,
                embedding_model TEXT NOT NULL DEFAULT {model},
                content_hash TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT now(),
                updated_at TIMESTAMP NOT NULL DEFAULT now(),
                CONSTRAINT {TABLE_NAME}_tour_id_locale_key UNIQUE (tour_id, locale)
            )
            "#,
            dims = settings.dimensions,
            model = quote_literal(&settings.default_model),
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {TABLE_NAME}_embedding_hnsw_idx ON {TABLE_NAME} \
             USING hnsw (embedding vector_cosine_ops) WITH (m = {m}, ef_construction = {ef_construction})"
        ),
        format!("CREATE INDEX IF NOT EXISTS {TABLE_NAME}_locale_idx ON {TABLE_NAME} (locale)"),
        format!(
            "CREATE INDEX IF NOT EXISTS {TABLE_NAME}_tour_id_content_hash_idx \
             ON {TABLE_NAME} (tour_id, content_hash)"
        ),
    ]
}

fn upsert_sql() -> String {
    format!(
        r#"
        INSERT INTO {TABLE_NAME} (
            tour_id, locale, embedding, embedding_model, content_hash, created_at, updated_at
        )
        VALUES ($1, $2, $3::vector, $4, $5, $6, $6)
        ON CONFLICT (tour_id, locale)
        DO UPDATE SET
            embedding = EXCLUDED.embedding,
            embedding_model = EXCLUDED.embedding_model,
            content_hash = EXCLUDED.content_hash,
            updated_at = EXCLUDED.updated_at
        "#
    )
}

/// Format embedding vector as a pgvector literal
fn format_embedding(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

/// Quotes a Postgres string literal, doubling embedded quotes.
fn quote_literal(input: &str) -> String {
    format!("'{}'", input.replace('\'', "''"))
}
