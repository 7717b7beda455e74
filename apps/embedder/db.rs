use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tracing::instrument;
use utils::errors::{DATABASE_CONNECTION_FAILED, DATABASE_URL_NOT_SET};

pub static DB: OnceCell<DatabaseConnection> = OnceCell::new();

/// Opens the connection pool from `DATABASE_URL` and stores it in [`DB`].
#[instrument]
pub async fn initialize_db() -> Result<()> {
    let database_url = std::env::var("DATABASE_URL").context(DATABASE_URL_NOT_SET)?;

    let mut opt = sea_orm::ConnectOptions::new(database_url);
    opt.max_connections(10)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(15))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(5 * 60))
        .max_lifetime(Duration::from_secs(30 * 60))
        .sqlx_logging(false);

    let db = sea_orm::Database::connect(opt)
        .await
        .context(DATABASE_CONNECTION_FAILED)?;

    DB.set(db)
        .map_err(|_| anyhow::anyhow!("Failed to set database connection"))
}

/// Global connection, or an error if [`initialize_db`] has not run.
pub fn try_db() -> Result<&'static DatabaseConnection> {
    DB.get()
        .ok_or_else(|| anyhow::anyhow!("Database connection not initialized"))
}
