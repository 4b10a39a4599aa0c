//! Postgres pool backing the node static data store.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::DbError;

pub type DbPool = PgPool;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect to `database_url` with at most `max_connections` connections.
///
/// The trigger only reads and writes one row per lifecycle call, so callers
/// normally pass a small ceiling.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, DbError> {
    info!(max_connections, "connecting to static data database");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the embedded migrations (`node_static_data` table).
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("static data schema is up to date");
    Ok(())
}
