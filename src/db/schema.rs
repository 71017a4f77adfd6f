//! History table bootstrap
//!
//! Ensures the `track_history` table, its upgrade column and its lookup
//! indexes exist before the first write. The result is memoized: bootstrap
//! runs at most once per process, and a failed bootstrap disables all
//! subsequent writes for the process lifetime rather than retrying into the
//! same failure.

use sqlx::{Row, SqlitePool};
use tracing::{error, info, warn};

use crate::error::{Error, Result};

const HISTORY_TABLE: &str = "track_history";

/// Memoized readiness of the history schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Bootstrap not attempted yet; runs lazily on first write
    Unknown,
    /// Table, columns and indexes verified
    Ready,
    /// Bootstrap failed; writes stay disabled until restart
    Failed,
}

/// Idempotent, once-per-process schema bootstrap gating all writes.
#[derive(Debug)]
pub struct SchemaManager {
    state: SchemaState,
}

impl SchemaManager {
    pub fn new() -> Self {
        Self {
            state: SchemaState::Unknown,
        }
    }

    pub fn state(&self) -> SchemaState {
        self.state
    }

    /// Make sure the schema is usable, bootstrapping on first call.
    /// Returns false when writes must not be attempted.
    pub async fn ensure_ready(&mut self, pool: &SqlitePool) -> bool {
        match self.state {
            SchemaState::Ready => true,
            SchemaState::Failed => false,
            SchemaState::Unknown => match bootstrap(pool).await {
                Ok(()) => {
                    self.state = SchemaState::Ready;
                    true
                }
                Err(e) => {
                    error!(error = %e, "history schema bootstrap failed; recording disabled");
                    self.state = SchemaState::Failed;
                    false
                }
            },
        }
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Create or upgrade the history table and its indexes.
async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    // Reachability probe; a closed or wrong-kind store fails here instead of
    // half-way through DDL
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::Schema(format!("history store unreachable: {}", e)))?;

    info!("Checking {} table", HISTORY_TABLE);

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS track_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            musicbrainz_id VARCHAR(40),
            played INTEGER,
            rating INTEGER,
            url_checksum CHAR(32) NOT NULL DEFAULT '0',
            client_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Tables created by earlier releases predate the client_id column
    if !has_column(pool, HISTORY_TABLE, "client_id").await? {
        warn!("{} table predates client_id - adding column", HISTORY_TABLE);
        sqlx::query("ALTER TABLE track_history ADD COLUMN client_id TEXT")
            .execute(pool)
            .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS track_history_url ON track_history (url)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS track_history_musicbrainz_id ON track_history (musicbrainz_id)",
    )
    .execute(pool)
    .await?;

    info!("{} schema ready", HISTORY_TABLE);
    Ok(())
}

/// Check for a column via PRAGMA table_info.
async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let query = format!("PRAGMA table_info({})", table);
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(rows
        .iter()
        .any(|row| row.get::<String, _>("name") == column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn index_exists(pool: &SqlitePool, name: &str) -> bool {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='index' AND name = ?)",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_creates_table_and_indexes() {
        let pool = setup_test_db().await;
        let mut schema = SchemaManager::new();

        assert_eq!(schema.state(), SchemaState::Unknown);
        assert!(schema.ensure_ready(&pool).await);
        assert_eq!(schema.state(), SchemaState::Ready);

        assert!(has_column(&pool, "track_history", "url_checksum").await.unwrap());
        assert!(has_column(&pool, "track_history", "client_id").await.unwrap());
        assert!(index_exists(&pool, "track_history_url").await);
        assert!(index_exists(&pool, "track_history_musicbrainz_id").await);
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let pool = setup_test_db().await;

        let mut first = SchemaManager::new();
        assert!(first.ensure_ready(&pool).await);

        // A second manager against the same store bootstraps cleanly too
        let mut second = SchemaManager::new();
        assert!(second.ensure_ready(&pool).await);
        assert!(second.ensure_ready(&pool).await);
    }

    #[tokio::test]
    async fn test_legacy_table_gains_client_id_column() {
        let pool = setup_test_db().await;

        // Table shape from before the client_id column existed
        sqlx::query(
            r#"
            CREATE TABLE track_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                musicbrainz_id VARCHAR(40),
                played INTEGER,
                rating INTEGER,
                url_checksum CHAR(32) NOT NULL DEFAULT '0'
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let mut schema = SchemaManager::new();
        assert!(schema.ensure_ready(&pool).await);
        assert!(has_column(&pool, "track_history", "client_id").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_a_schema_error() {
        let pool = setup_test_db().await;
        pool.close().await;

        let err = bootstrap(&pool).await.unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_permanently() {
        let pool = setup_test_db().await;
        pool.close().await;

        let mut schema = SchemaManager::new();
        assert!(!schema.ensure_ready(&pool).await);
        assert_eq!(schema.state(), SchemaState::Failed);

        // Memoized: no second bootstrap attempt flips the state back
        assert!(!schema.ensure_ready(&pool).await);
        assert_eq!(schema.state(), SchemaState::Failed);
    }
}
