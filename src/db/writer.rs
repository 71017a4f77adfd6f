//! Play record write path
//!
//! One INSERT, but with the failure taxonomy the retry logic needs: a locked
//! store is worth retrying, anything else is not, and an unbootstrappable
//! schema silences the write path entirely.

use sqlx::SqlitePool;

use crate::db::schema::{SchemaManager, SchemaState};
use crate::record::PendingRecord;

/// Outcome of a single write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Row is durable
    Recorded,
    /// Store is locked/busy; the record is worth retrying later
    TransientBusy,
    /// Deterministic failure; retrying would loop forever on a poison row
    PermanentFailure(String),
    /// Schema bootstrap failed for this process; writes are disabled
    SchemaUnavailable,
}

/// Store adapter owning the history INSERT and its schema gate.
#[derive(Debug)]
pub struct TrackWriter {
    pool: SqlitePool,
    schema: SchemaManager,
}

impl TrackWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            schema: SchemaManager::new(),
        }
    }

    /// Memoized schema readiness, so callers can stop queueing once writes
    /// are permanently disabled.
    pub fn schema_state(&self) -> SchemaState {
        self.schema.state()
    }

    /// Write one play record, bootstrapping the schema on first use.
    pub async fn insert_play(&mut self, record: &PendingRecord) -> WriteOutcome {
        if !self.schema.ensure_ready(&self.pool).await {
            return WriteOutcome::SchemaUnavailable;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO track_history (url, url_checksum, musicbrainz_id, played, rating, client_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.url)
        .bind(&record.url_checksum)
        .bind(&record.musicbrainz_id)
        .bind(record.played_at)
        .bind(record.rating)
        .bind(&record.client_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => WriteOutcome::Recorded,
            Err(sqlx::Error::Database(db_err)) if is_transient_busy(db_err.message()) => {
                WriteOutcome::TransientBusy
            }
            Err(e) => WriteOutcome::PermanentFailure(e.to_string()),
        }
    }
}

/// Lock-contention classification, by message like SQLite reports it
/// (SQLITE_BUSY: "database is locked", SQLITE_LOCKED: "database table is
/// locked").
pub(crate) fn is_transient_busy(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("locked") || message.contains("busy")
}
