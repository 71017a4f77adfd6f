//! Read-side history queries

use sqlx::SqlitePool;

use crate::error::Result;

/// One durable play, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackHistoryRow {
    pub id: i64,
    pub url: String,
    pub musicbrainz_id: Option<String>,
    /// Epoch seconds
    pub played: Option<i64>,
    pub rating: Option<i64>,
    pub url_checksum: String,
    pub client_id: Option<String>,
}

/// Most recent plays, newest first.
pub async fn recent_plays(pool: &SqlitePool, limit: u32) -> Result<Vec<TrackHistoryRow>> {
    let rows = sqlx::query_as::<_, (i64, String, Option<String>, Option<i64>, Option<i64>, String, Option<String>)>(
        r#"
        SELECT id, url, musicbrainz_id, played, rating, url_checksum, client_id
        FROM track_history
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TrackHistoryRow {
            id: row.0,
            url: row.1,
            musicbrainz_id: row.2,
            played: row.3,
            rating: row.4,
            url_checksum: row.5,
            client_id: row.6,
        })
        .collect())
}

/// Number of recorded plays for one track url.
pub async fn play_count_for_url(pool: &SqlitePool, url: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM track_history WHERE url = ?")
        .bind(url)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
