//! Pending play records
//!
//! A `PendingRecord` is the row-shaped snapshot of a confirmed play, built
//! once the tracker decides a play happened and immutable afterwards. It is
//! either written straight to the store or parked in the write queue until
//! the store accepts it.

/// One play, ready to be written to `track_history`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub url: String,
    /// md5 hex digest of `url`, a store-independent secondary lookup key
    pub url_checksum: String,
    pub musicbrainz_id: Option<String>,
    /// Wall-clock time of the play, epoch seconds
    pub played_at: i64,
    pub rating: Option<i64>,
    pub client_id: String,
}

impl PendingRecord {
    pub fn new(
        url: impl Into<String>,
        musicbrainz_id: Option<String>,
        rating: Option<i64>,
        client_id: impl Into<String>,
        played_at: i64,
    ) -> Self {
        let url = url.into();
        let url_checksum = url_checksum(&url);
        Self {
            url,
            url_checksum,
            musicbrainz_id,
            played_at,
            rating,
            client_id: client_id.into(),
        }
    }
}

/// Deterministic 32-character content hash of a track url.
pub fn url_checksum(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}
