//! Host collaborator interface
//!
//! The recorder never talks to the player runtime directly; everything it
//! needs from the host (metadata, playback position, playlist state, sync
//! topology, maintenance status) goes through the `PlayerHost` trait. Hosts
//! implement it over whatever event/notification facility they have; tests
//! implement it with in-memory maps.

use uuid::Uuid;

/// Track metadata as resolved by the host's primary provider.
///
/// Everything is optional: live streams frequently have no duration, and a
/// missing field never fails a record attempt.
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub duration_secs: Option<f64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// True for remote streams (radio, on-demand services)
    pub remote: bool,
    pub musicbrainz_id: Option<String>,
    /// Host rating scale, stored verbatim
    pub rating: Option<i64>,
}

/// Refinement returned by a stream-specific metadata lookup for remote
/// tracks. Fields override the primary metadata only when present.
#[derive(Debug, Clone, Default)]
pub struct StreamMetadata {
    pub duration_secs: Option<f64>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl TrackMetadata {
    /// Merge a stream-specific lookup result over the primary values.
    pub fn refine(&mut self, stream: StreamMetadata) {
        if stream.duration_secs.is_some() {
            self.duration_secs = stream.duration_secs;
        }
        if stream.title.is_some() {
            self.title = stream.title;
        }
        if stream.artist.is_some() {
            self.artist = stream.artist;
        }
    }
}

/// Everything the recorder asks of the player runtime.
///
/// A "unit" is one playback unit: a single player, or a synced group
/// represented by its master. All queries are cheap in-memory reads on the
/// host side; none of them may block.
pub trait PlayerHost: Send + Sync {
    /// Resolve metadata for a track on a unit.
    fn resolve_metadata(&self, unit: Uuid, url: &str) -> TrackMetadata;

    /// Stream-specific secondary lookup for remote tracks. `None` when the
    /// host has no refinement to offer.
    fn resolve_stream_metadata(&self, unit: Uuid, url: &str) -> Option<StreamMetadata>;

    /// Url the unit is playing right now, `None` when the unit is gone.
    fn current_track(&self, unit: Uuid) -> Option<String>;

    /// Seconds into the current track, `None` when the unit is gone.
    fn playback_position(&self, unit: Uuid) -> Option<f64>;

    /// Opaque token identifying the current playlist instance on this unit.
    /// Changes whenever the playlist position changes, so a skip-and-return
    /// or a genuine repeat of the same track yields a fresh token. Scoped
    /// per-unit; tokens from different units are never compared.
    fn playlist_epoch(&self, unit: Uuid) -> Option<u64>;

    /// True while a storage-wide scan/maintenance job is running.
    fn maintenance_running(&self) -> bool;

    /// True when this unit should report plays: unsynced units always,
    /// synced units only for the group master (followers would duplicate
    /// every row).
    fn is_sync_master(&self, unit: Uuid) -> bool;

    /// Stable identity of the unit as stored in the `client_id` column.
    fn client_id(&self, unit: Uuid) -> String;
}
