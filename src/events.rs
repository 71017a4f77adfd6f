//! Inbound event surface
//!
//! The host feeds the recorder through exactly two notifications. They are
//! delivered over a single mpsc channel into the tracker task, so event
//! handling, timer fires and queue flushes never overlap.

use uuid::Uuid;

/// Notifications consumed from the host's playback-event bus.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// A unit began playing a track.
    ///
    /// Remote streams may fire this spuriously when only the station title
    /// changed; those carry `title_index` and no usable duration, and are
    /// ignored by the tracker.
    NewSong {
        unit: Uuid,
        url: String,
        title_index: Option<u32>,
    },

    /// A storage-wide rescan/maintenance job finished; pending records can
    /// be flushed to the store again.
    MaintenanceComplete,
}
