//! # playlog
//!
//! Durable play-history recorder for networked audio players.
//!
//! **Purpose:** Turn a noisy stream of "new song" notifications into exactly
//! one `track_history` row per genuine play, even when the backing store is
//! locked, mid-rescan, or briefly gone.
//!
//! **Architecture:** A single tracker task owns all state. Host
//! notifications arrive through the [`PlayRecorder`] handle; the host itself
//! is queried back through the [`PlayerHost`] trait. A play counts once
//! playback survives a configurable percentage of the track duration, timed
//! by single-shot check timers; confirmed plays that cannot be written are
//! parked in a bounded queue and retried.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod host;
pub mod queue;
pub mod record;
pub mod threshold;
pub mod tracker;

pub use config::RecorderConfig;
pub use error::{Error, Result};
pub use events::RecorderEvent;
pub use host::{PlayerHost, StreamMetadata, TrackMetadata};
pub use record::{url_checksum, PendingRecord};
pub use tracker::PlayRecorder;
