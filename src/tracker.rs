//! Play tracking state machine
//!
//! One tokio task owns all mutable recorder state; host notifications, timer
//! fires and queue flushes arrive as messages on a single mpsc channel, so
//! transitions never overlap and no locking is needed around the per-unit
//! sessions or the write queue.
//!
//! Per-unit timers are single-shot tasks posting `CheckPlayed` back into the
//! channel. Every re-arm first aborts the previous timer and bumps an arm
//! token; a fire carrying a stale token is ignored, so at most one live
//! timer per unit can ever reach the record path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RecorderConfig;
use crate::db::schema::SchemaState;
use crate::db::writer::{TrackWriter, WriteOutcome};
use crate::events::RecorderEvent;
use crate::host::PlayerHost;
use crate::queue::WriteQueue;
use crate::record::PendingRecord;
use crate::threshold::played_threshold_secs;

/// Messages dispatched to the tracker task.
enum TrackerMessage {
    Event(RecorderEvent),
    /// Armed play timer fired
    CheckPlayed { unit: Uuid, token: u64 },
    /// Debounced queue-flush timer fired
    FlushQueue,
}

/// Snapshot of the play being watched on one unit.
#[derive(Debug, Clone)]
struct PlaySession {
    started_at: DateTime<Utc>,
    tracked_url: String,
    /// Playlist-instance token captured at arm time; a skip-and-return or a
    /// genuine repeat yields a different one
    playlist_epoch: u64,
    threshold_secs: u64,
    musicbrainz_id: Option<String>,
    rating: Option<i64>,
}

/// Per-unit tracking state. Lives for the process; sessions are overwritten
/// by each new song, the dedup key survives them.
#[derive(Default)]
struct UnitState {
    session: Option<PlaySession>,
    timer: Option<JoinHandle<()>>,
    arm_token: u64,
    /// `(playlist_epoch, url)` of the last play recorded or queued
    last_recorded: Option<(u64, String)>,
}

/// Handle through which the host delivers playback notifications.
///
/// Cheap to clone; sends never block. Dropping every handle shuts the
/// tracker task down.
#[derive(Clone)]
pub struct PlayRecorder {
    tx: mpsc::UnboundedSender<TrackerMessage>,
}

impl PlayRecorder {
    /// Spawn the tracker task against a host and an open store pool.
    pub fn spawn(config: RecorderConfig, host: Arc<dyn PlayerHost>, pool: SqlitePool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = PlayTracker {
            config,
            host,
            writer: TrackWriter::new(pool),
            units: HashMap::new(),
            queue: WriteQueue::new(),
            tx: tx.downgrade(),
            flush_scheduled: false,
        };
        tokio::spawn(tracker.run(rx));
        Self { tx }
    }

    /// A unit began playing a track. `title_index` is set by hosts that
    /// re-announce the current stream when only its title metadata changed.
    pub fn on_new_song(&self, unit: Uuid, url: impl Into<String>, title_index: Option<u32>) {
        let _ = self.tx.send(TrackerMessage::Event(RecorderEvent::NewSong {
            unit,
            url: url.into(),
            title_index,
        }));
    }

    /// A storage-wide maintenance/rescan job finished.
    pub fn on_maintenance_complete(&self) {
        let _ = self
            .tx
            .send(TrackerMessage::Event(RecorderEvent::MaintenanceComplete));
    }

    /// Deliver an already-constructed event.
    pub fn handle_event(&self, event: RecorderEvent) {
        let _ = self.tx.send(TrackerMessage::Event(event));
    }
}

struct PlayTracker {
    config: RecorderConfig,
    host: Arc<dyn PlayerHost>,
    writer: TrackWriter,
    units: HashMap<Uuid, UnitState>,
    queue: WriteQueue,
    tx: mpsc::WeakUnboundedSender<TrackerMessage>,
    /// Debounce: at most one flush timer outstanding
    flush_scheduled: bool,
}

impl PlayTracker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<TrackerMessage>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                TrackerMessage::Event(RecorderEvent::NewSong {
                    unit,
                    url,
                    title_index,
                }) => self.handle_new_song(unit, url, title_index).await,
                TrackerMessage::Event(RecorderEvent::MaintenanceComplete) => {
                    info!("maintenance complete; flushing queued plays");
                    self.flush_queue().await;
                }
                TrackerMessage::CheckPlayed { unit, token } => {
                    self.check_played(unit, token).await
                }
                TrackerMessage::FlushQueue => {
                    self.flush_scheduled = false;
                    self.flush_queue().await;
                }
            }
        }

        for state in self.units.values_mut() {
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }
    }

    async fn handle_new_song(&mut self, unit: Uuid, url: String, title_index: Option<u32>) {
        if !self.config.enabled {
            return;
        }

        let mut meta = self.host.resolve_metadata(unit, &url);

        // Remote streams re-announce themselves when the station title
        // changes; no duration plus a title index means nothing new started
        let duration_known = meta.duration_secs.map_or(false, |d| d > 0.0);
        if !duration_known && title_index.is_some() {
            debug!(%unit, %url, "station title update; not a new play");
            return;
        }
        if let Some(d) = meta.duration_secs {
            if d > 0.0
                && self.config.min_track_seconds > 0
                && (d as u64) < self.config.min_track_seconds
            {
                debug!(%unit, %url, duration = d, "track below minimum duration");
                return;
            }
        }
        if meta.remote && !self.config.include_remote {
            debug!(%unit, %url, "remote track recording disabled");
            return;
        }
        if !self.host.is_sync_master(unit) {
            debug!(%unit, "sync follower; the group master records");
            return;
        }

        // A fresh song always invalidates whatever timer was pending for
        // this unit; two live timers would double-record
        let token = {
            let state = self.units.entry(unit).or_default();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.arm_token = state.arm_token.wrapping_add(1);
            state.arm_token
        };

        if meta.remote {
            if let Some(stream) = self.host.resolve_stream_metadata(unit, &url) {
                meta.refine(stream);
            }
        }

        let threshold_secs = played_threshold_secs(meta.duration_secs, self.config.played_percent);
        let Some(playlist_epoch) = self.host.playlist_epoch(unit) else {
            return; // unit vanished between the event and now
        };

        let session = PlaySession {
            started_at: Utc::now(),
            tracked_url: url.clone(),
            playlist_epoch,
            threshold_secs,
            musicbrainz_id: meta.musicbrainz_id.clone(),
            rating: meta.rating,
        };

        if threshold_secs == 0 {
            // No duration, so no confirmation is possible: best-effort now
            if let Some(state) = self.units.get_mut(&unit) {
                state.session = Some(session);
            }
            debug!(%unit, %url, "unknown duration; recording immediately");
            self.try_record(unit).await;
            return;
        }

        if let Some(state) = self.units.get_mut(&unit) {
            state.session = Some(session);
            state.timer = Some(spawn_check_timer(self.tx.clone(), unit, token, threshold_secs));
            debug!(%unit, %url, threshold_secs, "armed play timer");
        }
    }

    async fn check_played(&mut self, unit: Uuid, token: u64) {
        let (tracked_url, playlist_epoch, threshold_secs) = {
            let Some(state) = self.units.get_mut(&unit) else {
                return;
            };
            if token != state.arm_token {
                return; // stale timer, superseded by a later arm
            }
            state.timer = None;
            let Some(session) = state.session.as_ref() else {
                return;
            };
            (
                session.tracked_url.clone(),
                session.playlist_epoch,
                session.threshold_secs,
            )
        };

        match self.host.current_track(unit) {
            Some(url) if url == tracked_url => {}
            _ => {
                debug!(%unit, "track changed before threshold; not a play");
                return;
            }
        }
        if self.host.playlist_epoch(unit) != Some(playlist_epoch) {
            debug!(%unit, "playlist moved on; not a play");
            return;
        }
        let Some(position) = self.host.playback_position(unit) else {
            return;
        };

        if position < threshold_secs as f64 {
            // Playback was paused during the wait: see out the remainder
            let remaining = ((threshold_secs as f64 - position).ceil() as u64).max(1);
            if let Some(state) = self.units.get_mut(&unit) {
                state.arm_token = state.arm_token.wrapping_add(1);
                state.timer =
                    Some(spawn_check_timer(self.tx.clone(), unit, state.arm_token, remaining));
                debug!(%unit, position, remaining, "short of threshold; re-armed");
            }
            return;
        }

        self.try_record(unit).await;
    }

    /// Build the row for the current session and get it to the store, the
    /// queue, or (failing both) the log.
    async fn try_record(&mut self, unit: Uuid) {
        let (record, key, started_at) = {
            let Some(state) = self.units.get(&unit) else {
                return;
            };
            let Some(session) = state.session.as_ref() else {
                return;
            };
            let key = (session.playlist_epoch, session.tracked_url.clone());
            if state.last_recorded.as_ref() == Some(&key) {
                debug!(%unit, url = %session.tracked_url, "already recorded for this playlist instance");
                return;
            }
            let record = PendingRecord::new(
                session.tracked_url.clone(),
                session.musicbrainz_id.clone(),
                session.rating,
                self.host.client_id(unit),
                Utc::now().timestamp(),
            );
            (record, key, session.started_at)
        };

        if self.host.maintenance_running() {
            // A permanently failed schema means queued records can never
            // land; don't let them pile up over a long maintenance window
            if self.writer.schema_state() == SchemaState::Failed {
                debug!(url = %record.url, "history schema unavailable; dropping play record");
                return;
            }
            self.mark_recorded(unit, key);
            info!(url = %record.url, "maintenance window active; queueing play record");
            self.enqueue(record);
            return;
        }

        match self.writer.insert_play(&record).await {
            WriteOutcome::Recorded => {
                let elapsed_secs = (Utc::now() - started_at).num_seconds();
                info!(%unit, url = %record.url, elapsed_secs, "recorded play");
                self.mark_recorded(unit, key);
            }
            WriteOutcome::TransientBusy => {
                warn!(url = %record.url, "store busy; queueing play record for retry");
                self.mark_recorded(unit, key);
                self.enqueue(record);
            }
            WriteOutcome::SchemaUnavailable => {
                debug!(url = %record.url, "history schema unavailable; dropping play record");
            }
            WriteOutcome::PermanentFailure(e) => {
                warn!(url = %record.url, error = %e, "dropping unwritable play record");
            }
        }
    }

    fn mark_recorded(&mut self, unit: Uuid, key: (u64, String)) {
        if let Some(state) = self.units.get_mut(&unit) {
            state.last_recorded = Some(key);
        }
    }

    fn enqueue(&mut self, record: PendingRecord) {
        if let Some(evicted) = self.queue.push(record) {
            warn!(url = %evicted.url, "write queue full; dropping oldest pending record");
        }
        self.schedule_flush(self.config.queue_flush_delay_secs);
    }

    fn schedule_flush(&mut self, delay_secs: u64) {
        if self.flush_scheduled {
            return;
        }
        self.flush_scheduled = true;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(TrackerMessage::FlushQueue);
            }
        });
    }

    async fn flush_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.host.maintenance_running() {
            debug!("maintenance still running; delaying queue flush");
            self.schedule_flush(self.config.queue_retry_delay_secs);
            return;
        }

        let mut batch = self.queue.take_all();
        let mut written = 0usize;
        while let Some(record) = batch.pop_front() {
            match self.writer.insert_play(&record).await {
                WriteOutcome::Recorded => written += 1,
                WriteOutcome::TransientBusy => {
                    // The rest of the batch would hit the same lock; keep
                    // everything, in order, for the next round
                    batch.push_front(record);
                    break;
                }
                WriteOutcome::SchemaUnavailable => {
                    warn!(
                        dropped = batch.len() + 1,
                        "history schema unavailable; dropping queued play records"
                    );
                    batch.clear();
                    break;
                }
                WriteOutcome::PermanentFailure(e) => {
                    warn!(url = %record.url, error = %e, "dropping unwritable queued play record");
                }
            }
        }

        let remaining = batch.len();
        self.queue.restore(batch);
        if remaining > 0 {
            debug!(written, remaining, "store still busy; retrying flush later");
            self.schedule_flush(self.config.queue_retry_delay_secs);
        } else if written > 0 {
            info!(written, "flushed queued play records");
        }
    }
}

fn spawn_check_timer(
    tx: mpsc::WeakUnboundedSender<TrackerMessage>,
    unit: Uuid,
    token: u64,
    delay_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        if let Some(tx) = tx.upgrade() {
            let _ = tx.send(TrackerMessage::CheckPlayed { unit, token });
        }
    })
}
