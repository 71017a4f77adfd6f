//! Bounded write queue
//!
//! Holds play records the store could not accept yet (lock contention,
//! maintenance window). Capacity-bounded: a store outage of any length costs
//! at most `QUEUE_CAP` records of memory, and beyond that the oldest pending
//! plays are dropped rather than growing without bound.
//!
//! This is a plain FIFO; the tracker task owns flush scheduling and drives
//! retries through it, so no synchronization lives here.

use std::collections::VecDeque;

use crate::record::PendingRecord;

/// Maximum number of records held while the store is unavailable.
pub const QUEUE_CAP: usize = 5000;

/// FIFO of play records awaiting a durable write.
#[derive(Debug, Default)]
pub struct WriteQueue {
    entries: VecDeque<PendingRecord>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a record. When the queue is full the oldest entry is evicted
    /// and returned so the caller can log the loss.
    pub fn push(&mut self, record: PendingRecord) -> Option<PendingRecord> {
        let evicted = if self.entries.len() >= QUEUE_CAP {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(record);
        evicted
    }

    /// Take every queued record for a flush round, leaving the queue empty.
    pub fn take_all(&mut self) -> VecDeque<PendingRecord> {
        std::mem::take(&mut self.entries)
    }

    /// Put back the unflushed remainder of a round, preserving order.
    /// Only valid between `take_all` and the next `push`.
    pub fn restore(&mut self, remainder: VecDeque<PendingRecord>) {
        debug_assert!(self.entries.is_empty());
        self.entries = remainder;
    }
}
