//! Durable store layer
//!
//! - `schema`: idempotent bootstrap of the `track_history` table, memoized
//!   per process so a broken store degrades to "recording disabled" instead
//!   of repeated faulting
//! - `writer`: the single INSERT path with typed outcomes, so callers can
//!   tell "retry later" from "drop this row"
//! - `history`: read-side queries over recorded plays

pub mod history;
pub mod schema;
pub mod writer;

pub use history::TrackHistoryRow;
pub use schema::{SchemaManager, SchemaState};
pub use writer::{TrackWriter, WriteOutcome};
