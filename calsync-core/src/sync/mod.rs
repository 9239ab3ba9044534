//! The reconciliation engine.
//!
//! [`run_sync`] walks every calendar as source; [`sync_source`] mirrors one
//! source's timed events as placeholders onto the others and removes
//! placeholders whose source event vanished.

pub mod classify;
mod failed;
mod orchestrator;
mod report;
mod source;

pub use classify::{EventClass, classify};
pub use failed::FailedCalendars;
pub use orchestrator::run_sync;
pub use report::{RunReport, SourceReport, SyncAction, SyncStats};
pub use source::sync_source;
