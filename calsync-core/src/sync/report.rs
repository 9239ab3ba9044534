//! Counters and summaries produced by a sync run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sync::FailedCalendars;

/// A write the engine performed on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAction {
    Create,
    Recreate,
    Delete,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Create => write!(f, "+"),
            SyncAction::Recreate => write!(f, "~"),
            SyncAction::Delete => write!(f, "-"),
        }
    }
}

/// Per-source counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Placeholders created for (event, target) pairs without a mapping.
    pub created: usize,
    /// Placeholders recreated because the source event moved.
    pub recreated: usize,
    /// (event, target) pairs already in sync.
    pub unchanged: usize,
    /// Mappings removed because their source event vanished.
    pub orphans_removed: usize,
    /// Busy entries on the source with no mapping pointing at them, deleted.
    pub stray_placeholders_deleted: usize,
    /// Events ignored: no summary, all-day, or placeholders left alone.
    pub skipped: usize,
}

impl SyncStats {
    pub fn record(&mut self, action: SyncAction) {
        match action {
            SyncAction::Create => self.created += 1,
            SyncAction::Recreate => self.recreated += 1,
            SyncAction::Delete => self.orphans_removed += 1,
        }
    }

    /// Number of writes that reached a target calendar.
    pub fn writes(&self) -> usize {
        self.created + self.recreated + self.orphans_removed + self.stray_placeholders_deleted
    }

    pub fn merge(&mut self, other: &SyncStats) {
        self.created += other.created;
        self.recreated += other.recreated;
        self.unchanged += other.unchanged;
        self.orphans_removed += other.orphans_removed;
        self.stray_placeholders_deleted += other.stray_placeholders_deleted;
        self.skipped += other.skipped;
    }
}

/// Outcome of processing one calendar as source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    /// Listing failed; nothing else was done for this source.
    pub fetch_failed: bool,
    pub stats: SyncStats,
}

impl SourceReport {
    pub fn new(source: &str) -> Self {
        SourceReport {
            source: source.to_string(),
            fetched: 0,
            fetch_failed: false,
            stats: SyncStats::default(),
        }
    }
}

/// Outcome of one full pass over all calendars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub failed_calendars: FailedCalendars,
}

impl RunReport {
    /// No target write failed and every source could be listed.
    pub fn is_success(&self) -> bool {
        self.failed_calendars.is_empty() && !self.sources.iter().any(|s| s.fetch_failed)
    }

    /// Sources whose listing failed.
    pub fn fetch_failures(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .filter(|s| s.fetch_failed)
            .map(|s| s.source.as_str())
    }

    /// Counters summed over every source.
    pub fn totals(&self) -> SyncStats {
        let mut totals = SyncStats::default();
        for source in &self.sources {
            totals.merge(&source.stats);
        }
        totals
    }
}
