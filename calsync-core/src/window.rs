//! Time window that bounds each sync pass.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Days ahead of now that are mirrored when nothing else is configured.
pub const DEFAULT_SYNC_WINDOW_DAYS: u32 = 3;

/// Longest window accepted from config or the command line.
pub const MAX_SYNC_WINDOW_DAYS: u32 = 3660;

/// The half-open interval `[time_min, time_max)` events are fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

impl Default for SyncWindow {
    /// Default window: now until now + DEFAULT_SYNC_WINDOW_DAYS
    fn default() -> Self {
        SyncWindow::from_days(DEFAULT_SYNC_WINDOW_DAYS)
    }
}

impl SyncWindow {
    /// Window starting now and spanning `days` days.
    pub fn from_days(days: u32) -> Self {
        SyncWindow::starting_at(Utc::now(), days)
    }

    /// Window starting at `now`, truncated to whole seconds.
    ///
    /// `days` is capped at [`MAX_SYNC_WINDOW_DAYS`].
    pub fn starting_at(now: DateTime<Utc>, days: u32) -> Self {
        let now = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()));
        let span = Duration::days(i64::from(days.min(MAX_SYNC_WINDOW_DAYS)));
        SyncWindow {
            time_min: now,
            time_max: now.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// `time_min` as ISO-8601 with a trailing `Z`, e.g. `2024-01-01T10:00:00Z`.
    pub fn time_min_iso(&self) -> String {
        self.time_min.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// `time_max` as ISO-8601 with a trailing `Z`.
    pub fn time_max_iso(&self) -> String {
        self.time_max.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// True when `[start, end)` overlaps the window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.time_max && end > self.time_min
    }
}
