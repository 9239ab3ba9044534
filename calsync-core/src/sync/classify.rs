//! How a fetched source event is treated.

use chrono::{DateTime, Utc};

use crate::event::Event;

/// What a fetched event is, for mirroring purposes.
///
/// Checks run in declaration order and the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// No (or empty) summary: ignored.
    MissingSummary,
    /// Summary is "Busy": a placeholder mirrored in from another calendar.
    BusyPlaceholder,
    /// Date-only bound: never mirrored.
    AllDay,
    /// A real appointment to mirror onto every eligible target.
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

pub fn classify(event: &Event) -> EventClass {
    if event.summary().is_none() {
        return EventClass::MissingSummary;
    }
    if event.is_busy_placeholder() {
        return EventClass::BusyPlaceholder;
    }
    match event.timed_bounds() {
        Some((start, end)) => EventClass::Timed { start, end },
        None => EventClass::AllDay,
    }
}
