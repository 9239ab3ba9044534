//! Provider-neutral event types.
//!
//! Providers convert whatever their API returns into [`Event`]. The engine only
//! ever looks at the id, the time bounds and the summary, so that is all an
//! event carries.

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Summary written on every placeholder this tool creates.
pub const BUSY_SUMMARY: &str = "Busy";

/// Description tag identifying a placeholder and the event it mirrors.
pub fn managed_by_description(source_event_id: &str) -> String {
    format!("Managed-by: calendar-sync (source {source_event_id})")
}

/// A calendar event as read from a source calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Event {
    pub fn new(id: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Event {
            id: id.into(),
            start,
            end,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// The summary, if present and non-empty.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.is_empty())
    }

    /// True for events that are themselves busy placeholders.
    ///
    /// Matching is on the trimmed, case-insensitive summary only.
    pub fn is_busy_placeholder(&self) -> bool {
        self.summary()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(BUSY_SUMMARY))
    }

    /// Start and end as UTC instants, or `None` when either bound is date-only.
    pub fn timed_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (&self.start, &self.end) {
            (EventTime::DateTime(start), EventTime::DateTime(end)) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn is_all_day(&self) -> bool {
        self.timed_bounds().is_none()
    }
}

/// Either a full timestamp or a bare date (all-day).
///
/// Serialized as a string: RFC 3339 for timestamps, `YYYY-MM-DD` for dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Parse a provider time string.
    ///
    /// Strings with a time-of-day component must carry an offset or `Z`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.contains('T') {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| EventTime::DateTime(dt.with_timezone(&Utc)))
                .map_err(|e| format!("Invalid timestamp '{s}': {e}"))
        } else {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(EventTime::Date)
                .map_err(|_| format!("Invalid date '{s}'. Expected YYYY-MM-DD"))
        }
    }

    /// Start of the day for dates, the instant itself otherwise.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::default()).and_utc(),
        }
    }
}

impl TryFrom<String> for EventTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EventTime::parse(&value)
    }
}

impl From<EventTime> for String {
    fn from(value: EventTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::DateTime(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}
