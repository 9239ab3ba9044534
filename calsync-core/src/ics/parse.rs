//! ICS file parsing using the icalendar crate's parser.

use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{read_calendar, unfold},
};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::event::{Event, EventTime};

/// Parse the first VEVENT of an .ics document into an [`Event`].
///
/// UID, DTSTART and DTEND are required; SUMMARY is optional.
pub fn parse_event(content: &str) -> SyncResult<Event> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| SyncError::IcsParse(e.to_string()))?;
    let vevent = calendar
        .components
        .iter()
        .find(|c| c.name == "VEVENT")
        .ok_or_else(|| SyncError::IcsParse("no VEVENT component".into()))?;

    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .ok_or_else(|| SyncError::IcsParse("VEVENT without UID".into()))?;

    let start = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .ok_or_else(|| SyncError::IcsParse(format!("{uid}: missing or invalid DTSTART")))?;
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .ok_or_else(|| SyncError::IcsParse(format!("{uid}: missing or invalid DTEND")))?;

    let summary = vevent.find_prop("SUMMARY").map(|p| p.val.to_string());

    Ok(Event {
        id: uid,
        start,
        end,
        summary,
    })
}

/// Parse just the UID from .ics content.
pub fn parse_uid(content: &str) -> Option<String> {
    unfold(content)
        .lines()
        .find_map(|line| line.strip_prefix("UID:").map(|uid| uid.trim().to_string()))
}

/// Convert icalendar's DatePerhapsTime to an EventTime.
///
/// Zoned times are resolved through chrono-tz; floating times and unknown
/// TZIDs are read as UTC.
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => EventTime::DateTime(dt),
            CalendarDateTime::Floating(naive) => EventTime::DateTime(naive.and_utc()),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTime(zoned_to_utc(date_time, &tzid))
            }
        },
    }
}

fn zoned_to_utc(naive: NaiveDateTime, tzid: &str) -> chrono::DateTime<Utc> {
    match tzid.parse::<Tz>() {
        Ok(tz) => match tz.from_local_datetime(&naive).earliest() {
            Some(local) => local.with_timezone(&Utc),
            // Inside a DST gap
            None => naive.and_utc(),
        },
        Err(_) => {
            debug!(tzid, "Unknown TZID, reading time as UTC");
            naive.and_utc()
        }
    }
}
