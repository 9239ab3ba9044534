//! ICS file generation.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component};

use crate::event::{BUSY_SUMMARY, managed_by_description};

const PRODID: &str = "-//calendar-sync//EN";

/// Generate .ics content for an opaque busy placeholder.
///
/// Nothing from the source event besides its id (in DESCRIPTION) and its
/// window ends up in the output.
pub fn generate_busy_ics(
    uid: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    source_event_id: &str,
) -> String {
    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(uid);
    ics_event.summary(BUSY_SUMMARY);
    ics_event.description(&managed_by_description(source_event_id));
    ics_event.add_property("DTSTAMP", format_utc(Utc::now()));
    ics_event.add_property("DTSTART", format_utc(start));
    ics_event.add_property("DTEND", format_utc(end));
    ics_event.add_property("STATUS", "CONFIRMED");
    ics_event.add_property("TRANSP", "OPAQUE");

    cal.push(ics_event.done());
    let cal = cal.done();

    strip_ics_bloat(&cal.to_string())
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Clean up ICS output from the icalendar crate
/// - Use our own PRODID
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
