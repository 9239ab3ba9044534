//! ICS file generation and parsing.
//!
//! Only what busy placeholders need: writing an opaque VEVENT and reading back
//! UID, SUMMARY, DTSTART and DTEND.

mod generate;
mod parse;

pub use generate::generate_busy_ics;
pub use parse::{parse_event, parse_uid};
