pub mod calendars;
pub mod mappings;
pub mod run;
