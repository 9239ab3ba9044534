use std::collections::BTreeSet;

/// Target calendars that failed a write during the current run.
///
/// Once marked, a calendar is skipped as a target by every later event and
/// source in the same run. It is still processed as a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedCalendars(BTreeSet<String>);

impl FailedCalendars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the calendar was not already marked.
    pub fn mark(&mut self, calendar_id: &str) -> bool {
        self.0.insert(calendar_id.to_string())
    }

    pub fn contains(&self, calendar_id: &str) -> bool {
        self.0.contains(calendar_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Comma-separated ids, sorted.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(", ")
    }
}
