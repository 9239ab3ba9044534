//! The capability every calendar provider implements.

use chrono::{DateTime, Utc};

use crate::error::SyncResult;
use crate::event::Event;
use crate::window::SyncWindow;

/// A calendar the engine can read from and write placeholders to.
///
/// Implementations own provider specifics such as auth and timeouts.
/// Calls are blocking; the engine issues them one at a time.
pub trait Calendar {
    /// Stable identity, used as mapping key and log label.
    fn id(&self) -> &str;

    /// A calendar that is only ever mirrored from, never written to as a target.
    fn only_source(&self) -> bool;

    /// All events overlapping `window`.
    ///
    /// Either the complete list or [`SyncError::Fetch`](crate::SyncError::Fetch);
    /// never a partial result.
    fn list_events(&self, window: &SyncWindow) -> SyncResult<Vec<Event>>;

    /// Create an opaque busy placeholder and return its id.
    ///
    /// The placeholder carries [`managed_by_description`](crate::event::managed_by_description)
    /// for `source_event_id` and no other detail of the source event.
    fn create_busy_event(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_event_id: &str,
    ) -> SyncResult<String>;

    /// Delete an event. Deleting an id that no longer exists is not an error.
    fn delete_event(&self, event_id: &str) -> SyncResult<()>;
}

/// Find a calendar by id.
pub fn find_calendar<'a>(calendars: &'a [Box<dyn Calendar>], id: &str) -> Option<&'a dyn Calendar> {
    calendars.iter().find(|c| c.id() == id).map(|c| c.as_ref())
}
