//! Scripted in-memory calendar for engine tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use calsync_core::{
    BUSY_SUMMARY, Calendar, Event, EventTime, SyncError, SyncResult, SyncWindow,
};
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create { source_event_id: String },
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    events: Vec<Event>,
    calls: Vec<Call>,
    next_id: usize,
    fail_list: bool,
    fail_create: bool,
    fail_delete: bool,
    on_create: Option<Box<dyn FnMut()>>,
}

/// A calendar whose events live in memory. Clones share state, so a test can
/// keep a handle while the engine owns the boxed calendar.
#[derive(Clone)]
pub struct FakeCalendar {
    id: String,
    only_source: bool,
    state: Rc<RefCell<FakeState>>,
}

impl FakeCalendar {
    pub fn new(id: &str) -> Self {
        FakeCalendar {
            id: id.to_string(),
            only_source: false,
            state: Rc::new(RefCell::new(FakeState::default())),
        }
    }

    pub fn source_only(id: &str) -> Self {
        FakeCalendar {
            only_source: true,
            ..FakeCalendar::new(id)
        }
    }

    pub fn boxed(&self) -> Box<dyn Calendar> {
        Box::new(self.clone())
    }

    pub fn add(&self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }

    pub fn remove(&self, event_id: &str) {
        self.state.borrow_mut().events.retain(|e| e.id != event_id);
    }

    /// Replace an event's time bounds, keeping its id and summary.
    pub fn reschedule(&self, event_id: &str, start: &str, end: &str) {
        let mut state = self.state.borrow_mut();
        for event in state.events.iter_mut().filter(|e| e.id == event_id) {
            event.start = EventTime::parse(start).unwrap();
            event.end = EventTime::parse(end).unwrap();
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn busy_ids(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.is_busy_placeholder())
            .map(|e| e.id)
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Calls other than listing.
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| *c != Call::List).collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.borrow_mut().fail_list = fail;
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.borrow_mut().fail_create = fail;
    }

    /// Run `hook` right after each successful create, before the engine
    /// records it.
    pub fn on_create(&self, hook: impl FnMut() + 'static) {
        self.state.borrow_mut().on_create = Some(Box::new(hook));
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.borrow_mut().fail_delete = fail;
    }
}

impl Calendar for FakeCalendar {
    fn id(&self) -> &str {
        &self.id
    }

    fn only_source(&self) -> bool {
        self.only_source
    }

    fn list_events(&self, window: &SyncWindow) -> SyncResult<Vec<Event>> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::List);
        if state.fail_list {
            return Err(SyncError::fetch(&self.id, "connection reset"));
        }
        Ok(state
            .events
            .iter()
            .filter(|e| window.overlaps(e.start.to_utc(), e.end.to_utc()))
            .cloned()
            .collect())
    }

    fn create_busy_event(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_event_id: &str,
    ) -> SyncResult<String> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Create {
            source_event_id: source_event_id.to_string(),
        });
        if state.fail_create {
            return Err(SyncError::create(&self.id, "quota exceeded"));
        }
        state.next_id += 1;
        let id = format!("{}-busy-{}", self.id, state.next_id);
        state.events.push(
            Event::new(&id, EventTime::DateTime(start), EventTime::DateTime(end))
                .with_summary(BUSY_SUMMARY),
        );
        if let Some(hook) = state.on_create.as_mut() {
            hook();
        }
        Ok(id)
    }

    fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Delete(event_id.to_string()));
        if state.fail_delete {
            return Err(SyncError::delete(&self.id, event_id, "forbidden"));
        }
        state.events.retain(|e| e.id != event_id);
        Ok(())
    }
}

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Three days starting 2024-01-01T00:00:00Z.
pub fn window() -> SyncWindow {
    SyncWindow::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 3)
}

pub fn timed(id: &str, start: &str, end: &str, summary: &str) -> Event {
    Event::new(
        id,
        EventTime::parse(start).unwrap(),
        EventTime::parse(end).unwrap(),
    )
    .with_summary(summary)
}

pub fn standup(id: &str) -> Event {
    timed(id, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z", "Standup")
}
