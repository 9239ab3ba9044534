//! Calendar backed by a local directory of .ics files (`type = "ics"`).
//!
//! Each event is one `.ics` file. Placeholders are written as `<uid>.ics`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::error::{SyncError, SyncResult};
use crate::event::Event;
use crate::ics::{generate_busy_ics, parse_event, parse_uid};
use crate::window::SyncWindow;

pub struct IcsDirCalendar {
    id: String,
    only_source: bool,
    dir: PathBuf,
}

impl IcsDirCalendar {
    pub fn new(id: &str, dir: impl Into<PathBuf>, only_source: bool) -> Self {
        IcsDirCalendar {
            id: id.to_string(),
            only_source,
            dir: dir.into(),
        }
    }

    /// Build from config; requires a `path` setting (`~` is expanded).
    pub fn from_config(config: &CalendarConfig) -> SyncResult<Self> {
        let path = config.require_str("path")?;
        let dir = PathBuf::from(shellexpand::tilde(path).into_owned());
        Ok(Self::new(&config.id, dir, config.onlysource))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ics_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "ics") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Path of the file holding `event_id`, if any.
    fn find_file(&self, event_id: &str) -> std::io::Result<Option<PathBuf>> {
        let direct = self.dir.join(format!("{event_id}.ics"));
        if direct.exists() {
            return Ok(Some(direct));
        }

        for path in self.ics_files()? {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if parse_uid(&content).as_deref() == Some(event_id) {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }
}

impl Calendar for IcsDirCalendar {
    fn id(&self) -> &str {
        &self.id
    }

    fn only_source(&self) -> bool {
        self.only_source
    }

    fn list_events(&self, window: &SyncWindow) -> SyncResult<Vec<Event>> {
        let files = self.ics_files().map_err(|e| {
            SyncError::fetch(&self.id, format!("cannot read {}: {}", self.dir.display(), e))
        })?;

        let mut events = Vec::new();
        for path in files {
            let content = fs::read_to_string(&path)
                .map_err(|e| SyncError::fetch(&self.id, format!("{}: {}", path.display(), e)))?;

            match parse_event(&content) {
                Ok(event) => {
                    if window.overlaps(event.start.to_utc(), event.end.to_utc()) {
                        events.push(event);
                    }
                }
                Err(e) => warn!(calendar = %self.id, path = %path.display(), error = %e, "Skipping unparseable event file"),
            }
        }

        Ok(events)
    }

    fn create_busy_event(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_event_id: &str,
    ) -> SyncResult<String> {
        let uid = uuid::Uuid::new_v4().to_string();
        let content = generate_busy_ics(&uid, start, end, source_event_id);

        fs::create_dir_all(&self.dir).map_err(|e| SyncError::create(&self.id, e))?;
        let path = self.dir.join(format!("{uid}.ics"));
        fs::write(&path, content).map_err(|e| SyncError::create(&self.id, e))?;

        debug!(calendar = %self.id, path = %path.display(), "Wrote busy placeholder");
        Ok(uid)
    }

    fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        let path = self
            .find_file(event_id)
            .map_err(|e| SyncError::delete(&self.id, event_id, e))?;

        match path {
            Some(path) => {
                fs::remove_file(&path).map_err(|e| SyncError::delete(&self.id, event_id, e))?;
                debug!(calendar = %self.id, path = %path.display(), "Deleted event file");
            }
            None => debug!(calendar = %self.id, event_id, "Event already gone"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;
    use chrono::{Duration, TimeZone};

    fn window() -> SyncWindow {
        SyncWindow::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 3)
    }

    fn write_event(dir: &Path, name: &str, uid: &str, dtstart: &str, dtend: &str) {
        let ics = format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\nBEGIN:VEVENT\r\n\
             UID:{uid}\r\nSUMMARY:Meeting\r\nDTSTART{dtstart}\r\nDTEND{dtend}\r\n\
             END:VEVENT\r\nEND:VCALENDAR\r\n"
        );
        fs::write(dir.join(name), ics).unwrap();
    }

    #[test]
    fn test_list_events_filters_to_window() {
        let dir = tempfile::tempdir().unwrap();
        write_event(dir.path(), "a.ics", "in", ":20240101T100000Z", ":20240101T110000Z");
        write_event(dir.path(), "b.ics", "after", ":20240110T100000Z", ":20240110T110000Z");
        write_event(dir.path(), "c.ics", "all-day", ";VALUE=DATE:20240102", ";VALUE=DATE:20240103");
        fs::write(dir.path().join("notes.txt"), "not an event").unwrap();
        fs::write(dir.path().join("broken.ics"), "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n").unwrap();

        let cal = IcsDirCalendar::new("work", dir.path(), false);
        let events = cal.list_events(&window()).unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, vec!["in", "all-day"]);
    }

    #[test]
    fn test_list_events_on_missing_dir_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let cal = IcsDirCalendar::new("work", dir.path().join("missing"), false);

        assert!(matches!(
            cal.list_events(&window()),
            Err(SyncError::Fetch { calendar, .. }) if calendar == "work"
        ));
    }

    #[test]
    fn test_created_placeholder_is_listed_as_busy() {
        let dir = tempfile::tempdir().unwrap();
        let cal = IcsDirCalendar::new("work", dir.path(), false);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let uid = cal
            .create_busy_event(start, start + Duration::hours(1), "e1")
            .unwrap();
        assert!(dir.path().join(format!("{uid}.ics")).exists());

        let events = cal.list_events(&window()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, uid);
        assert_eq!(events[0].start, EventTime::DateTime(start));
        assert!(events[0].is_busy_placeholder());
    }

    #[test]
    fn test_delete_event_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_event(dir.path(), "meeting.ics", "uid-1", ":20240101T100000Z", ":20240101T110000Z");
        let cal = IcsDirCalendar::new("work", dir.path(), false);

        cal.delete_event("uid-1").unwrap();
        assert!(!dir.path().join("meeting.ics").exists());

        cal.delete_event("uid-1").unwrap();
    }

    #[test]
    fn test_from_config_requires_path() {
        let mut config = CalendarConfig::new("work", "ics");
        assert!(matches!(
            IcsDirCalendar::from_config(&config),
            Err(SyncError::Config(_))
        ));

        config.params.insert("path".into(), toml::Value::String("/tmp/work".into()));
        config.onlysource = true;
        let cal = IcsDirCalendar::from_config(&config).unwrap();
        assert_eq!(cal.id(), "work");
        assert!(cal.only_source());
        assert_eq!(cal.dir(), Path::new("/tmp/work"));
    }
}
