//! Durable table of source event -> target placeholder links.
//!
//! Backed by SQLite. Every mutation is its own IMMEDIATE transaction. The
//! conditional writes the engine uses ([`MappingStore::insert_if_absent`],
//! [`MappingStore::replace_if_current`]) check the current row inside that
//! same transaction, so a second process sharing the file cannot slip a
//! write in between the check and the write.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS event_mappings (
        source_calendar  TEXT NOT NULL,
        source_event_id  TEXT NOT NULL,
        target_calendar  TEXT NOT NULL,
        busy_event_id    TEXT NOT NULL,
        start_time       TEXT NOT NULL,
        end_time         TEXT NOT NULL,
        last_synced_time TEXT NOT NULL,
        PRIMARY KEY (source_calendar, source_event_id, target_calendar)
    );
    CREATE INDEX IF NOT EXISTS idx_event_mappings_target_busy
        ON event_mappings (target_calendar, busy_event_id);
";

const COLUMNS: &str = "source_calendar, source_event_id, target_calendar, busy_event_id, \
                       start_time, end_time, last_synced_time";

/// Composite key of a mapping: one source event mirrored onto one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingKey {
    pub source_calendar: String,
    pub source_event_id: String,
    pub target_calendar: String,
}

impl MappingKey {
    pub fn new(source_calendar: &str, source_event_id: &str, target_calendar: &str) -> Self {
        MappingKey {
            source_calendar: source_calendar.to_string(),
            source_event_id: source_event_id.to_string(),
            target_calendar: target_calendar.to_string(),
        }
    }
}

/// A placeholder on `target_calendar` that mirrors `source_event_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMapping {
    pub source_calendar: String,
    pub source_event_id: String,
    pub target_calendar: String,
    pub busy_event_id: String,
    /// Source event window at the last successful write
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub last_synced_time: DateTime<Utc>,
}

impl EventMapping {
    pub fn key(&self) -> MappingKey {
        MappingKey::new(&self.source_calendar, &self.source_event_id, &self.target_calendar)
    }

    /// True when the stored window differs from `start`/`end`.
    pub fn window_changed(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time != start || self.end_time != end
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EventMapping {
            source_calendar: row.get(0)?,
            source_event_id: row.get(1)?,
            target_calendar: row.get(2)?,
            busy_event_id: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            last_synced_time: row.get(6)?,
        })
    }
}

pub struct MappingStore {
    conn: Connection,
}

impl MappingStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;

        let store = MappingStore { conn };
        store.bootstrap()?;
        debug!(path = %path.display(), "Opened mapping store");
        Ok(store)
    }

    pub fn in_memory() -> SyncResult<Self> {
        let store = MappingStore {
            conn: Connection::open_in_memory()?,
        };
        store.bootstrap()?;
        Ok(store)
    }

    fn bootstrap(&self) -> SyncResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Lookup by full key.
    pub fn get(&self, key: &MappingKey) -> SyncResult<Option<EventMapping>> {
        let mapping = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM event_mappings
                     WHERE source_calendar = ?1 AND source_event_id = ?2 AND target_calendar = ?3"
                ),
                params![key.source_calendar, key.source_event_id, key.target_calendar],
                EventMapping::from_row,
            )
            .optional()?;
        Ok(mapping)
    }

    /// Lookup the mapping that produced placeholder `busy_event_id` on `target_calendar`.
    pub fn find_by_busy_event(
        &self,
        target_calendar: &str,
        busy_event_id: &str,
    ) -> SyncResult<Option<EventMapping>> {
        let mapping = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM event_mappings
                     WHERE target_calendar = ?1 AND busy_event_id = ?2
                     LIMIT 1"
                ),
                params![target_calendar, busy_event_id],
                EventMapping::from_row,
            )
            .optional()?;
        Ok(mapping)
    }

    /// All mappings whose source is `source_calendar`.
    pub fn list_for_source(&self, source_calendar: &str) -> SyncResult<Vec<EventMapping>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM event_mappings
             WHERE source_calendar = ?1
             ORDER BY source_event_id, target_calendar"
        ))?;
        let rows = stmt.query_map(params![source_calendar], EventMapping::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_all(&self) -> SyncResult<Vec<EventMapping>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM event_mappings
             ORDER BY source_calendar, source_event_id, target_calendar"
        ))?;
        let rows = stmt.query_map([], EventMapping::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> SyncResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM event_mappings", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| SyncError::Serialization(format!("mapping count {count} out of range")))
    }

    /// Insert a new mapping. Fails if one already exists for the same key.
    pub fn insert(&mut self, mapping: &EventMapping) -> SyncResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            &format!("INSERT INTO event_mappings ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                mapping.source_calendar,
                mapping.source_event_id,
                mapping.target_calendar,
                mapping.busy_event_id,
                mapping.start_time,
                mapping.end_time,
                mapping.last_synced_time,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Insert `mapping` unless a row already exists for its key.
    ///
    /// Returns false, writing nothing, when another writer got there first.
    pub fn insert_if_absent(&mut self, mapping: &EventMapping) -> SyncResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT busy_event_id FROM event_mappings
                 WHERE source_calendar = ?1 AND source_event_id = ?2 AND target_calendar = ?3",
                params![
                    mapping.source_calendar,
                    mapping.source_event_id,
                    mapping.target_calendar
                ],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(busy_event_id) = existing {
            debug!(
                target_calendar = %mapping.target_calendar,
                event_id = %mapping.source_event_id,
                busy_event_id = %busy_event_id,
                "Mapping already recorded by another writer"
            );
            return Ok(false);
        }

        tx.execute(
            &format!("INSERT INTO event_mappings ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                mapping.source_calendar,
                mapping.source_event_id,
                mapping.target_calendar,
                mapping.busy_event_id,
                mapping.start_time,
                mapping.end_time,
                mapping.last_synced_time,
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Point an existing mapping at a new placeholder, but only while it still
    /// records `expected_busy_event_id`.
    ///
    /// Returns false when the row is gone or was already replaced.
    pub fn replace_if_current(
        &mut self,
        mapping: &EventMapping,
        expected_busy_event_id: &str,
    ) -> SyncResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE event_mappings
             SET busy_event_id = ?4, start_time = ?5, end_time = ?6, last_synced_time = ?7
             WHERE source_calendar = ?1 AND source_event_id = ?2 AND target_calendar = ?3
               AND busy_event_id = ?8",
            params![
                mapping.source_calendar,
                mapping.source_event_id,
                mapping.target_calendar,
                mapping.busy_event_id,
                mapping.start_time,
                mapping.end_time,
                mapping.last_synced_time,
                expected_busy_event_id,
            ],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Overwrite busy id, window and sync time of an existing mapping.
    pub fn update(&mut self, mapping: &EventMapping) -> SyncResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE event_mappings
             SET busy_event_id = ?4, start_time = ?5, end_time = ?6, last_synced_time = ?7
             WHERE source_calendar = ?1 AND source_event_id = ?2 AND target_calendar = ?3",
            params![
                mapping.source_calendar,
                mapping.source_event_id,
                mapping.target_calendar,
                mapping.busy_event_id,
                mapping.start_time,
                mapping.end_time,
                mapping.last_synced_time,
            ],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls it back
            return Err(SyncError::MappingNotFound {
                source_calendar: mapping.source_calendar.clone(),
                source_event_id: mapping.source_event_id.clone(),
                target_calendar: mapping.target_calendar.clone(),
            });
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete a mapping. Returns whether a row was removed.
    pub fn delete(&mut self, key: &MappingKey) -> SyncResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute(
            "DELETE FROM event_mappings
             WHERE source_calendar = ?1 AND source_event_id = ?2 AND target_calendar = ?3",
            params![key.source_calendar, key.source_event_id, key.target_calendar],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mapping(source_event_id: &str, target: &str, busy: &str) -> EventMapping {
        EventMapping {
            source_calendar: "A".to_string(),
            source_event_id: source_event_id.to_string(),
            target_calendar: target.to_string(),
            busy_event_id: busy.to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap(),
            last_synced_time: Utc::now(),
        }
    }

    #[test]
    fn test_mapping_can_be_created_and_queried() {
        let mut store = MappingStore::in_memory().unwrap();
        let m = mapping("aaa", "B", "bbb");
        store.insert(&m).unwrap();

        let found = store.get(&MappingKey::new("A", "aaa", "B")).unwrap();
        assert_eq!(found, Some(m.clone()));

        let by_busy = store.find_by_busy_event("B", "bbb").unwrap();
        assert_eq!(by_busy, Some(m));

        assert_eq!(store.get(&MappingKey::new("A", "aaa", "C")).unwrap(), None);
        assert_eq!(store.find_by_busy_event("A", "bbb").unwrap(), None);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut store = MappingStore::in_memory().unwrap();
        store.insert(&mapping("aaa", "B", "bbb")).unwrap();

        let result = store.insert(&mapping("aaa", "B", "ccc"));
        assert!(matches!(result, Err(SyncError::Store(_))));

        // Same source event on another target is a different key
        store.insert(&mapping("aaa", "C", "ccc")).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get(&MappingKey::new("A", "aaa", "B")).unwrap().unwrap().busy_event_id, "bbb");
    }

    #[test]
    fn test_can_update_and_delete_mapping() {
        let mut store = MappingStore::in_memory().unwrap();
        let mut m = mapping("aaa", "B", "bbb");
        store.insert(&m).unwrap();

        m.busy_event_id = "ccc".to_string();
        m.start_time = Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap();
        store.update(&m).unwrap();

        let found = store.get(&m.key()).unwrap().unwrap();
        assert_eq!(found.busy_event_id, "ccc");
        assert_eq!(found.start_time, m.start_time);

        assert!(store.delete(&m.key()).unwrap());
        assert!(!store.delete(&m.key()).unwrap());
        assert_eq!(store.get(&m.key()).unwrap(), None);
    }

    #[test]
    fn test_update_of_missing_mapping_fails() {
        let mut store = MappingStore::in_memory().unwrap();
        let result = store.update(&mapping("aaa", "B", "bbb"));
        assert!(matches!(result, Err(SyncError::MappingNotFound { .. })));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_list_for_source_filters_by_source() {
        let mut store = MappingStore::in_memory().unwrap();
        store.insert(&mapping("aaa", "B", "b1")).unwrap();
        store.insert(&mapping("aaa", "C", "c1")).unwrap();
        let mut other = mapping("zzz", "A", "a1");
        other.source_calendar = "B".to_string();
        store.insert(&other).unwrap();

        let from_a = store.list_for_source("A").unwrap();
        assert_eq!(from_a.len(), 2);
        assert!(from_a.iter().all(|m| m.source_calendar == "A"));
        assert_eq!(store.list_for_source("B").unwrap(), vec![other]);
        assert!(store.list_for_source("nope").unwrap().is_empty());
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("calendar_sync.db");
        let m = mapping("aaa", "B", "bbb");

        {
            let mut store = MappingStore::open(&path).unwrap();
            store.insert(&m).unwrap();
        }

        let store = MappingStore::open(&path).unwrap();
        assert_eq!(store.get(&m.key()).unwrap(), Some(m));
    }

    #[test]
    fn test_conditional_insert_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar_sync.db");
        let mut first = MappingStore::open(&path).unwrap();
        let mut second = MappingStore::open(&path).unwrap();
        let key = MappingKey::new("A", "aaa", "B");

        // Both writers see no mapping before either writes.
        assert_eq!(first.get(&key).unwrap(), None);
        assert_eq!(second.get(&key).unwrap(), None);

        assert!(second.insert_if_absent(&mapping("aaa", "B", "from-second")).unwrap());
        assert!(!first.insert_if_absent(&mapping("aaa", "B", "from-first")).unwrap());

        assert_eq!(first.count().unwrap(), 1);
        assert_eq!(first.get(&key).unwrap().unwrap().busy_event_id, "from-second");
    }

    #[test]
    fn test_replace_only_while_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar_sync.db");
        let mut first = MappingStore::open(&path).unwrap();
        let mut second = MappingStore::open(&path).unwrap();
        first.insert(&mapping("aaa", "B", "old")).unwrap();

        let mut moved = mapping("aaa", "B", "new-second");
        moved.start_time = Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap();
        assert!(second.replace_if_current(&moved, "old").unwrap());

        moved.busy_event_id = "new-first".to_string();
        assert!(!first.replace_if_current(&moved, "old").unwrap());

        let stored = first.get(&moved.key()).unwrap().unwrap();
        assert_eq!(stored.busy_event_id, "new-second");
        assert_eq!(stored.start_time, moved.start_time);

        assert!(!first
            .replace_if_current(&mapping("zzz", "B", "x"), "old")
            .unwrap());
    }

    #[test]
    fn test_window_changed() {
        let m = mapping("aaa", "B", "bbb");
        assert!(!m.window_changed(m.start_time, m.end_time));
        assert!(m.window_changed(m.start_time, m.end_time + chrono::Duration::minutes(30)));
    }
}
