//! Reconciliation of one source calendar against every target.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::calendar::{Calendar, find_calendar};
use crate::error::SyncResult;
use crate::event::Event;
use crate::store::{EventMapping, MappingKey, MappingStore};
use crate::sync::classify::{EventClass, classify};
use crate::sync::{FailedCalendars, SourceReport, SyncAction};
use crate::window::SyncWindow;

/// Mirror `source` onto every other calendar in `calendars`.
///
/// Never returns an error: fetch failures skip the source, target write
/// failures land in `failed`, everything else is logged.
pub fn sync_source(
    source: &dyn Calendar,
    calendars: &[Box<dyn Calendar>],
    store: &mut MappingStore,
    window: &SyncWindow,
    failed: &mut FailedCalendars,
) -> SourceReport {
    let mut pass = SourcePass {
        source,
        calendars,
        store,
        failed,
        report: SourceReport::new(source.id()),
    };
    pass.run(window);
    pass.report
}

struct SourcePass<'a> {
    source: &'a dyn Calendar,
    calendars: &'a [Box<dyn Calendar>],
    store: &'a mut MappingStore,
    failed: &'a mut FailedCalendars,
    report: SourceReport,
}

impl SourcePass<'_> {
    fn run(&mut self, window: &SyncWindow) {
        let events = match self.source.list_events(window) {
            Ok(events) => events,
            Err(e) => {
                // Leave mappings alone: a transient fetch error must not
                // look like every event vanished.
                error!(source_calendar = %self.source.id(), error = %e, "Fetch failed, skipping source");
                self.report.fetch_failed = true;
                return;
            }
        };

        self.report.fetched = events.len();
        info!(
            source_calendar = %self.source.id(),
            count = events.len(),
            time_min = %window.time_min_iso(),
            time_max = %window.time_max_iso(),
            "Fetched events"
        );

        let seen: HashSet<&str> = events.iter().map(|e| e.id.as_str()).collect();

        for event in &events {
            self.process_event(event);
        }

        self.cleanup_orphans(&seen);
    }

    fn process_event(&mut self, event: &Event) {
        match classify(event) {
            EventClass::MissingSummary => {
                debug!(event_id = %event.id, "Skipping event without summary");
                self.report.stats.skipped += 1;
            }
            EventClass::BusyPlaceholder => self.check_placeholder(event),
            EventClass::AllDay => {
                debug!(event_id = %event.id, "Skipping all-day event");
                self.report.stats.skipped += 1;
            }
            EventClass::Timed { start, end } => self.mirror(event, start, end),
        }
    }

    /// A "Busy" entry on the source is legitimate only while some mapping
    /// still points at it. Otherwise its origin is gone and it is deleted.
    fn check_placeholder(&mut self, event: &Event) {
        if self.source.only_source() {
            debug!(event_id = %event.id, "Leaving busy entry on source-only calendar");
            self.report.stats.skipped += 1;
            return;
        }

        match self.store.find_by_busy_event(self.source.id(), &event.id) {
            Ok(Some(mapping)) => {
                debug!(
                    busy_event_id = %event.id,
                    origin_calendar = %mapping.source_calendar,
                    "Placeholder still mapped"
                );
                self.report.stats.skipped += 1;
            }
            Ok(None) => match self.source.delete_event(&event.id) {
                Ok(()) => {
                    info!(source_calendar = %self.source.id(), busy_event_id = %event.id, "Deleted stray placeholder");
                    self.report.stats.stray_placeholders_deleted += 1;
                }
                Err(e) => {
                    warn!(source_calendar = %self.source.id(), busy_event_id = %event.id, error = %e, "Failed to delete stray placeholder");
                }
            },
            Err(e) => {
                error!(source_calendar = %self.source.id(), busy_event_id = %event.id, error = %e, "Mapping lookup failed");
            }
        }
    }

    fn mirror(&mut self, event: &Event, start: DateTime<Utc>, end: DateTime<Utc>) {
        let calendars = self.calendars;
        for target in calendars.iter().map(|c| c.as_ref()) {
            if target.id() == self.source.id() || target.only_source() || self.failed.contains(target.id()) {
                continue;
            }

            match self.reconcile_target(event, start, end, target) {
                Ok(Some(action)) => self.report.stats.record(action),
                Ok(None) => self.report.stats.unchanged += 1,
                Err(e) => {
                    error!(
                        target_calendar = %target.id(),
                        event_id = %event.id,
                        error = %e,
                        "Target failed, skipping it for the rest of this run"
                    );
                    self.failed.mark(target.id());
                }
            }
        }
    }

    fn reconcile_target(
        &mut self,
        event: &Event,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        target: &dyn Calendar,
    ) -> SyncResult<Option<SyncAction>> {
        let key = MappingKey::new(self.source.id(), &event.id, target.id());

        let Some(mapping) = self.store.get(&key)? else {
            let busy_event_id = target.create_busy_event(start, end, &event.id)?;
            let recorded = self
                .store
                .insert_if_absent(&EventMapping {
                    source_calendar: key.source_calendar,
                    source_event_id: key.source_event_id,
                    target_calendar: key.target_calendar,
                    busy_event_id: busy_event_id.clone(),
                    start_time: start,
                    end_time: end,
                    last_synced_time: Utc::now(),
                })
                .inspect_err(|_| discard_placeholder(target, &busy_event_id))?;
            if !recorded {
                // Another process mirrored this pair between our lookup and
                // our write; its placeholder is the one on record.
                discard_placeholder(target, &busy_event_id);
                return Ok(None);
            }
            info!(
                action = %SyncAction::Create,
                target_calendar = %target.id(),
                event_id = %event.id,
                busy_event_id = %busy_event_id,
                "Created placeholder"
            );
            return Ok(Some(SyncAction::Create));
        };

        if !mapping.window_changed(start, end) {
            return Ok(None);
        }

        if let Err(e) = target.delete_event(&mapping.busy_event_id) {
            warn!(
                target_calendar = %target.id(),
                busy_event_id = %mapping.busy_event_id,
                error = %e,
                "Failed to delete outdated placeholder"
            );
        }

        // A failure here leaves the mapping on the old placeholder; the
        // stored window still differs, so the next run tries again.
        let busy_event_id = target.create_busy_event(start, end, &event.id)?;
        let old_busy_event_id = mapping.busy_event_id.clone();
        let recorded = self
            .store
            .replace_if_current(
                &EventMapping {
                    busy_event_id: busy_event_id.clone(),
                    start_time: start,
                    end_time: end,
                    last_synced_time: Utc::now(),
                    ..mapping
                },
                &old_busy_event_id,
            )
            .inspect_err(|_| discard_placeholder(target, &busy_event_id))?;
        if !recorded {
            discard_placeholder(target, &busy_event_id);
            return Ok(None);
        }
        info!(
            action = %SyncAction::Recreate,
            target_calendar = %target.id(),
            event_id = %event.id,
            old_busy_event_id = %old_busy_event_id,
            busy_event_id = %busy_event_id,
            "Recreated placeholder for moved event"
        );
        Ok(Some(SyncAction::Recreate))
    }

    /// Remove placeholders whose source event is no longer in the window.
    fn cleanup_orphans(&mut self, seen: &HashSet<&str>) {
        let mappings = match self.store.list_for_source(self.source.id()) {
            Ok(mappings) => mappings,
            Err(e) => {
                error!(source_calendar = %self.source.id(), error = %e, "Could not list mappings for orphan cleanup");
                return;
            }
        };

        for mapping in mappings
            .into_iter()
            .filter(|m| !seen.contains(m.source_event_id.as_str()))
        {
            let Some(target) = find_calendar(self.calendars, &mapping.target_calendar) else {
                warn!(
                    target_calendar = %mapping.target_calendar,
                    event_id = %mapping.source_event_id,
                    "Mapping points at an unknown calendar, leaving it"
                );
                continue;
            };

            if target.only_source() {
                debug!(
                    target_calendar = %target.id(),
                    busy_event_id = %mapping.busy_event_id,
                    "Target is source-only now, dropping mapping without deleting"
                );
            } else if let Err(e) = target.delete_event(&mapping.busy_event_id) {
                warn!(
                    target_calendar = %target.id(),
                    busy_event_id = %mapping.busy_event_id,
                    error = %e,
                    "Failed to delete orphaned placeholder, keeping mapping"
                );
                continue;
            }

            match self.store.delete(&mapping.key()) {
                Ok(_) => {
                    info!(
                        action = %SyncAction::Delete,
                        target_calendar = %target.id(),
                        event_id = %mapping.source_event_id,
                        busy_event_id = %mapping.busy_event_id,
                        "Removed orphaned placeholder"
                    );
                    self.report.stats.record(SyncAction::Delete);
                }
                Err(e) => {
                    error!(
                        target_calendar = %target.id(),
                        event_id = %mapping.source_event_id,
                        error = %e,
                        "Failed to remove orphaned mapping"
                    );
                }
            }
        }
    }
}

/// Best-effort removal of a placeholder that never made it into the store.
fn discard_placeholder(target: &dyn Calendar, busy_event_id: &str) {
    if let Err(e) = target.delete_event(busy_event_id) {
        warn!(
            target_calendar = %target.id(),
            busy_event_id,
            error = %e,
            "Failed to remove unrecorded placeholder"
        );
    }
}
