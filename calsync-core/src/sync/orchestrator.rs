use tracing::{error, info, info_span};

use crate::calendar::Calendar;
use crate::store::MappingStore;
use crate::sync::source::sync_source;
use crate::sync::{FailedCalendars, RunReport};
use crate::window::SyncWindow;

/// Run one pass: every calendar, in declaration order, as source.
///
/// A target that fails for one source is skipped by all later sources in the
/// same pass, but is still processed as a source itself. The pass never
/// fails; the returned report says what happened.
pub fn run_sync(
    calendars: &[Box<dyn Calendar>],
    store: &mut MappingStore,
    window: &SyncWindow,
) -> RunReport {
    let mut failed = FailedCalendars::new();
    let mut sources = Vec::with_capacity(calendars.len());

    info!(
        calendars = calendars.len(),
        time_min = %window.time_min_iso(),
        time_max = %window.time_max_iso(),
        "Starting sync"
    );

    for source in calendars {
        let span = info_span!("sync_source", source_calendar = %source.id(), only_source = source.only_source());
        let _guard = span.enter();

        let report = sync_source(source.as_ref(), calendars, store, window, &mut failed);
        info!(
            fetched = report.fetched,
            created = report.stats.created,
            recreated = report.stats.recreated,
            unchanged = report.stats.unchanged,
            orphans_removed = report.stats.orphans_removed,
            stray_placeholders_deleted = report.stats.stray_placeholders_deleted,
            skipped = report.stats.skipped,
            "Source done"
        );
        sources.push(report);
    }

    let report = RunReport {
        sources,
        failed_calendars: failed,
    };

    if report.failed_calendars.is_empty() {
        info!("Sync completed successfully for all calendars");
    } else {
        error!(
            failed_calendars = %report.failed_calendars.joined(),
            "Sync completed with failures for calendars: {}",
            report.failed_calendars.joined()
        );
    }

    report
}
