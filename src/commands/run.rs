use anyhow::{Context, Result};
use calsync_core::window::MAX_SYNC_WINDOW_DAYS;
use calsync_core::{MappingStore, ProviderRegistry, Settings, SyncWindow, run_sync};
use owo_colors::OwoColorize;
use tracing::debug;

use crate::render::Render;

pub fn run(settings: &Settings, days: Option<u32>) -> Result<()> {
    let days = days.unwrap_or(settings.sync_window_days);
    if !(1..=MAX_SYNC_WINDOW_DAYS).contains(&days) {
        anyhow::bail!("--days must be between 1 and {}", MAX_SYNC_WINDOW_DAYS);
    }

    let registry = ProviderRegistry::builtin();
    let calendars = registry
        .load_calendars(&settings.calendars)
        .context("Failed to set up calendars")?;

    let mut store = MappingStore::open(&settings.db_path)
        .with_context(|| format!("Failed to open mapping store at {}", settings.db_path.display()))?;

    let window = SyncWindow::from_days(days);
    debug!(
        db_path = %settings.db_path.display(),
        calendars = calendars.len(),
        days,
        "Store opened"
    );
    let report = run_sync(&calendars, &mut store, &window);

    for (i, source) in report.sources.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", source.render());
    }

    let totals = report.totals();
    println!(
        "\nSynced {} created, {} moved, {} removed",
        totals.created,
        totals.recreated,
        totals.orphans_removed + totals.stray_placeholders_deleted
    );

    if !report.failed_calendars.is_empty() {
        println!(
            "{}",
            format!("Failed calendars: {}", report.failed_calendars.joined()).red()
        );
    }

    Ok(())
}
