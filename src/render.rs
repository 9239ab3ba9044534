//! Colored terminal rendering for calsync-core types.

use calsync_core::sync::{SourceReport, SyncStats};
use calsync_core::{CalendarConfig, EventMapping};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarConfig {
    fn render(&self) -> String {
        let role = if self.onlysource {
            " (source only)".dimmed().to_string()
        } else {
            String::new()
        };
        format!("📅 {} {}{}", self.id, self.kind.dimmed(), role)
    }
}

impl Render for SyncStats {
    fn render(&self) -> String {
        if self.writes() == 0 {
            return format!("   No changes ({} in sync)", self.unchanged)
                .dimmed()
                .to_string();
        }

        let mut parts = Vec::new();
        if self.created > 0 {
            parts.push(format!("{} created", self.created).green().to_string());
        }
        if self.recreated > 0 {
            parts.push(format!("{} moved", self.recreated).yellow().to_string());
        }
        if self.orphans_removed > 0 {
            parts.push(format!("{} removed", self.orphans_removed).red().to_string());
        }
        if self.stray_placeholders_deleted > 0 {
            parts.push(
                format!("{} stray deleted", self.stray_placeholders_deleted)
                    .red()
                    .to_string(),
            );
        }
        format!("   {}", parts.join(", "))
    }
}

impl Render for SourceReport {
    fn render(&self) -> String {
        let header = format!("📅 {}", self.source);
        if self.fetch_failed {
            return format!("{}\n   {}", header, "Could not fetch events, skipped".red());
        }
        format!(
            "{} {}\n{}",
            header,
            format!("({} events)", self.fetched).dimmed(),
            self.stats.render()
        )
    }
}

impl Render for EventMapping {
    fn render(&self) -> String {
        format!(
            "{}/{} -> {}/{} {}",
            self.source_calendar,
            self.source_event_id,
            self.target_calendar,
            self.busy_event_id,
            format!(
                "{} - {}",
                self.start_time.format("%Y-%m-%d %H:%M"),
                self.end_time.format("%H:%M")
            )
            .dimmed()
        )
    }
}
