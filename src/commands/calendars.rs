use anyhow::Result;
use calsync_core::{ProviderRegistry, Settings};
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn run(settings: &Settings) -> Result<()> {
    let registry = ProviderRegistry::builtin();

    for calendar in &settings.calendars {
        if registry.knows(&calendar.kind) {
            println!("{}", calendar.render());
        } else {
            println!(
                "{} {}",
                calendar.render(),
                format!("unknown type, expected one of: {}", registry.kinds().join(", ")).red()
            );
        }
    }

    Ok(())
}
