use anyhow::{Context, Result};
use calsync_core::{MappingStore, Settings};
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn run(settings: &Settings, source: Option<&str>) -> Result<()> {
    let store = MappingStore::open(&settings.db_path)
        .with_context(|| format!("Failed to open mapping store at {}", settings.db_path.display()))?;

    let mappings = match source {
        Some(source) => store.list_for_source(source)?,
        None => store.list_all()?,
    };

    if mappings.is_empty() {
        println!("{}", "No mappings".dimmed());
        return Ok(());
    }

    for mapping in &mappings {
        println!("{}", mapping.render());
    }
    println!("\n{} mappings", mappings.len());

    Ok(())
}
