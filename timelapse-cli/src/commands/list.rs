//! List command - show the video catalog

use anyhow::{Context, Result};
use timelapse_core::Catalog;

use super::{truncate, Settings};

/// List every video the server would stream
pub fn list(settings: &Settings) -> Result<()> {
    let config = settings.load()?;
    let catalog = Catalog::build(&config.groups).context("Failed to build video catalog")?;

    println!("Timelapse - Video Catalog\n");

    println!("{:<32} {:<20} {:<8} {}", "Filename", "Group", "Status", "Path");
    println!("{}", "-".repeat(90));

    for entry in catalog.entries() {
        let path = entry.path();
        let status = if path.is_file() { "ready" } else { "missing" };
        println!(
            "{:<32} {:<20} {:<8} {}",
            truncate(&entry.filename, 32),
            truncate(entry.group.display_title(), 20),
            status,
            path.display()
        );
    }

    println!("\nStream at /stream/<filename>. Missing videos appear after the next generation pass.");

    Ok(())
}
