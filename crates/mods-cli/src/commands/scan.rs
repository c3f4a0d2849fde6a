//! Scan command implementation

use std::path::Path;

use colored::Colorize;
use mods_meta::{DirectoryScanner, ModScanner};

use crate::error::Result;

/// Run the scan command
pub async fn run_scan(dir: &Path) -> Result<()> {
    let mut found = DirectoryScanner::new(dir).scan().await?;
    // Raw and semantic versions do not compare; those fall back to text order.
    found.sort_by(|a, b| {
        a.id().cmp(b.id()).then_with(|| {
            a.version()
                .partial_cmp(b.version())
                .unwrap_or_else(|| a.version().to_string().cmp(&b.version().to_string()))
        })
    });

    println!("{} in {}", "Candidates".bold(), dir.display());
    println!();
    if found.is_empty() {
        println!("  {} (no mod.toml or *.mod.toml found)", "None".dimmed());
        return Ok(());
    }

    for meta in &found {
        let source = meta
            .source()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "  {} {} {} [{}] {}",
            "+".green(),
            meta.id().cyan(),
            meta.version(),
            meta.load_type(),
            source.dimmed()
        );
    }
    println!();
    println!("{} candidates", found.len());
    Ok(())
}
