//! Predicate command implementation

use colored::Colorize;
use mods_version::{Version, VersionPredicate};

use crate::error::Result;

/// Run the predicate command
pub fn run_predicate(predicate: &str, versions: &[String]) -> Result<()> {
    let parsed = VersionPredicate::parse(predicate)?;
    println!("{}:  {}", "Predicate".dimmed(), parsed);
    println!("{}:      {}", "Range".dimmed(), parsed.range());
    println!();

    for raw in versions {
        let version = Version::parse(raw)?;
        if parsed.test(&version) {
            println!("  {} {} {}", "+".green(), version.to_string().cyan(), "matches".green());
        } else {
            println!("  {} {} {}", "-".red(), version.to_string().cyan(), "does not match".red());
        }
    }
    Ok(())
}
