//! Resolve command implementation

use std::path::Path;

use colored::Colorize;
use mods_core::{ModSolveResult, ResolutionFailure, ResolveError, Resolver};
use mods_meta::{CONFIG_FILENAME, DirectoryScanner, ResolverConfig};

use crate::error::{CliError, Result};

/// Run the resolve command
pub async fn run_resolve(dir: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let config = match config {
        Some(path) if !path.exists() => {
            return Err(CliError::user(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::load(&dir.join(CONFIG_FILENAME))?,
    };

    let outcome = Resolver::builder()
        .scanner(DirectoryScanner::new(dir))
        .config(config)
        .build()
        .resolve()
        .await;

    match outcome {
        Ok(result) if json => {
            println!("{}", serde_json::to_string_pretty(&result.report())?);
            Ok(())
        }
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(ResolveError::Unsatisfiable(failure)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&failure_json(&failure))?);
            } else {
                print_failure(&failure);
            }
            Err(CliError::Unsatisfiable)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_result(result: &ModSolveResult) {
    println!("{}", "Resolved Mods".bold());
    println!();
    if result.direct().is_empty() {
        println!("  {}", "None".dimmed());
    }
    for meta in result.direct().values() {
        println!("  {} {} {}", "+".green(), meta.id().cyan(), meta.version());
    }

    if !result.provided().is_empty() {
        println!();
        println!("{}:", "Provided".bold());
        for (id, selection) in result.provided() {
            println!(
                "  {} {} {} (by {})",
                "+".green(),
                id.cyan(),
                selection.version,
                selection.provider.id()
            );
        }
    }

    if !result.relaxed_rules().is_empty() {
        println!();
        println!("{}:", "Relaxed Rules".yellow().bold());
        for rule in result.relaxed_rules() {
            println!("  {} {}", "!".yellow(), rule);
        }
    }
}

fn print_failure(failure: &ResolutionFailure) {
    eprintln!("{}", "No consistent set of mods exists".red().bold());
    if let Some(blamed) = &failure.blamed {
        eprintln!("{}:  {}", "Blamed".dimmed(), blamed.yellow());
    }
    eprintln!();
    for (i, rule) in failure.chain.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, rule.description);
    }
    eprintln!();
}

fn failure_json(failure: &ResolutionFailure) -> serde_json::Value {
    serde_json::json!({
        "error": "unsatisfiable",
        "blamed": failure.blamed,
        "chain": failure
            .chain
            .iter()
            .map(|r| serde_json::json!({
                "kind": r.kind,
                "description": r.description,
                "reason": r.reason,
                "owner": r.owner,
            }))
            .collect::<Vec<_>>(),
    })
}
