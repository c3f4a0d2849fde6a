//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// modsolve - Resolve a consistent set of mods from their manifests
#[derive(Parser, Debug)]
#[command(name = "modsolve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve the mods in a directory
    ///
    /// Reads every mod.toml and *.mod.toml below DIR, picks a consistent
    /// set of mods and prints it. Exits with status 1 and prints the chain
    /// of conflicting rules when no such set exists.
    ///
    /// Examples:
    ///   modsolve resolve mods/
    ///   modsolve resolve mods/ --config modsolve.toml --json
    Resolve {
        /// Directory holding mod manifests
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Resolver configuration (defaults to DIR/modsolve.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List the candidate mods found in a directory
    Scan {
        /// Directory holding mod manifests
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Check versions against a version predicate
    ///
    /// Examples:
    ///   modsolve predicate '>=1.2 <2' 1.5.0 2.0.0
    ///   modsolve predicate '1.4.x' 1.4.7
    Predicate {
        /// The predicate, e.g. ">=1.0.0 <2.0.0", "^1.2" or "2.x"
        predicate: String,

        /// Versions to test
        #[arg(required = true)]
        versions: Vec<String>,
    },
}
