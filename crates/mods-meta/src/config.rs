//! Resolver configuration loaded from `modsolve.toml`.
//!
//! ```toml
//! [resolver]
//! max_cycles = 32
//! relax_on_unsat = true
//!
//! [scan]
//! disabled = ["noisy-mod"]
//!
//! [overrides.alpha]
//! remove_depends = ["beta"]
//! remove_breaks = ["gamma"]
//! ```
//!
//! Every field has a default, so an empty or missing file is valid.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metadata::ModMetadata;

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "modsolve.toml";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub scan: ScanSettings,
    /// Per-mod dependency overrides, keyed by mod id
    #[serde(default)]
    pub overrides: BTreeMap<String, DependencyOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverSettings {
    /// Cycles allowed before resolution is declared non-terminating
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
    /// Whether one rule may be dropped automatically when no plugin repairs
    /// an unsatisfiable set
    #[serde(default = "default_relax")]
    pub relax_on_unsat: bool,
}

fn default_max_cycles() -> usize {
    32
}

fn default_relax() -> bool {
    true
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            relax_on_unsat: default_relax(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSettings {
    /// Mod ids dropped as soon as they are scanned; a tentative that resolves
    /// to one of them fails instead of loading it
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Entries to strip from a mod's metadata before rules are generated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyOverride {
    #[serde(default)]
    pub remove_depends: Vec<String>,
    #[serde(default)]
    pub remove_breaks: Vec<String>,
}

impl ResolverConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the file exists but is not valid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        Self::from_toml(&content).map_err(|message| Error::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if config.resolver.max_cycles == 0 {
            return Err("resolver.max_cycles must be at least 1".to_string());
        }
        Ok(config)
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.scan.disabled.iter().any(|d| d == id)
    }

    /// Apply the configured override for `meta`, if any.
    pub fn apply_overrides(&self, meta: ModMetadata) -> ModMetadata {
        match self.overrides.get(meta.id()) {
            Some(o) => {
                tracing::debug!(
                    id = meta.id(),
                    depends = ?o.remove_depends,
                    breaks = ?o.remove_breaks,
                    "applying dependency override"
                );
                meta.without_entries(&o.remove_depends, &o.remove_breaks)
            }
            None => meta,
        }
    }
}
