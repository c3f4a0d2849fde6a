//! Mod metadata for the resolver: the in-memory model, `mod.toml`
//! manifests, candidate scanning and resolver configuration.
//!
//! ```text
//! mods/alpha/mod.toml ──▶ ModManifest ──▶ ModMetadata ──▶ resolver
//!                          (toml/serde)    (validated)
//! DirectoryScanner: ModScanner ─────────────┘
//! modsolve.toml ──▶ ResolverConfig (limits, disabled ids, overrides)
//! ```

pub mod config;
pub mod error;
pub mod manifest;
pub mod metadata;
pub mod scanner;

pub use config::{CONFIG_FILENAME, DependencyOverride, ResolverConfig, ResolverSettings, ScanSettings};
pub use error::{Error, Result};
pub use manifest::{MANIFEST_FILENAME, MANIFEST_SUFFIX, ModManifest, load_manifest};
pub use metadata::{
    DependencyHandling, LoadType, ModDependency, ModMetadata, ModMetadataBuilder, ProvidedMod,
    validate_id,
};
pub use scanner::{DirectoryScanner, ModScanner};
