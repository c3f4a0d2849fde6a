//! Shorthands for in-memory metadata.

use mods_meta::{LoadType, ModDependency, ModMetadata};
use mods_version::Version;

/// Parse a version, panicking on malformed input.
pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

/// An `always` mod with no relations.
pub fn required_mod(id: &str, version: &str) -> ModMetadata {
    ModMetadata::builder(id, v(version)).build().unwrap()
}

/// An `if_required` mod with no relations.
pub fn library(id: &str, version: &str) -> ModMetadata {
    with_load_type(id, version, LoadType::IfRequired)
}

/// An `if_possible` mod with no relations.
pub fn optional_mod(id: &str, version: &str) -> ModMetadata {
    with_load_type(id, version, LoadType::IfPossible)
}

fn with_load_type(id: &str, version: &str, load_type: LoadType) -> ModMetadata {
    ModMetadata::builder(id, v(version))
        .load_type(load_type)
        .build()
        .unwrap()
}

/// A dependency on `id`; `versions` may be empty for any version.
pub fn dep(id: &str, versions: &str) -> ModDependency {
    let dependency = ModDependency::new(id).unwrap();
    if versions.is_empty() {
        dependency
    } else {
        dependency.version(versions).unwrap()
    }
}
