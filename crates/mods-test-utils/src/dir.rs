//! [`TestModsDir`] for scenarios that read manifests from disk.

use std::fs;
use std::path::{Path, PathBuf};

use mods_meta::{CONFIG_FILENAME, MANIFEST_FILENAME};
use tempfile::TempDir;

use crate::manifest::ManifestBuilder;

/// A temporary mods directory.
///
/// # Example
///
/// ```rust,no_run
/// use mods_test_utils::{ManifestBuilder, TestModsDir};
///
/// let dir = TestModsDir::new();
/// dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("beta", ">=1"));
/// dir.add_mod(ManifestBuilder::new("beta", "1.2").load_type("if_required"));
/// dir.write_config("[resolver]\nmax_cycles = 8\n");
/// ```
pub struct TestModsDir {
    temp_dir: TempDir,
}

impl Default for TestModsDir {
    fn default() -> Self {
        Self::new()
    }
}

impl TestModsDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `name` below the root, creating parent directories.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a manifest as `<dir>/mod.toml`.
    pub fn write_manifest(&self, dir: &str, content: &str) -> PathBuf {
        self.write_file(&format!("{dir}/{MANIFEST_FILENAME}"), content)
    }

    /// Write a built manifest into a directory named `<id>-<version>`, so
    /// several versions of one mod can sit side by side.
    pub fn add_mod(&self, manifest: ManifestBuilder) -> PathBuf {
        let dir = format!("{}-{}", manifest.id(), manifest.version());
        self.write_manifest(&dir, &manifest.build())
    }

    /// Write `modsolve.toml` at the root.
    pub fn write_config(&self, content: &str) -> PathBuf {
        self.write_file(CONFIG_FILENAME, content)
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }
}
