//! Candidate discovery.
//!
//! A [`ModScanner`] produces metadata for candidate mods. The resolver calls
//! every registered scanner once, in the first cycle.
//!
//! [`DirectoryScanner`] reads manifests below a root directory:
//!
//! ```text
//! mods/
//!   alpha/
//!     mod.toml
//!   beta/
//!     mod.toml
//!   gamma.mod.toml
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mods_version::Version;

use crate::error::{Error, Result};
use crate::manifest::{MANIFEST_FILENAME, MANIFEST_SUFFIX, load_manifest};
use crate::metadata::ModMetadata;

/// Source of candidate mods.
#[async_trait]
pub trait ModScanner: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Produce candidate metadata. Parse errors must be returned, not skipped.
    async fn scan(&self) -> Result<Vec<ModMetadata>>;
}

/// Scans a directory for `mod.toml` and `*.mod.toml` manifests.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    name: String,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = format!("dir:{}", root.display());
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Manifest paths below the root, sorted so that scans are deterministic.
    pub async fn manifest_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        let own = self.root.join(MANIFEST_FILENAME);
        if tokio::fs::try_exists(&own)
            .await
            .map_err(|e| Error::io(&own, e))?
        {
            paths.push(own);
        }

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestNotFound(self.root.clone()));
            }
            Err(e) => return Err(Error::io(&self.root, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io(&self.root, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::io(&path, e))?;

            if file_type.is_dir() {
                let nested = path.join(MANIFEST_FILENAME);
                if tokio::fs::try_exists(&nested)
                    .await
                    .map_err(|e| Error::io(&nested, e))?
                {
                    paths.push(nested);
                }
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(MANIFEST_SUFFIX))
            {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl ModScanner for DirectoryScanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan(&self) -> Result<Vec<ModMetadata>> {
        let paths = self.manifest_paths().await?;
        tracing::debug!(root = %self.root.display(), manifests = paths.len(), "scanning");

        let mut seen: HashMap<(String, Version), PathBuf> = HashMap::new();
        let mut found = Vec::with_capacity(paths.len());
        for path in paths {
            let meta = load_manifest(&path).await?;
            let key = (meta.id().to_string(), meta.version().clone());
            if let Some(first) = seen.get(&key) {
                return Err(Error::DuplicateManifest {
                    id: key.0,
                    version: key.1.to_string(),
                    first: first.clone(),
                    second: path,
                });
            }
            tracing::trace!(id = meta.id(), version = %meta.version(), "found candidate");
            seen.insert(key, path);
            found.push(meta);
        }
        Ok(found)
    }
}
