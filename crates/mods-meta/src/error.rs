//! Error types for mods-meta

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `mod.toml` could not be parsed.
    #[error("failed to parse manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A manifest was expected but is missing.
    #[error("mod manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    /// A mod id does not follow the id rules.
    #[error("invalid mod id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// A manifest field holds a value outside its allowed set.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A version or predicate in the metadata is malformed.
    #[error(transparent)]
    Version(#[from] mods_version::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// Two manifests declare the same id and version.
    #[error("mod '{id}' {version} is declared by both {first} and {second}")]
    DuplicateManifest {
        id: String,
        version: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
