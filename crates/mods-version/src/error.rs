//! Error types for mods-version

/// Result type for version parsing and interval operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing versions and predicates or building intervals
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A version string could not be parsed
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// A predicate string could not be parsed
    #[error("invalid version predicate '{predicate}': {reason}")]
    InvalidPredicate { predicate: String, reason: String },

    /// Interval bounds violate an invariant (min > max, or an empty point)
    #[error("invalid version interval: {reason}")]
    InvalidInterval { reason: String },

    /// The operation needs semantic versions but a raw bound was supplied
    #[error("{operation} requires semantic version bounds")]
    NonSemantic { operation: &'static str },
}

impl Error {
    pub(crate) fn version(version: &str, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn predicate(predicate: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            predicate: predicate.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn interval(reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            reason: reason.into(),
        }
    }
}
