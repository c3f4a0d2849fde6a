//! Error types for mods-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Version(#[from] mods_version::Error),

    #[error(transparent)]
    Meta(#[from] mods_meta::Error),

    /// Resolution failed for a reason other than conflicting rules
    #[error(transparent)]
    Resolve(#[from] mods_core::ResolveError),

    /// The conflicting rules were already printed
    #[error("no consistent set of mods exists")]
    Unsatisfiable,

    #[error("failed to write JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
