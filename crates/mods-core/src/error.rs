//! Error types for mods-core

use crate::blame::ResolutionFailure;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Why [`Resolver::resolve`](crate::Resolver::resolve) failed.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A version or predicate could not be parsed.
    #[error(transparent)]
    Parse(#[from] mods_version::Error),

    /// Candidate discovery failed, including malformed manifests.
    #[error(transparent)]
    Scan(#[from] mods_meta::Error),

    /// No consistent mod set exists.
    #[error("{0}")]
    Unsatisfiable(Box<ResolutionFailure>),

    /// A plugin broke the resolution contract. Never retried.
    #[error("internal consistency failure: {message}")]
    InternalConsistency { message: String },

    /// A plugin hook reported a fatal error.
    #[error("plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// Asynchronous work failed and its owner marked the failure fatal.
    #[error("work item '{label}' failed: {message}")]
    WorkFailed { label: String, message: String },

    /// Metadata hands its rules to a plugin that is not registered.
    #[error("mod '{mod_id}' delegates to unknown plugin '{plugin}'")]
    UnknownPlugin { mod_id: String, plugin: String },

    #[error(transparent)]
    Solver(#[from] mods_solver::Error),
}

impl ResolveError {
    pub(crate) fn consistency(message: impl Into<String>) -> Self {
        Self::InternalConsistency {
            message: message.into(),
        }
    }

    pub(crate) fn plugin(plugin: &str, message: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.to_string(),
            message: message.into(),
        }
    }

    /// The blame chain, for unsatisfiable resolutions.
    pub fn failure(&self) -> Option<&ResolutionFailure> {
        match self {
            Self::Unsatisfiable(failure) => Some(failure),
            _ => None,
        }
    }
}
