//! Asynchronous plugin work and the join barrier.
//!
//! Plugins hand the resolver futures: either extra candidates to scan, or
//! the resolution of a tentative option. Each future is spawned on the tokio
//! runtime as soon as it is merged and joined at the start of the next cycle.
//! Dropping a [`WorkQueue`] abandons whatever is still running; results that
//! arrive afterwards go nowhere.

use std::future::Future;
use std::pin::Pin;

use mods_meta::ModMetadata;
use mods_solver::OptionId;
use tokio::task::JoinHandle;

/// A boxed, spawnable unit of plugin work.
pub type WorkFuture<T> = Pin<Box<dyn Future<Output = Result<T, WorkError>> + Send + 'static>>;

/// Failure of a work item.
///
/// A non-fatal failure of a tentative resolution forbids that option and
/// becomes part of any unsat core; a fatal one aborts the resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WorkError {
    pub message: String,
    pub fatal: bool,
}

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

/// What a tentative resolver is asked to materialise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TentativeRequest {
    pub key: String,
    pub mod_id: String,
    pub version: mods_version::Version,
}

/// Turns a selected tentative option into concrete metadata.
pub type TentativeResolver = Box<dyn FnOnce(TentativeRequest) -> WorkFuture<ModMetadata> + Send>;

#[derive(Debug)]
enum Job {
    Candidates(JoinHandle<Result<Vec<ModMetadata>, WorkError>>),
    Tentative {
        option: OptionId,
        handle: JoinHandle<Result<ModMetadata, WorkError>>,
    },
}

#[derive(Debug)]
struct PendingWork {
    plugin: String,
    label: String,
    job: Job,
}

/// The outcome of one joined work item.
#[derive(Debug)]
pub enum Completed {
    Candidates {
        plugin: String,
        label: String,
        result: Result<Vec<ModMetadata>, WorkError>,
    },
    Tentative {
        plugin: String,
        label: String,
        option: OptionId,
        result: Result<ModMetadata, WorkError>,
    },
}

/// Work in flight for the current cycle.
#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: Vec<PendingWork>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn spawn_candidates(
        &mut self,
        plugin: &str,
        label: impl Into<String>,
        work: WorkFuture<Vec<ModMetadata>>,
    ) {
        let label = label.into();
        tracing::debug!(plugin, %label, "spawning candidate work");
        self.pending.push(PendingWork {
            plugin: plugin.to_string(),
            label,
            job: Job::Candidates(tokio::spawn(work)),
        });
    }

    pub fn spawn_tentative(
        &mut self,
        plugin: &str,
        option: OptionId,
        request: TentativeRequest,
        resolver: TentativeResolver,
    ) {
        let label = request.key.clone();
        tracing::debug!(plugin, %label, %option, "resolving tentative option");
        let work = resolver(request);
        self.pending.push(PendingWork {
            plugin: plugin.to_string(),
            label,
            job: Job::Tentative {
                option,
                handle: tokio::spawn(work),
            },
        });
    }

    /// Wait for every pending item, in submission order.
    ///
    /// A panicking work item is reported as a fatal [`WorkError`].
    pub async fn join_all(&mut self) -> Vec<Completed> {
        let mut done = Vec::with_capacity(self.pending.len());
        for PendingWork { plugin, label, job } in self.pending.drain(..) {
            done.push(match job {
                Job::Candidates(handle) => Completed::Candidates {
                    result: flatten(handle.await),
                    plugin,
                    label,
                },
                Job::Tentative { option, handle } => Completed::Tentative {
                    result: flatten(handle.await),
                    plugin,
                    label,
                    option,
                },
            });
        }
        done
    }
}

fn flatten<T>(joined: Result<Result<T, WorkError>, tokio::task::JoinError>) -> Result<T, WorkError> {
    joined.unwrap_or_else(|e| Err(WorkError::fatal(format!("work item panicked: {e}"))))
}
