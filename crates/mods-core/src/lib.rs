//! Mod resolution: from candidate metadata to one consistent, explainable
//! set of mods.
//!
//! [`Resolver`] drives repeated scan → rule generation → solve cycles.
//! Candidates come from [`mods_meta::ModScanner`]s or are passed in
//! directly; [`Plugin`]s may add options and rules, register tentative
//! options and run asynchronous work between cycles. The outcome is either
//! an immutable [`ModSolveResult`] or a [`ResolveError`], which for
//! unsatisfiable inputs carries a blame chain ([`ResolutionFailure`]).

pub mod blame;
pub mod context;
pub mod error;
pub mod generator;
pub mod plugin;
pub mod resolver;
pub mod result;
pub mod work;

pub use blame::{BlamedRule, ResolutionFailure};
pub use context::{OptionRef, RuleContext, RuleSpec, TentativeSpec, UnsatContext};
pub use error::{ResolveError, Result};
pub use generator::RuleGenerator;
pub use plugin::{Hook, Plugin, PluginError, PluginHooks, UnsatResponse};
pub use resolver::{Resolver, ResolverBuilder};
pub use result::{ModSolveResult, ProvidedSelection, ResolutionReport, ResolvedAlias, ResolvedMod};
pub use work::{TentativeRequest, WorkError};
