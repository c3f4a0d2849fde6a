//! Load options, rules and the solver that chooses between them.
//!
//! ```text
//! ModMetadata ──► LoadOption ──┐
//!                              ├──► Solver ──► Assignment | UnsatCore
//!        Rule (RuleDefiner) ───┘      │
//!                                     └── SatSolver (CDCL, assumptions)
//! ```
//!
//! Options and rules can be added and removed between solves; the solver
//! keeps its learnt state across calls.

pub mod adapter;
pub mod error;
pub mod option;
pub mod rule;
pub mod sat;

pub use adapter::{Assignment, SolveOutcome, Solver, UnsatCore};
pub use error::{Error, Result};
pub use option::{
    ConcreteOption, LoadOption, OptionId, OptionUniverse, ProvidedOption, TentativeOption,
    version_rank,
};
pub use rule::{
    BreaksRule, DependsRule, IdDefinitionRule, MandatoryRule, OptionLit, PluginRule,
    ProvidesRule, Rule, RuleDefiner, RuleId, TentativeFailedRule,
};
pub use sat::{Lit, SatOutcome, SatSolver, SatStats, Var};
