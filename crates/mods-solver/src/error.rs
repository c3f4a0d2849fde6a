//! Error types for mods-solver

use crate::option::OptionId;
use crate::rule::RuleId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unknown load option {0}")]
    UnknownOption(OptionId),

    #[error("unknown rule {0}")]
    UnknownRule(RuleId),

    /// The option existed but has been removed from the universe.
    #[error("load option {0} has been removed")]
    OptionRemoved(OptionId),
}
