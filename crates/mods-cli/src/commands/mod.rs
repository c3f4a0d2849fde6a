//! Command implementations for mods-cli

pub mod predicate;
pub mod resolve;
pub mod scan;

pub use predicate::run_predicate;
pub use resolve::run_resolve;
pub use scan::run_scan;
