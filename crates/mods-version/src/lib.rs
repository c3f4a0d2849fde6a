//! Versions, version intervals and version predicates for mod resolution.
//!
//! ```text
//! "^1.2 <1.8"          "1.4.0"
//!      │                  │
//!      ▼                  ▼
//! VersionPredicate ──▶ Version ──▶ SemanticVersion | Raw
//!      │
//!      ▼
//! VersionRange = [VersionInterval, ...]   (union, intersect, complement)
//! ```
//!
//! - [`Version`] parses semantic versions with any number of components and
//!   falls back to opaque raw versions.
//! - [`VersionInterval`] and [`VersionRange`] form a small set algebra used to
//!   reason about which versions a dependency admits.
//! - [`VersionPredicate`] parses the constraint syntax used in manifests.

pub mod error;
pub mod interval;
pub mod predicate;
pub mod range;
pub mod version;

pub use error::{Error, Result};
pub use interval::{Bound, IntervalBuilder, VersionInterval};
pub use predicate::{ComparisonOperator, PredicateTerm, VersionPredicate, any_matches, union_range};
pub use range::VersionRange;
pub use version::{Component, SemanticVersion, Version};
