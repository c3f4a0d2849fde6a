//! Version predicates as written in mod manifests.
//!
//! A predicate is a space-separated list of terms that must all hold:
//!
//! | Term       | Meaning                                        |
//! |------------|------------------------------------------------|
//! | `>=1.2`    | at least 1.2                                   |
//! | `<=1.2`    | at most 1.2                                    |
//! | `>1.2`     | above 1.2                                      |
//! | `<1.2`     | below 1.2                                      |
//! | `=1.2`     | exactly 1.2 (also the bare form `1.2`)         |
//! | `~1.2.3`   | at least 1.2.3, below 1.3 (same major.minor)   |
//! | `^1.2.3`   | at least 1.2.3, below 2 (same major)           |
//! | `1.2.x`    | same as `~1.2.0`                               |
//! | `1.x`      | same as `^1.0`                                 |
//! | `*`        | any version                                    |
//!
//! Raw reference versions only support equality; `>=`, `<=`, `~` and `^`
//! degrade to `=` while `>` and `<` are rejected.
//!
//! # Examples
//!
//! ```
//! use mods_version::{Version, VersionPredicate};
//!
//! let predicate = VersionPredicate::parse(">=1.2 <2").unwrap();
//! assert!(predicate.test(&Version::parse("1.9.1").unwrap()));
//! assert!(!predicate.test(&Version::parse("2.0").unwrap()));
//! assert_eq!(predicate.range().to_string(), "[1.2,2)");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::interval::{IntervalBuilder, VersionInterval};
use crate::range::VersionRange;
use crate::version::{SemanticVersion, Version};

/// Comparison operator of a single predicate term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// `>=`
    GreaterEqual,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `=`
    Equal,
    /// `~`
    SameToNextMinor,
    /// `^`
    SameToNextMajor,
}

impl ComparisonOperator {
    /// Operators in prefix-matching order; two-character symbols come first.
    pub const ALL: [Self; 7] = [
        Self::GreaterEqual,
        Self::LessEqual,
        Self::Greater,
        Self::Less,
        Self::Equal,
        Self::SameToNextMinor,
        Self::SameToNextMajor,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::Equal => "=",
            Self::SameToNextMinor => "~",
            Self::SameToNextMajor => "^",
        }
    }

    /// Whether the reference version itself satisfies the operator from below.
    pub fn is_min_inclusive(self) -> bool {
        matches!(
            self,
            Self::GreaterEqual | Self::Equal | Self::SameToNextMinor | Self::SameToNextMajor
        )
    }

    /// Whether the reference version itself satisfies the operator from above.
    pub fn is_max_inclusive(self) -> bool {
        matches!(self, Self::LessEqual | Self::Equal)
    }

    /// Test `candidate` against `reference` directly, without building an interval.
    pub fn test(self, candidate: &Version, reference: &Version) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        let ord = candidate.partial_cmp(reference);
        match self {
            Self::GreaterEqual => matches!(ord, Some(Greater | Equal)),
            Self::LessEqual => matches!(ord, Some(Less | Equal)),
            Self::Greater => ord == Some(Greater),
            Self::Less => ord == Some(Less),
            Self::Equal => ord == Some(Equal),
            Self::SameToNextMinor | Self::SameToNextMajor => {
                let (Some(c), Some(r)) = (candidate.as_semantic(), reference.as_semantic()) else {
                    return ord == Some(Equal);
                };
                let shared = if self == Self::SameToNextMinor { 2 } else { 1 };
                c >= r && (0..shared).all(|i| c.number(i) == r.number(i))
            }
        }
    }

    /// The interval of versions satisfying this operator against `reference`.
    ///
    /// # Errors
    ///
    /// Fails for exclusive operators on raw versions or when the next
    /// major/minor would overflow.
    pub fn interval(self, reference: &Version) -> Result<VersionInterval> {
        let Some(sv) = reference.as_semantic() else {
            return match self {
                Self::Greater | Self::Less => Err(Error::NonSemantic {
                    operation: "an exclusive comparison",
                }),
                _ => Ok(VersionInterval::exact(reference.clone())),
            };
        };

        let builder = IntervalBuilder::new();
        match self {
            Self::GreaterEqual => builder.min(reference.clone(), true).build(),
            Self::Greater => builder.min(reference.clone(), false).build(),
            Self::LessEqual => builder.max(reference.clone(), true).build(),
            Self::Less => builder.max(reference.clone(), false).build(),
            Self::Equal => Ok(VersionInterval::exact(reference.clone())),
            Self::SameToNextMinor => {
                let minor = sv.number(1).checked_add(1).ok_or_else(|| {
                    Error::interval(format!("minor version of {sv} cannot be incremented"))
                })?;
                let upper = SemanticVersion::new(vec![sv.number(0), minor], Some(String::new()), None)?;
                builder
                    .min(reference.clone(), true)
                    .max(upper.into(), false)
                    .build()
            }
            Self::SameToNextMajor => {
                let major = sv.number(0).checked_add(1).ok_or_else(|| {
                    Error::interval(format!("major version of {sv} cannot be incremented"))
                })?;
                let upper = SemanticVersion::new(vec![major], Some(String::new()), None)?;
                builder
                    .min(reference.clone(), true)
                    .max(upper.into(), false)
                    .build()
            }
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One `operator version` pair of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateTerm {
    operator: ComparisonOperator,
    reference: Version,
}

impl PredicateTerm {
    pub fn new(operator: ComparisonOperator, reference: Version) -> Self {
        Self {
            operator,
            reference,
        }
    }

    /// Parse a single term such as `>=1.2`, `~1.4.0` or `1.x`.
    pub fn parse(term: &str) -> Result<Self> {
        let (operator, rest) = ComparisonOperator::ALL
            .iter()
            .find_map(|op| term.strip_prefix(op.symbol()).map(|rest| (*op, rest)))
            .unwrap_or((ComparisonOperator::Equal, term));

        if rest.is_empty() {
            return Err(Error::predicate(term, "missing version after operator"));
        }
        let reference = Version::parse_reference(rest)
            .map_err(|e| Error::predicate(term, e.to_string()))?;

        match reference {
            Version::Semantic(sv) if sv.has_wildcard() => {
                if operator != ComparisonOperator::Equal {
                    return Err(Error::predicate(
                        term,
                        format!("wildcards cannot be combined with '{operator}'"),
                    ));
                }
                let operator = match sv.component_count() {
                    2 => ComparisonOperator::SameToNextMajor,
                    3 => ComparisonOperator::SameToNextMinor,
                    n => {
                        return Err(Error::predicate(
                            term,
                            format!("wildcard versions need 2 or 3 components, found {n}"),
                        ));
                    }
                };
                if sv.numbers().len() + 1 != sv.component_count() {
                    return Err(Error::predicate(term, "only the last component may be a wildcard"));
                }
                Ok(Self::new(operator, sv.without_wildcards().into()))
            }
            Version::Raw(_) => {
                if !operator.is_min_inclusive() && !operator.is_max_inclusive() {
                    return Err(Error::predicate(
                        term,
                        format!("'{operator}' cannot be used with a non-semantic version"),
                    ));
                }
                Ok(Self::new(ComparisonOperator::Equal, reference))
            }
            Version::Semantic(_) => Ok(Self::new(operator, reference)),
        }
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn reference(&self) -> &Version {
        &self.reference
    }

    pub fn test(&self, version: &Version) -> bool {
        self.operator.test(version, &self.reference)
    }

    pub fn interval(&self) -> Result<VersionInterval> {
        self.operator.interval(&self.reference)
    }
}

impl fmt::Display for PredicateTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.reference)
    }
}

/// A conjunction of [`PredicateTerm`]s; no terms means any version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPredicate {
    terms: Vec<PredicateTerm>,
    range: VersionRange,
}

impl VersionPredicate {
    /// Parse a predicate string.
    ///
    /// Empty terms and `*` are skipped, so `""` and `"*"` both match any version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPredicate`] for malformed terms.
    pub fn parse(predicate: &str) -> Result<Self> {
        let mut terms = Vec::new();
        for term in predicate.split(' ') {
            let term = term.trim();
            if term.is_empty() || term == "*" {
                continue;
            }
            terms.push(PredicateTerm::parse(term)?);
        }
        Self::from_terms(terms).map_err(|e| match e {
            Error::InvalidPredicate { .. } => e,
            other => Error::predicate(predicate, other.to_string()),
        })
    }

    /// Build a predicate from already-parsed terms.
    pub fn from_terms(terms: Vec<PredicateTerm>) -> Result<Self> {
        let mut range = VersionRange::any();
        for term in &terms {
            range = range.intersect_interval(&term.interval()?);
        }
        Ok(Self { terms, range })
    }

    /// The predicate matching every version.
    pub fn any() -> Self {
        Self {
            terms: Vec::new(),
            range: VersionRange::any(),
        }
    }

    /// The predicate matching exactly `version`.
    pub fn exact(version: Version) -> Self {
        let interval = VersionInterval::exact(version.clone());
        Self {
            terms: vec![PredicateTerm::new(ComparisonOperator::Equal, version)],
            range: interval.into(),
        }
    }

    pub fn terms(&self) -> &[PredicateTerm] {
        &self.terms
    }

    pub fn is_any(&self) -> bool {
        self.terms.is_empty()
    }

    /// The set of matching versions as a range.
    pub fn range(&self) -> &VersionRange {
        &self.range
    }

    pub fn test(&self, version: &Version) -> bool {
        self.terms.iter().all(|t| t.test(version))
    }
}

/// Whether any predicate of a constraint set accepts `version`.
///
/// An empty set accepts everything.
pub fn any_matches(predicates: &[VersionPredicate], version: &Version) -> bool {
    predicates.is_empty() || predicates.iter().any(|p| p.test(version))
}

/// Union of the ranges of a constraint set.
pub fn union_range(predicates: &[VersionPredicate]) -> VersionRange {
    if predicates.is_empty() {
        return VersionRange::any();
    }
    predicates
        .iter()
        .fold(VersionRange::empty(), |acc, p| acc.union(p.range()))
}

impl fmt::Display for VersionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("*");
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionPredicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionPredicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
