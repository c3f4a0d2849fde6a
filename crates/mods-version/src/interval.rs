//! Version intervals.
//!
//! A [`VersionInterval`] is a single contiguous span of versions with optional
//! lower and upper bounds. A missing bound is unbounded in that direction; an
//! interval with neither bound contains every version, raw ones included.
//!
//! Raw versions can only appear as a single inclusive point `[r, r]`.
//! Empty intervals are never constructed: operations that could produce one
//! return `None` or an empty [`VersionRange`] instead.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::range::VersionRange;
use crate::version::Version;

/// One endpoint of an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    pub fn exclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }

    /// The same version with inclusivity inverted.
    pub fn flipped(&self) -> Self {
        Self {
            version: self.version.clone(),
            inclusive: !self.inclusive,
        }
    }
}

/// A contiguous, non-empty set of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInterval {
    min: Option<Bound>,
    max: Option<Bound>,
}

impl VersionInterval {
    /// Create an interval, validating its bounds.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInterval`] if `min > max`, or `min == max` without both
    ///   bounds inclusive
    /// - [`Error::NonSemantic`] if a raw bound is not part of an inclusive point
    pub fn new(min: Option<Bound>, max: Option<Bound>) -> Result<Self> {
        match (&min, &max) {
            (None, None) => {}
            (Some(lo), Some(hi)) if !lo.version.is_semantic() || !hi.version.is_semantic() => {
                if lo.version != hi.version || !lo.inclusive || !hi.inclusive {
                    return Err(Error::NonSemantic {
                        operation: "a bounded interval",
                    });
                }
            }
            (Some(lo), Some(hi)) => match lo.version.partial_cmp(&hi.version) {
                Some(Ordering::Less) => {}
                Some(Ordering::Equal) if lo.inclusive && hi.inclusive => {}
                Some(Ordering::Equal) => {
                    return Err(Error::interval(format!(
                        "point {} must have inclusive bounds",
                        lo.version
                    )));
                }
                _ => {
                    return Err(Error::interval(format!(
                        "lower bound {} is above upper bound {}",
                        lo.version, hi.version
                    )));
                }
            },
            (Some(b), None) | (None, Some(b)) => {
                if !b.version.is_semantic() {
                    return Err(Error::NonSemantic {
                        operation: "a half-bounded interval",
                    });
                }
            }
        }
        Ok(Self { min, max })
    }

    /// The interval containing every version.
    pub fn any() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// The single-version interval `[v, v]`. Valid for raw versions too.
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(Bound::inclusive(version.clone())),
            max: Some(Bound::inclusive(version)),
        }
    }

    pub fn min(&self) -> Option<&Bound> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Bound> {
        self.max.as_ref()
    }

    /// Whether this interval has no bounds at all.
    pub fn is_any(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Whether every present bound is a semantic version.
    pub fn is_semantic(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|b| b.version.is_semantic())
    }

    /// Check whether `version` lies inside the interval.
    ///
    /// Bounded semantic intervals never contain raw versions and raw points
    /// only contain the identical raw version.
    pub fn contains(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            match version.partial_cmp(&min.version) {
                Some(Ordering::Greater) => {}
                Some(Ordering::Equal) if min.inclusive => {}
                _ => return false,
            }
        }
        if let Some(max) = &self.max {
            match version.partial_cmp(&max.version) {
                Some(Ordering::Less) => {}
                Some(Ordering::Equal) if max.inclusive => {}
                _ => return false,
            }
        }
        true
    }

    /// Intersect two intervals; `None` when they share no version.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self.is_any() {
            return Some(other.clone());
        }
        if other.is_any() {
            return Some(self.clone());
        }
        if !self.is_semantic() || !other.is_semantic() {
            // only identical raw points overlap
            return (self == other).then(|| self.clone());
        }

        let min = match compare_min(self.min.as_ref(), other.min.as_ref()) {
            Ordering::Less => other.min.clone(),
            _ => self.min.clone(),
        };
        let max = match compare_max(self.max.as_ref(), other.max.as_ref()) {
            Ordering::Greater => other.max.clone(),
            _ => self.max.clone(),
        };

        if let (Some(lo), Some(hi)) = (&min, &max) {
            match lo.version.partial_cmp(&hi.version) {
                Some(Ordering::Less) => {}
                Some(Ordering::Equal) if lo.inclusive && hi.inclusive => {}
                _ => return None,
            }
        }
        Some(Self { min, max })
    }

    /// Replace the upper bound of an already-ordered interval.
    pub(crate) fn extended_to(&self, max: Option<Bound>) -> Self {
        Self {
            min: self.min.clone(),
            max,
        }
    }

    /// The versions not in this interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonSemantic`] for raw points.
    pub fn complement(&self) -> Result<VersionRange> {
        if self.is_any() {
            return Ok(VersionRange::empty());
        }
        if !self.is_semantic() {
            return Err(Error::NonSemantic {
                operation: "complement",
            });
        }

        let mut pieces = Vec::with_capacity(2);
        if let Some(min) = &self.min {
            pieces.push(Self::new(None, Some(min.flipped()))?);
        }
        if let Some(max) = &self.max {
            pieces.push(Self::new(Some(max.flipped()), None)?);
        }
        Ok(VersionRange::from_intervals(pieces))
    }
}

/// Order two lower bounds: unbounded first, and at equal versions an
/// inclusive bound before an exclusive one.
///
/// Only meaningful for semantic bounds; raw bounds compare by string.
pub(crate) fn compare_min(a: Option<&Bound>, b: Option<&Bound>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a
            .version
            .partial_cmp(&b.version)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.inclusive.cmp(&a.inclusive)),
    }
}

/// Order two upper bounds: unbounded last, and at equal versions an
/// exclusive bound before an inclusive one.
pub(crate) fn compare_max(a: Option<&Bound>, b: Option<&Bound>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a
            .version
            .partial_cmp(&b.version)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.inclusive.cmp(&b.inclusive)),
    }
}

impl fmt::Display for VersionInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str("*");
        }
        match &self.min {
            Some(b) if b.inclusive => write!(f, "[{}", b.version)?,
            Some(b) => write!(f, "({}", b.version)?,
            None => f.write_str("(")?,
        }
        f.write_str(",")?;
        match &self.max {
            Some(b) if b.inclusive => write!(f, "{}]", b.version),
            Some(b) => write!(f, "{})", b.version),
            None => f.write_str(")"),
        }
    }
}

/// Fluent construction of a [`VersionInterval`], validated on `build`.
#[derive(Debug, Clone, Default)]
pub struct IntervalBuilder {
    min: Option<Bound>,
    max: Option<Bound>,
}

impl IntervalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, version: Version, inclusive: bool) -> Self {
        self.min = Some(Bound { version, inclusive });
        self
    }

    pub fn max(mut self, version: Version, inclusive: bool) -> Self {
        self.max = Some(Bound { version, inclusive });
        self
    }

    pub fn build(self) -> Result<VersionInterval> {
        VersionInterval::new(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn closed_open(lo: &str, hi: &str) -> VersionInterval {
        IntervalBuilder::new()
            .min(v(lo), true)
            .max(v(hi), false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        let err = IntervalBuilder::new()
            .min(v("2.0"), true)
            .max(v("1.0"), true)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInterval { .. }));
    }

    #[test]
    fn test_new_rejects_half_open_point() {
        assert!(
            IntervalBuilder::new()
                .min(v("1.0"), true)
                .max(v("1.0"), false)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_new_rejects_raw_range() {
        let err = IntervalBuilder::new()
            .min(v("nightly"), true)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::NonSemantic { .. }));
    }

    #[test]
    fn test_contains_respects_inclusivity() {
        let interval = closed_open("1.0.0", "2.0.0");
        assert!(interval.contains(&v("1.0.0")));
        assert!(interval.contains(&v("1.9.9")));
        assert!(!interval.contains(&v("2.0.0")));
        assert!(interval.contains(&v("2.0.0-rc.1")));
        assert!(!interval.contains(&v("0.9")));
    }

    #[test]
    fn test_raw_containment() {
        assert!(VersionInterval::any().contains(&v("nightly")));
        assert!(!closed_open("1.0", "2.0").contains(&v("nightly")));
        let point = VersionInterval::exact(v("nightly"));
        assert!(point.contains(&v("nightly")));
        assert!(!point.contains(&v("weekly")));
        assert!(!point.contains(&v("1.0")));
    }

    #[test]
    fn test_intersect_overlapping() {
        let a = closed_open("1.0", "3.0");
        let b = closed_open("2.0", "4.0");
        assert_eq!(a.intersect(&b), Some(closed_open("2.0", "3.0")));
    }

    #[test]
    fn test_intersect_touching_exclusive_is_empty() {
        let a = closed_open("1.0", "2.0");
        let b = closed_open("2.0", "3.0");
        assert_eq!(a.intersect(&b), None);
    }

    #[test]
    fn test_intersect_touching_inclusive_is_point() {
        let a = IntervalBuilder::new().max(v("2.0"), true).build().unwrap();
        let b = IntervalBuilder::new().min(v("2.0"), true).build().unwrap();
        assert_eq!(a.intersect(&b), Some(VersionInterval::exact(v("2.0"))));
    }

    #[test]
    fn test_intersect_raw_cases() {
        let raw = VersionInterval::exact(v("nightly"));
        assert_eq!(raw.intersect(&VersionInterval::any()), Some(raw.clone()));
        assert_eq!(raw.intersect(&raw), Some(raw.clone()));
        assert_eq!(raw.intersect(&closed_open("1.0", "2.0")), None);
        assert_eq!(raw.intersect(&VersionInterval::exact(v("weekly"))), None);
    }

    #[test]
    fn test_complement_bounded() {
        let complement = closed_open("1.0", "2.0").complement().unwrap();
        assert_eq!(complement.to_string(), "(,1.0) [2.0,)");
    }

    #[test]
    fn test_complement_any_is_empty() {
        assert!(VersionInterval::any().complement().unwrap().is_empty());
    }

    #[test]
    fn test_complement_raw_fails() {
        let err = VersionInterval::exact(v("nightly")).complement().unwrap_err();
        assert_eq!(
            err,
            Error::NonSemantic {
                operation: "complement"
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(closed_open("1.0", "2.0").to_string(), "[1.0,2.0)");
        assert_eq!(VersionInterval::any().to_string(), "*");
        let upper = IntervalBuilder::new().max(v("3"), true).build().unwrap();
        assert_eq!(upper.to_string(), "(,3]");
    }
}
