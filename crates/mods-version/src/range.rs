//! Version ranges: finite unions of intervals in canonical form.
//!
//! A [`VersionRange`] keeps its semantic intervals sorted by lower bound,
//! pairwise disjoint and never touching, followed by any raw points in
//! string order. Because the form is canonical, two ranges covering the same
//! versions compare equal with `==`.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::interval::{VersionInterval, compare_max, compare_min};
use crate::version::Version;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionRange {
    intervals: Vec<VersionInterval>,
}

impl VersionRange {
    /// The range matching nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The range matching every version.
    pub fn any() -> Self {
        Self {
            intervals: vec![VersionInterval::any()],
        }
    }

    /// Normalise an arbitrary list of intervals.
    pub fn from_intervals(intervals: impl IntoIterator<Item = VersionInterval>) -> Self {
        normalize(intervals.into_iter().collect())
    }

    pub fn intervals(&self) -> &[VersionInterval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_any(&self) -> bool {
        matches!(self.intervals.as_slice(), [only] if only.is_any())
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.intervals.iter().any(|i| i.contains(version))
    }

    /// Add one interval to the range.
    pub fn union_interval(&self, interval: &VersionInterval) -> Self {
        let mut all = self.intervals.clone();
        all.push(interval.clone());
        normalize(all)
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut all = self.intervals.clone();
        all.extend(other.intervals.iter().cloned());
        normalize(all)
    }

    /// Pairwise intersection of both ranges' intervals.
    pub fn intersect(&self, other: &Self) -> Self {
        let pieces = self
            .intervals
            .iter()
            .flat_map(|a| other.intervals.iter().filter_map(move |b| a.intersect(b)))
            .collect();
        normalize(pieces)
    }

    pub fn intersect_interval(&self, interval: &VersionInterval) -> Self {
        let pieces = self
            .intervals
            .iter()
            .filter_map(|a| a.intersect(interval))
            .collect();
        normalize(pieces)
    }

    /// The versions not covered by this range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonSemantic`] if the range holds raw points.
    pub fn complement(&self) -> Result<Self> {
        if self.intervals.iter().any(|i| !i.is_semantic()) {
            return Err(Error::NonSemantic {
                operation: "complement",
            });
        }
        let (Some(first), Some(last)) = (self.intervals.first(), self.intervals.last()) else {
            return Ok(Self::any());
        };

        let mut gaps = Vec::with_capacity(self.intervals.len() + 1);
        if let Some(min) = first.min() {
            gaps.push(VersionInterval::new(None, Some(min.flipped()))?);
        }
        for pair in self.intervals.windows(2) {
            let (Some(upper), Some(lower)) = (pair[0].max(), pair[1].min()) else {
                return Err(Error::interval("range is not in canonical form"));
            };
            gaps.push(VersionInterval::new(Some(upper.flipped()), Some(lower.flipped()))?);
        }
        if let Some(max) = last.max() {
            gaps.push(VersionInterval::new(Some(max.flipped()), None)?);
        }
        Ok(Self { intervals: gaps })
    }
}

/// Sort, merge overlapping or touching semantic intervals and deduplicate raw points.
fn normalize(intervals: Vec<VersionInterval>) -> VersionRange {
    if intervals.iter().any(VersionInterval::is_any) {
        return VersionRange::any();
    }

    let (mut semantic, mut raw): (Vec<_>, Vec<_>) =
        intervals.into_iter().partition(VersionInterval::is_semantic);

    semantic.sort_by(|a, b| {
        compare_min(a.min(), b.min()).then_with(|| compare_max(a.max(), b.max()))
    });

    let mut merged: Vec<VersionInterval> = Vec::with_capacity(semantic.len());
    for next in semantic {
        if let Some(current) = merged.last_mut()
            && joins(current, &next)
        {
            if compare_max(current.max(), next.max()) == Ordering::Less {
                *current = current.extended_to(next.max().cloned());
            }
            continue;
        }
        merged.push(next);
    }

    if matches!(merged.as_slice(), [only] if only.is_any()) {
        return VersionRange::any();
    }

    raw.sort_by(|a, b| {
        let key = |i: &VersionInterval| i.min().map(|b| b.version.to_string());
        key(a).cmp(&key(b))
    });
    raw.dedup();
    merged.extend(raw);

    VersionRange { intervals: merged }
}

/// Whether `next` (sorted after `current`) overlaps or touches it.
fn joins(current: &VersionInterval, next: &VersionInterval) -> bool {
    let (Some(upper), Some(lower)) = (current.max(), next.min()) else {
        return true;
    };
    match upper.version.partial_cmp(&lower.version) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => upper.inclusive || lower.inclusive,
        _ => false,
    }
}

impl From<VersionInterval> for VersionRange {
    fn from(interval: VersionInterval) -> Self {
        Self {
            intervals: vec![interval],
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return f.write_str("none");
        }
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{interval}")?;
        }
        Ok(())
    }
}
