//! Version parsing and ordering.
//!
//! Two kinds of version exist:
//!
//! - **Semantic** versions: one or more dot-separated numeric components,
//!   an optional pre-release tag after `-` and optional build metadata after `+`
//!   (e.g. `1.4.2-beta.3+git.abc`). Any number of components is accepted.
//! - **Raw** versions: an opaque, non-empty string used whenever the input is
//!   not a valid semantic version (e.g. `build-2021a`).
//!
//! Semantic versions are totally ordered. Raw versions only compare with other
//! raw versions; comparing across kinds yields no ordering.
//!
//! # Examples
//!
//! ```
//! use mods_version::Version;
//!
//! let a = Version::parse("1.0").unwrap();
//! let b = Version::parse("1.0.0").unwrap();
//! assert_eq!(a, b);
//!
//! let pre = Version::parse("1.0.0-rc.1").unwrap();
//! assert!(pre < b);
//!
//! let raw = Version::parse("nightly").unwrap();
//! assert!(!raw.is_semantic());
//! assert_eq!(raw.partial_cmp(&b), None);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A single numeric position of a semantic version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// A concrete number
    Number(u32),
    /// `x`, `X` or `*`; only produced while parsing predicates
    Wildcard,
}

/// A semantic version with an arbitrary number of numeric components.
///
/// Missing trailing components count as `0` when comparing, and build
/// metadata never participates in ordering or equality.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    components: Vec<u32>,
    /// Number of trailing wildcard positions after `components`
    wildcards: usize,
    prerelease: Option<String>,
    build: Option<String>,
}

impl SemanticVersion {
    /// Build a semantic version from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] if `components` is empty or the
    /// pre-release/build strings are not dot-separated identifiers.
    pub fn new(
        components: Vec<u32>,
        prerelease: Option<String>,
        build: Option<String>,
    ) -> Result<Self> {
        let version = Self {
            components,
            wildcards: 0,
            prerelease,
            build,
        };
        if version.components.is_empty() {
            return Err(Error::version(&version.to_string(), "no numeric components"));
        }
        for tag in [&version.prerelease, &version.build].into_iter().flatten() {
            if !is_dot_separated(tag) {
                return Err(Error::version(
                    &version.to_string(),
                    format!("invalid identifier list '{tag}'"),
                ));
            }
        }
        Ok(version)
    }

    /// Parse a strict semantic version. Wildcards are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        Self::parse_inner(s, false)
    }

    /// Parse a semantic version that may end in wildcard components.
    ///
    /// Only predicate references use this form.
    pub(crate) fn parse_with_wildcards(s: &str) -> Result<Self> {
        Self::parse_inner(s, true)
    }

    fn parse_inner(s: &str, allow_wildcards: bool) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::version(s, "empty version string"));
        }

        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (s, None),
        };
        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        if let Some(pre) = prerelease
            && !is_dot_separated(pre)
        {
            return Err(Error::version(s, format!("invalid pre-release '{pre}'")));
        }
        if let Some(build) = build
            && !is_dot_separated(build)
        {
            return Err(Error::version(s, format!("invalid build metadata '{build}'")));
        }
        if core.starts_with('.') || core.ends_with('.') {
            return Err(Error::version(s, "leading or trailing '.'"));
        }

        let mut components = Vec::new();
        let mut wildcards = 0;
        for part in core.split('.') {
            if allow_wildcards && matches!(part, "x" | "X" | "*") {
                if prerelease.is_some() {
                    return Err(Error::version(s, "pre-release versions cannot use wildcards"));
                }
                wildcards += 1;
                continue;
            }
            if wildcards > 0 {
                return Err(Error::version(s, "wildcards must be trailing"));
            }
            if part.is_empty() {
                return Err(Error::version(s, "missing version component"));
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::version(s, format!("component '{part}' is not a number")));
            }
            let number = part
                .parse::<u32>()
                .map_err(|e| Error::version(s, format!("component '{part}': {e}")))?;
            components.push(number);
        }

        if components.is_empty() {
            return Err(Error::version(s, "a version cannot consist of wildcards only"));
        }

        Ok(Self {
            components,
            wildcards,
            prerelease: prerelease.map(str::to_string),
            build: build.map(str::to_string),
        })
    }

    /// Number of positions, including trailing wildcards.
    pub fn component_count(&self) -> usize {
        self.components.len() + self.wildcards
    }

    /// Component at `index`; positions past the end read as `0` unless the
    /// version ends in a wildcard, in which case they read as wildcards.
    pub fn component(&self, index: usize) -> Component {
        match self.components.get(index) {
            Some(n) => Component::Number(*n),
            None if self.wildcards > 0 => Component::Wildcard,
            None => Component::Number(0),
        }
    }

    /// Numeric value at `index`, treating wildcards as `0`.
    pub fn number(&self, index: usize) -> u32 {
        self.components.get(index).copied().unwrap_or(0)
    }

    /// The concrete numeric components, without wildcards.
    pub fn numbers(&self) -> &[u32] {
        &self.components
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn has_wildcard(&self) -> bool {
        self.wildcards > 0
    }

    /// The same version with wildcard positions dropped.
    pub(crate) fn without_wildcards(&self) -> Self {
        Self {
            components: self.components.clone(),
            wildcards: 0,
            prerelease: self.prerelease.clone(),
            build: self.build.clone(),
        }
    }

    /// Components with trailing zeros removed, the key for equality and hashing.
    fn significant_components(&self) -> &[u32] {
        let end = self
            .components
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..end]
    }
}

/// Whether the numeric part of `s` is made of digits and wildcards with at
/// least one wildcard, i.e. it was meant as a wildcard version.
fn uses_wildcards(s: &str) -> bool {
    let core = s.split(['+', '-']).next().unwrap_or(s);
    let mut saw_wildcard = false;
    for part in core.split('.') {
        match part {
            "x" | "X" | "*" => saw_wildcard = true,
            p if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {}
            _ => return false,
        }
    }
    saw_wildcard
}

fn is_dot_separated(s: &str) -> bool {
    s.is_empty()
        || s.split('.').all(|id| {
            !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

/// Compare two pre-release strings token by token.
///
/// Numeric tokens compare numerically (by length, then digits) and sort before
/// alphanumeric tokens; when one list is a prefix of the other the longer wins.
/// Leading zeros are kept, so `01` is a distinct token ordered after `1`.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.').filter(|t| !t.is_empty());
    let mut right = b.split('.').filter(|t| !t.is_empty());
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let l_num = l.bytes().all(|c| c.is_ascii_digit());
                let r_num = r.bytes().all(|c| c.is_ascii_digit());
                let ord = match (l_num, r_num) {
                    (true, true) => l.len().cmp(&r.len()).then_with(|| l.cmp(r)),
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.component_count().max(other.component_count());
        for i in 0..len {
            if let (Component::Number(a), Component::Number(b)) =
                (self.component(i), other.component(i))
            {
                match a.cmp(&b) {
                    Ordering::Equal => {}
                    ord => return ord,
                }
            }
        }

        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (Some(a), Some(b)) => compare_prerelease(a, b),
            (Some(_), None) if other.has_wildcard() => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) if self.has_wildcard() => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

/// Hashes exactly what equality compares for concrete versions. Wildcard
/// references equal every version they cover, so they are not an equivalence
/// and must never be used as keys; predicates strip them when parsed.
impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        debug_assert!(!self.has_wildcard(), "wildcard version used as a hash key");
        self.significant_components().hash(state);
        self.prerelease.hash(state);
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.components {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        for _ in 0..self.wildcards {
            f.write_str(".x")?;
        }
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Any version a mod can declare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Semantic(SemanticVersion),
    /// Opaque version string, equal only to an identical string
    Raw(String),
}

impl Version {
    /// Parse a version, falling back to a raw version when the string is not
    /// valid semantic syntax.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] only for an empty string.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::version(s, "empty version string"));
        }
        Ok(match SemanticVersion::parse(s) {
            Ok(v) => Self::Semantic(v),
            Err(_) => Self::Raw(s.to_string()),
        })
    }

    /// Parse a predicate reference, allowing trailing wildcards.
    pub(crate) fn parse_reference(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::version(s, "empty version string"));
        }
        match SemanticVersion::parse_with_wildcards(s) {
            Ok(v) => Ok(Self::Semantic(v)),
            Err(e) if uses_wildcards(s) => Err(e),
            Err(_) => Ok(Self::Raw(s.to_string())),
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Semantic(_))
    }

    pub fn as_semantic(&self) -> Option<&SemanticVersion> {
        match self {
            Self::Semantic(v) => Some(v),
            Self::Raw(_) => None,
        }
    }
}

impl PartialOrd for Version {
    /// Semantic versions order semantically and raw versions order by string;
    /// mixing the two yields `None`.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Semantic(a), Self::Semantic(b)) => Some(a.cmp(b)),
            (Self::Raw(a), Self::Raw(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<SemanticVersion> for Version {
    fn from(v: SemanticVersion) -> Self {
        Self::Semantic(v)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic(v) => v.fmt(f),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn sv(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[rstest]
    #[case("1", &[1])]
    #[case("1.2.3", &[1, 2, 3])]
    #[case("0.0.0.7", &[0, 0, 0, 7])]
    #[case("10.20-beta", &[10, 20])]
    #[case("1.0.0+build.5", &[1, 0, 0])]
    fn test_parse_components(#[case] input: &str, #[case] expected: &[u32]) {
        assert_eq!(sv(input).numbers(), expected);
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let version = sv("1.2.3-rc.1+git-abc.7");
        assert_eq!(version.prerelease(), Some("rc.1"));
        assert_eq!(version.build(), Some("git-abc.7"));
    }

    #[test]
    fn test_prerelease_may_contain_dashes() {
        let version = sv("1.0.0-alpha-2");
        assert_eq!(version.prerelease(), Some("alpha-2"));
    }

    #[test]
    fn test_empty_prerelease_is_allowed() {
        let version = sv("1.0-");
        assert_eq!(version.prerelease(), Some(""));
        assert!(version < sv("1.0-0"));
        assert!(version < sv("1.0"));
    }

    #[rstest]
    #[case("")]
    #[case(".1.0")]
    #[case("1.0.")]
    #[case("1..0")]
    #[case("1.a")]
    #[case("1.-2")]
    #[case("1.0-beta..1")]
    #[case("1.0+bu!ld")]
    #[case("1.x")]
    #[case("99999999999")]
    fn test_strict_parse_rejects(#[case] input: &str) {
        assert!(SemanticVersion::parse(input).is_err(), "{input} should be rejected");
    }

    #[rstest]
    #[case("1.x", 2)]
    #[case("1.2.X", 3)]
    #[case("1.*", 2)]
    fn test_wildcard_parse(#[case] input: &str, #[case] count: usize) {
        let version = SemanticVersion::parse_with_wildcards(input).unwrap();
        assert!(version.has_wildcard());
        assert_eq!(version.component_count(), count);
        assert_eq!(version.component(count - 1), Component::Wildcard);
    }

    #[rstest]
    #[case("1.x.2")]
    #[case("1.x-beta")]
    #[case("x")]
    fn test_wildcard_parse_rejects(#[case] input: &str) {
        assert!(SemanticVersion::parse_with_wildcards(input).is_err());
    }

    #[test]
    fn test_wildcard_positions_are_skipped_when_comparing() {
        let pattern = SemanticVersion::parse_with_wildcards("1.4.x").unwrap();
        assert_eq!(pattern.cmp(&sv("1.4.9")), Ordering::Equal);
        assert_eq!(pattern.cmp(&sv("1.4.0-beta")), Ordering::Equal);
        assert_eq!(pattern.cmp(&sv("1.5.0")), Ordering::Less);
    }

    #[test]
    fn test_missing_components_compare_as_zero() {
        assert_eq!(sv("1.2"), sv("1.2.0.0"));
        assert!(sv("1.2") < sv("1.2.0.1"));
    }

    #[test]
    fn test_build_metadata_is_ignored() {
        assert_eq!(sv("1.0.0+a"), sv("1.0.0+b"));
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        assert!(sv("2.0.0-rc.1") < sv("2.0.0"));
        assert!(sv("1.9.9") < sv("2.0.0-rc.1"));
    }

    #[rstest]
    #[case("alpha", "alpha.1")]
    #[case("alpha.1", "alpha.beta")]
    #[case("alpha.beta", "beta")]
    #[case("beta.2", "beta.11")]
    #[case("beta.11", "rc.1")]
    #[case("1", "a")]
    #[case("1", "01")]
    #[case("9", "01")]
    #[case("rc.2", "rc.01")]
    fn test_prerelease_ordering(#[case] lower: &str, #[case] higher: &str) {
        assert_eq!(compare_prerelease(lower, higher), Ordering::Less);
        assert_eq!(compare_prerelease(higher, lower), Ordering::Greater);
    }

    #[test]
    fn test_equal_versions_hash_alike() {
        use std::collections::HashSet;
        let set: HashSet<Version> = [v("1.0"), v("1.0.0"), v("1.0.0+meta")].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_prerelease_hash_follows_equality() {
        use std::collections::HashSet;
        let set: HashSet<Version> = [v("1.0-rc.1"), v("1.0.0-rc.1"), v("1.0-rc.01")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert_ne!(v("1.0.0-01"), v("1.0.0-1"));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "wildcard version used as a hash key")]
    fn test_wildcard_version_is_not_a_hash_key() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(SemanticVersion::parse_with_wildcards("1.x").unwrap());
    }

    #[test]
    fn test_raw_fallback() {
        assert_eq!(v("build-2021a"), Version::Raw("build-2021a".to_string()));
        assert_eq!(v("1..0"), Version::Raw("1..0".to_string()));
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_reference_wildcard_errors_are_kept() {
        assert!(Version::parse_reference("1.x.2").is_err());
        assert!(Version::parse_reference("1.x-beta").is_err());
        assert_eq!(
            Version::parse_reference("release.x").unwrap(),
            Version::Raw("release.x".to_string())
        );
    }

    #[test]
    fn test_mixed_kinds_are_unordered() {
        assert_eq!(v("1.0.0").partial_cmp(&v("nightly")), None);
        assert_ne!(v("1.0.0"), v("nightly"));
        assert!(v("a-nightly") < v("b-nightly"));
    }

    #[test]
    fn test_display_round_trips_text() {
        assert_eq!(v("1.2.3-beta.1+abc").to_string(), "1.2.3-beta.1+abc");
        assert_eq!(
            SemanticVersion::parse_with_wildcards("1.X").unwrap().to_string(),
            "1.x"
        );
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.2.0")).unwrap();
        assert_eq!(json, "\"1.2.0\"");
        let back: Version = serde_json::from_str("\"nightly\"").unwrap();
        assert_eq!(back, Version::Raw("nightly".to_string()));
    }
}
