//! Load options: the decision variables of a resolution.
//!
//! Options live in an [`OptionUniverse`] arena and are referred to by
//! [`OptionId`]. Ids are handed out in creation order, so a larger id always
//! means a more recently added option.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mods_meta::{LoadType, ModMetadata};
use mods_version::Version;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(u32);

impl OptionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A specific candidate mod.
#[derive(Debug, Clone)]
pub struct ConcreteOption {
    pub metadata: Arc<ModMetadata>,
}

/// An alias another option exposes through `provides`.
#[derive(Debug, Clone)]
pub struct ProvidedOption {
    pub provider: OptionId,
    pub id: String,
    pub group: Option<String>,
    pub version: Version,
}

/// A placeholder for a candidate a plugin has not materialised yet.
#[derive(Debug, Clone)]
pub struct TentativeOption {
    /// Identity of the placeholder; registering the same key twice is an error
    pub key: String,
    /// Plugin responsible for resolving it
    pub owner: String,
    pub id: String,
    pub group: Option<String>,
    pub version: Version,
}

#[derive(Debug, Clone)]
pub enum LoadOption {
    Concrete(ConcreteOption),
    Provided(ProvidedOption),
    Tentative(TentativeOption),
}

impl LoadOption {
    pub fn concrete(metadata: impl Into<Arc<ModMetadata>>) -> Self {
        Self::Concrete(ConcreteOption {
            metadata: metadata.into(),
        })
    }

    /// The mod id this option answers to.
    pub fn mod_id(&self) -> &str {
        match self {
            Self::Concrete(c) => c.metadata.id(),
            Self::Provided(p) => &p.id,
            Self::Tentative(t) => &t.id,
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Concrete(c) => c.metadata.group(),
            Self::Provided(p) => p.group.as_deref(),
            Self::Tentative(t) => t.group.as_deref(),
        }
    }

    pub fn version(&self) -> &Version {
        match self {
            Self::Concrete(c) => c.metadata.version(),
            Self::Provided(p) => &p.version,
            Self::Tentative(t) => &t.version,
        }
    }

    pub fn metadata(&self) -> Option<&Arc<ModMetadata>> {
        match self {
            Self::Concrete(c) => Some(&c.metadata),
            _ => None,
        }
    }

    /// Load type of a concrete option; aliases and placeholders have none.
    pub fn load_type(&self) -> Option<LoadType> {
        self.metadata().map(|m| m.load_type())
    }

    pub fn is_tentative(&self) -> bool {
        matches!(self, Self::Tentative(_))
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Self::Provided(_))
    }

    /// The concrete option behind a provided alias.
    pub fn provider(&self) -> Option<OptionId> {
        match self {
            Self::Provided(p) => Some(p.provider),
            _ => None,
        }
    }
}

impl fmt::Display for LoadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(c) => write!(f, "{} {}", c.metadata.id(), c.metadata.version()),
            Self::Provided(p) => write!(f, "{} {} (provided)", p.id, p.version),
            Self::Tentative(t) => write!(f, "{} {} (pending {})", t.id, t.version, t.key),
        }
    }
}

/// Total order on versions for tie-breaking: semantic versions by their
/// order, above raw versions, which compare by string.
pub fn version_rank(a: &Version, b: &Version) -> Ordering {
    match (a, b) {
        (Version::Semantic(x), Version::Semantic(y)) => x.cmp(y),
        (Version::Raw(x), Version::Raw(y)) => x.cmp(y),
        (Version::Semantic(_), Version::Raw(_)) => Ordering::Greater,
        (Version::Raw(_), Version::Semantic(_)) => Ordering::Less,
    }
}

#[derive(Debug)]
struct Slot {
    option: LoadOption,
    live: bool,
}

/// Arena of every option created during a resolution.
#[derive(Debug, Default)]
pub struct OptionUniverse {
    slots: Vec<Slot>,
    /// Mod ids in order of first appearance
    id_order: BTreeMap<String, usize>,
}

impl OptionUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, option: LoadOption) -> OptionId {
        let id = OptionId(self.slots.len() as u32);
        let next = self.id_order.len();
        self.id_order.entry(option.mod_id().to_string()).or_insert(next);
        self.slots.push(Slot { option, live: true });
        id
    }

    /// Mark an option removed. Its id is never reused.
    pub fn remove(&mut self, id: OptionId) -> Result<&LoadOption> {
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(Error::UnknownOption(id))?;
        if !slot.live {
            return Err(Error::OptionRemoved(id));
        }
        slot.live = false;
        Ok(&slot.option)
    }

    /// A live option.
    pub fn get(&self, id: OptionId) -> Result<&LoadOption> {
        match self.slots.get(id.index()) {
            Some(slot) if slot.live => Ok(&slot.option),
            Some(_) => Err(Error::OptionRemoved(id)),
            None => Err(Error::UnknownOption(id)),
        }
    }

    /// Any option ever added, live or not.
    pub fn lookup(&self, id: OptionId) -> Option<&LoadOption> {
        self.slots.get(id.index()).map(|s| &s.option)
    }

    pub fn is_live(&self, id: OptionId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.live)
    }

    pub fn live(&self) -> impl Iterator<Item = (OptionId, &LoadOption)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| (OptionId(i as u32), &s.option))
    }

    /// Rank of a mod id by first appearance; unknown ids sort last.
    pub fn id_rank(&self, mod_id: &str) -> usize {
        self.id_order.get(mod_id).copied().unwrap_or(usize::MAX)
    }

    pub fn describe(&self, id: OptionId) -> String {
        match self.lookup(id) {
            Some(option) => option.to_string(),
            None => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, version: &str) -> ModMetadata {
        ModMetadata::builder(id, Version::parse(version).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_ids_follow_creation_order() {
        let mut universe = OptionUniverse::new();
        let a = universe.add(LoadOption::concrete(meta("a", "1.0")));
        let b = universe.add(LoadOption::concrete(meta("b", "1.0")));
        assert!(a < b);
        assert_eq!(universe.get(b).unwrap().mod_id(), "b");
    }

    #[test]
    fn test_remove_keeps_slot() {
        let mut universe = OptionUniverse::new();
        let a = universe.add(LoadOption::concrete(meta("a", "1.0")));
        universe.remove(a).unwrap();
        assert!(matches!(universe.get(a), Err(Error::OptionRemoved(_))));
        assert!(universe.lookup(a).is_some());
        assert!(matches!(universe.remove(a), Err(Error::OptionRemoved(_))));
        assert_eq!(universe.live().count(), 0);
    }

    #[test]
    fn test_id_rank_is_first_appearance() {
        let mut universe = OptionUniverse::new();
        universe.add(LoadOption::concrete(meta("zeta", "1.0")));
        universe.add(LoadOption::concrete(meta("alpha", "1.0")));
        universe.add(LoadOption::concrete(meta("zeta", "2.0")));
        assert!(universe.id_rank("zeta") < universe.id_rank("alpha"));
        assert_eq!(universe.id_rank("missing"), usize::MAX);
    }

    #[test]
    fn test_version_rank_is_total() {
        let semantic = Version::parse("1.0").unwrap();
        let raw = Version::parse("nightly").unwrap();
        assert_eq!(version_rank(&semantic, &raw), Ordering::Greater);
        assert_eq!(version_rank(&raw, &raw), Ordering::Equal);
    }
}
