//! In-memory mod metadata.
//!
//! [`ModMetadata`] is what the resolver consumes for every candidate,
//! however it was discovered. Values are built through builders and are
//! immutable afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use mods_version::{Version, VersionPredicate, any_matches};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How strongly the host wants a mod loaded, ordered from least to most mandatory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    /// Loaded only when another chosen mod needs it
    IfRequired,
    /// Loaded unless that makes the set inconsistent
    IfPossible,
    /// Must be loaded
    #[default]
    Always,
}

impl FromStr for LoadType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "if_possible" | "if-possible" => Ok(Self::IfPossible),
            "if_required" | "if-required" => Ok(Self::IfRequired),
            _ => Err(Error::InvalidField {
                field: "load_type",
                value: s.to_string(),
                reason: "expected always, if_possible or if_required".to_string(),
            }),
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::IfPossible => write!(f, "if_possible"),
            Self::IfRequired => write!(f, "if_required"),
        }
    }
}

/// Who derives solver rules for a mod's depends/breaks or provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DependencyHandling {
    /// Rules are generated automatically from the metadata.
    #[default]
    Solver,
    /// The named plugin adds equivalent rules itself.
    Plugin(String),
}

impl DependencyHandling {
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Solver => None,
            Self::Plugin(id) => Some(id),
        }
    }
}

impl FromStr for DependencyHandling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "solver" {
            return Ok(Self::Solver);
        }
        match s.strip_prefix("plugin:") {
            Some(id) if !id.is_empty() => Ok(Self::Plugin(id.to_string())),
            _ => Err(Error::InvalidField {
                field: "handling",
                value: s.to_string(),
                reason: "expected 'solver' or 'plugin:<id>'".to_string(),
            }),
        }
    }
}

impl fmt::Display for DependencyHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solver => f.write_str("solver"),
            Self::Plugin(id) => write!(f, "plugin:{id}"),
        }
    }
}

/// Check that `id` is a valid mod id: `[a-z][a-z0-9_-]*`.
pub fn validate_id(id: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };
    let mut chars = id.chars();
    match chars.next() {
        None => return Err(invalid("id is empty")),
        Some(c) if !c.is_ascii_lowercase() => {
            return Err(invalid("id must start with a lowercase letter"));
        }
        Some(_) => {}
    }
    if let Some(c) = chars.find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '-')) {
        return Err(invalid(&format!("character '{c}' is not allowed")));
    }
    Ok(())
}

/// A `depends` or `breaks` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDependency {
    id: String,
    group: Option<String>,
    versions: Vec<VersionPredicate>,
    reason: Option<String>,
    unless: Vec<ModDependency>,
    active: bool,
    optional: bool,
}

impl ModDependency {
    /// Start a dependency on `target`, which may be `id` or `group:id`.
    /// The new dependency accepts any version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if the id part is malformed.
    pub fn new(target: &str) -> Result<Self> {
        let (group, id) = match target.split_once(':') {
            Some((group, id)) if !group.is_empty() => (Some(group.to_string()), id),
            Some(_) => {
                return Err(Error::InvalidId {
                    id: target.to_string(),
                    reason: "empty group before ':'".to_string(),
                });
            }
            None => (None, target),
        };
        validate_id(id)?;
        Ok(Self {
            id: id.to_string(),
            group,
            versions: Vec::new(),
            reason: None,
            unless: Vec::new(),
            active: true,
            optional: false,
        })
    }

    /// Accept versions matching `predicate` (parsed); may be called repeatedly,
    /// in which case any predicate matching is enough.
    pub fn version(mut self, predicate: &str) -> Result<Self> {
        let predicate = VersionPredicate::parse(predicate)?;
        self.versions.push(predicate);
        Ok(self)
    }

    pub fn versions(mut self, predicates: Vec<VersionPredicate>) -> Self {
        self.versions = predicates;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn unless(mut self, exception: ModDependency) -> Self {
        self.unless.push(exception);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Optional dependencies do not require the target, only constrain it.
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn version_predicates(&self) -> &[VersionPredicate] {
        &self.versions
    }

    pub fn reason_text(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn unless_entries(&self) -> &[ModDependency] {
        &self.unless
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether a candidate with the given identity satisfies the target and
    /// version constraints. `unless` and `active` are not considered here.
    pub fn matches(&self, id: &str, group: Option<&str>, version: &Version) -> bool {
        if id != self.id {
            return false;
        }
        if let Some(wanted) = &self.group
            && group != Some(wanted.as_str())
        {
            return false;
        }
        any_matches(&self.versions, version)
    }

    /// Whether only the version constraints accept `version`.
    pub fn matches_version(&self, version: &Version) -> bool {
        any_matches(&self.versions, version)
    }
}

impl fmt::Display for ModDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(group) = &self.group {
            write!(f, "{group}:")?;
        }
        f.write_str(&self.id)?;
        match self.versions.as_slice() {
            [] => Ok(()),
            [only] if only.is_any() => Ok(()),
            predicates => {
                let joined: Vec<String> = predicates.iter().map(ToString::to_string).collect();
                write!(f, " {}", joined.join(" || "))
            }
        }
    }
}

/// A secondary identity a mod exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedMod {
    pub id: String,
    pub group: Option<String>,
    pub version: Version,
}

impl ProvidedMod {
    pub fn new(id: &str, version: Version) -> Result<Self> {
        validate_id(id)?;
        Ok(Self {
            id: id.to_string(),
            group: None,
            version,
        })
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Everything the resolver knows about one candidate mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModMetadata {
    id: String,
    group: Option<String>,
    version: Version,
    load_type: LoadType,
    depends: Vec<ModDependency>,
    breaks: Vec<ModDependency>,
    provides: Vec<ProvidedMod>,
    dependency_handling: DependencyHandling,
    provides_handling: DependencyHandling,
    source: Option<PathBuf>,
}

impl ModMetadata {
    /// Start building metadata for `id` at `version`.
    pub fn builder(id: &str, version: Version) -> ModMetadataBuilder {
        ModMetadataBuilder {
            meta: Self {
                id: id.to_string(),
                group: None,
                version,
                load_type: LoadType::default(),
                depends: Vec::new(),
                breaks: Vec::new(),
                provides: Vec::new(),
                dependency_handling: DependencyHandling::Solver,
                provides_handling: DependencyHandling::Solver,
                source: None,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn load_type(&self) -> LoadType {
        self.load_type
    }

    pub fn depends(&self) -> &[ModDependency] {
        &self.depends
    }

    pub fn breaks(&self) -> &[ModDependency] {
        &self.breaks
    }

    pub fn provides(&self) -> &[ProvidedMod] {
        &self.provides
    }

    pub fn dependency_handling(&self) -> &DependencyHandling {
        &self.dependency_handling
    }

    pub fn provides_handling(&self) -> &DependencyHandling {
        &self.provides_handling
    }

    /// Path of the manifest this metadata was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// A copy with depends/breaks entries on the given ids removed.
    pub fn without_entries(&self, depends: &[String], breaks: &[String]) -> Self {
        let mut copy = self.clone();
        copy.depends.retain(|d| !depends.iter().any(|id| id == d.id()));
        copy.breaks.retain(|d| !breaks.iter().any(|id| id == d.id()));
        copy
    }
}

impl fmt::Display for ModMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

pub struct ModMetadataBuilder {
    meta: ModMetadata,
}

impl ModMetadataBuilder {
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.meta.group = Some(group.into());
        self
    }

    pub fn load_type(mut self, load_type: LoadType) -> Self {
        self.meta.load_type = load_type;
        self
    }

    pub fn depends(mut self, dependency: ModDependency) -> Self {
        self.meta.depends.push(dependency);
        self
    }

    pub fn breaks(mut self, dependency: ModDependency) -> Self {
        self.meta.breaks.push(dependency);
        self
    }

    pub fn provides(mut self, provided: ProvidedMod) -> Self {
        self.meta.provides.push(provided);
        self
    }

    pub fn dependency_handling(mut self, handling: DependencyHandling) -> Self {
        self.meta.dependency_handling = handling;
        self
    }

    pub fn provides_handling(mut self, handling: DependencyHandling) -> Self {
        self.meta.provides_handling = handling;
        self
    }

    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.meta.source = Some(path.into());
        self
    }

    /// Validate ids and finish.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if the mod id is malformed or a provided
    /// id equals the mod's own id.
    pub fn build(self) -> Result<ModMetadata> {
        validate_id(&self.meta.id)?;
        if let Some(p) = self.meta.provides.iter().find(|p| p.id == self.meta.id) {
            return Err(Error::InvalidId {
                id: p.id.clone(),
                reason: "a mod cannot provide its own id".to_string(),
            });
        }
        Ok(self.meta)
    }
}
