//! Parsing of `mod.toml` manifests.
//!
//! # Example TOML
//!
//! ```toml
//! [mod]
//! id = "alpha"
//! group = "org.example"
//! version = "1.2.0"
//! load_type = "if_possible"
//!
//! [solver]
//! dependencies = "solver"        # or "plugin:<id>"
//! provides = "solver"
//!
//! [[depends]]
//! id = "beta"
//! versions = ">=1.0.0 <2.0.0"   # a string or a list of alternatives
//! reason = "alpha calls into beta's registry API"
//!
//! [[depends.unless]]
//! id = "beta-lite"
//!
//! [[breaks]]
//! id = "gamma"
//! versions = ["=1.0.0", "=1.0.1"]
//!
//! [[provides]]
//! id = "alpha-api"
//! version = "1.2.0"
//! ```

use std::path::Path;

use mods_version::{Version, VersionPredicate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metadata::{
    DependencyHandling, LoadType, ModDependency, ModMetadata, ProvidedMod,
};

/// File name of a per-directory manifest.
pub const MANIFEST_FILENAME: &str = "mod.toml";

/// Suffix of standalone manifest files (`<name>.mod.toml`).
pub const MANIFEST_SUFFIX: &str = ".mod.toml";

/// Raw manifest as it appears in TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModManifest {
    #[serde(rename = "mod")]
    pub info: ModSection,
    #[serde(default)]
    pub solver: Option<SolverSection>,
    #[serde(default)]
    pub depends: Vec<DependencyEntry>,
    #[serde(default)]
    pub breaks: Vec<DependencyEntry>,
    #[serde(default)]
    pub provides: Vec<ProvidesEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModSection {
    pub id: String,
    #[serde(default)]
    pub group: Option<String>,
    pub version: String,
    #[serde(default)]
    pub load_type: LoadType,
}

/// Who handles dependency and provide semantics.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SolverSection {
    #[serde(default)]
    pub dependencies: Option<String>,
    #[serde(default)]
    pub provides: Option<String>,
}

/// Version constraints, either one predicate or a list of alternatives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum VersionsField {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyEntry {
    pub id: String,
    #[serde(default)]
    pub versions: Option<VersionsField>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub unless: Vec<DependencyEntry>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidesEntry {
    pub id: String,
    #[serde(default)]
    pub group: Option<String>,
    /// Defaults to the providing mod's version.
    #[serde(default)]
    pub version: Option<String>,
}

impl ModManifest {
    /// Parse manifest text. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the manifest and turn it into [`ModMetadata`].
    ///
    /// # Errors
    ///
    /// Version, predicate and id errors surface here, before anything
    /// reaches the solver.
    pub fn into_metadata(self, source: Option<&Path>) -> Result<ModMetadata> {
        let version = Version::parse(&self.info.version)?;
        let mut builder = ModMetadata::builder(&self.info.id, version.clone())
            .load_type(self.info.load_type);

        if let Some(group) = self.info.group {
            builder = builder.group(group);
        }
        if let Some(solver) = self.solver {
            if let Some(handling) = solver.dependencies {
                builder = builder.dependency_handling(handling.parse::<DependencyHandling>()?);
            }
            if let Some(handling) = solver.provides {
                builder = builder.provides_handling(handling.parse::<DependencyHandling>()?);
            }
        }
        for entry in self.depends {
            builder = builder.depends(entry.into_dependency()?);
        }
        for entry in self.breaks {
            builder = builder.breaks(entry.into_dependency()?);
        }
        for entry in self.provides {
            let provided_version = match entry.version {
                Some(v) => Version::parse(&v)?,
                None => version.clone(),
            };
            let mut provided = ProvidedMod::new(&entry.id, provided_version)?;
            if let Some(group) = entry.group {
                provided = provided.with_group(group);
            }
            builder = builder.provides(provided);
        }
        if let Some(path) = source {
            builder = builder.source(path);
        }
        builder.build()
    }
}

impl DependencyEntry {
    fn into_dependency(self) -> Result<ModDependency> {
        let predicates = match self.versions {
            None => Vec::new(),
            Some(VersionsField::One(s)) => vec![VersionPredicate::parse(&s)?],
            Some(VersionsField::Many(list)) => list
                .iter()
                .map(|s| VersionPredicate::parse(s))
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        let mut dependency = ModDependency::new(&self.id)?
            .versions(predicates)
            .optional(self.optional)
            .active(self.active);
        if let Some(reason) = self.reason {
            dependency = dependency.reason(reason);
        }
        for exception in self.unless {
            dependency = dependency.unless(exception.into_dependency()?);
        }
        Ok(dependency)
    }
}

/// Read and convert the manifest at `path`.
pub async fn load_manifest(path: &Path) -> Result<ModMetadata> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ManifestNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    ModManifest::parse(&content, path)?.into_metadata(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"
[mod]
id = "alpha"
group = "org.example"
version = "1.2.0"
load_type = "if_possible"

[solver]
dependencies = "plugin:quilt"

[[depends]]
id = "beta"
versions = ">=1.0.0 <2.0.0"
reason = "needs the registry API"

[[depends.unless]]
id = "beta-lite"

[[breaks]]
id = "gamma"
versions = ["=1.0.0", "=1.0.1"]

[[provides]]
id = "alpha-api"
"#;

    fn parse(content: &str) -> Result<ModMetadata> {
        ModManifest::parse(content, Path::new("mod.toml"))?.into_metadata(None)
    }

    #[test]
    fn test_parse_full_manifest() {
        let meta = parse(FULL).unwrap();
        assert_eq!(meta.id(), "alpha");
        assert_eq!(meta.group(), Some("org.example"));
        assert_eq!(meta.load_type(), LoadType::IfPossible);
        assert_eq!(meta.dependency_handling().plugin(), Some("quilt"));
        assert_eq!(meta.provides_handling(), &DependencyHandling::Solver);

        let depends = &meta.depends()[0];
        assert_eq!(depends.id(), "beta");
        assert_eq!(depends.reason_text(), Some("needs the registry API"));
        assert_eq!(depends.unless_entries()[0].id(), "beta-lite");

        assert_eq!(meta.breaks()[0].version_predicates().len(), 2);
        assert_eq!(meta.provides()[0].id, "alpha-api");
        assert_eq!(meta.provides()[0].version, Version::parse("1.2.0").unwrap());
    }

    #[test]
    fn test_minimal_manifest_defaults() {
        let meta = parse("[mod]\nid = \"a\"\nversion = \"nightly\"\n").unwrap();
        assert_eq!(meta.load_type(), LoadType::Always);
        assert!(!meta.version().is_semantic());
        assert!(meta.depends().is_empty());
    }

    #[test]
    fn test_bad_predicate_is_parse_error() {
        let content = "[mod]\nid = \"a\"\nversion = \"1.0\"\n[[depends]]\nid = \"b\"\nversions = \">nightly\"\n";
        assert!(matches!(parse(content), Err(Error::Version(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let content = "[mod]\nid = \"a\"\nversion = \"1.0\"\nname = \"A\"\n";
        assert!(matches!(parse(content), Err(Error::ManifestParse { .. })));
    }

    #[test]
    fn test_bad_load_type_rejected() {
        let content = "[mod]\nid = \"a\"\nversion = \"1.0\"\nload_type = \"sometimes\"\n";
        assert!(parse(content).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(&dir.path().join(MANIFEST_FILENAME))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ManifestNotFound(_)));
    }
}
