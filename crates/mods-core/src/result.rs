//! The immutable outcome of a successful resolution.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use mods_meta::ModMetadata;
use mods_version::Version;
use serde::Serialize;

/// A mod reached through another mod's `provides`.
#[derive(Debug, Clone)]
pub struct ProvidedSelection {
    pub version: Version,
    pub provider: Arc<ModMetadata>,
}

#[derive(Debug, Clone, Default)]
pub struct ModSolveResult {
    direct: BTreeMap<String, Arc<ModMetadata>>,
    provided: BTreeMap<String, ProvidedSelection>,
    extras: BTreeMap<String, serde_json::Value>,
    relaxed_rules: Vec<String>,
    cycles: usize,
}

impl ModSolveResult {
    pub(crate) fn new(
        direct: BTreeMap<String, Arc<ModMetadata>>,
        provided: BTreeMap<String, ProvidedSelection>,
        relaxed_rules: Vec<String>,
        cycles: usize,
    ) -> Self {
        Self {
            direct,
            provided,
            extras: BTreeMap::new(),
            relaxed_rules,
            cycles,
        }
    }

    pub(crate) fn with_extras(mut self, extras: BTreeMap<String, serde_json::Value>) -> Self {
        self.extras = extras;
        self
    }

    /// Chosen mods by id.
    pub fn direct(&self) -> &BTreeMap<String, Arc<ModMetadata>> {
        &self.direct
    }

    /// Ids satisfied only through `provides`, with the mod providing them.
    pub fn provided(&self) -> &BTreeMap<String, ProvidedSelection> {
        &self.provided
    }

    /// Payloads returned by plugins' finish hooks, by plugin id.
    pub fn extras(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extras
    }

    /// Descriptions of rules dropped to reach this result.
    pub fn relaxed_rules(&self) -> &[String] {
        &self.relaxed_rules
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ModMetadata>> {
        self.direct.get(id)
    }

    /// The mod standing behind `id`, directly or through `provides`.
    pub fn resolve(&self, id: &str) -> Option<&Arc<ModMetadata>> {
        self.direct
            .get(id)
            .or_else(|| self.provided.get(id).map(|p| &p.provider))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.direct.contains_key(id) || self.provided.contains_key(id)
    }

    /// A serializable summary.
    pub fn report(&self) -> ResolutionReport {
        ResolutionReport {
            mods: self
                .direct
                .values()
                .map(|m| ResolvedMod {
                    id: m.id().to_string(),
                    group: m.group().map(str::to_string),
                    version: m.version().to_string(),
                    source: m.source().map(|p| p.to_path_buf()),
                })
                .collect(),
            provided: self
                .provided
                .iter()
                .map(|(id, p)| ResolvedAlias {
                    id: id.clone(),
                    version: p.version.to_string(),
                    provider: p.provider.id().to_string(),
                })
                .collect(),
            extras: self.extras.clone(),
            relaxed_rules: self.relaxed_rules.clone(),
            cycles: self.cycles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionReport {
    pub mods: Vec<ResolvedMod>,
    pub provided: Vec<ResolvedAlias>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relaxed_rules: Vec<String>,
    pub cycles: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMod {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAlias {
    pub id: String,
    pub version: String,
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn meta(id: &str, version: &str) -> Arc<ModMetadata> {
        Arc::new(
            ModMetadata::builder(id, Version::parse(version).unwrap())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_resolve_falls_back_to_provided() {
        let provider = meta("impl", "2.0");
        let result = ModSolveResult::new(
            BTreeMap::from([("impl".to_string(), Arc::clone(&provider))]),
            BTreeMap::from([(
                "api".to_string(),
                ProvidedSelection {
                    version: Version::parse("1.0").unwrap(),
                    provider,
                },
            )]),
            Vec::new(),
            1,
        );
        assert_eq!(result.resolve("api").unwrap().id(), "impl");
        assert!(result.get("api").is_none());
        assert!(result.contains("api"));
        assert!(!result.contains("other"));
    }

    #[test]
    fn test_report_serializes() {
        let result = ModSolveResult::new(
            BTreeMap::from([("a".to_string(), meta("a", "1.0"))]),
            BTreeMap::new(),
            Vec::new(),
            2,
        )
        .with_extras(BTreeMap::from([(
            "stats".to_string(),
            serde_json::json!({"remote": 0}),
        )]));
        let json = serde_json::to_value(result.report()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mods": [{"id": "a", "version": "1.0"}],
                "provided": [],
                "extras": {"stats": {"remote": 0}},
                "cycles": 2
            })
        );
    }
}
