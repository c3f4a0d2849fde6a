//! [`ManifestBuilder`]: `mod.toml` text for tests.

use std::fmt::Write;

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    versions: Option<String>,
    reason: Option<String>,
    unless: Option<String>,
}

/// Builds the text of a `mod.toml`.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    id: String,
    version: String,
    load_type: Option<String>,
    dependencies: Option<String>,
    depends: Vec<Entry>,
    breaks: Vec<Entry>,
    provides: Vec<(String, String)>,
    last_is_breaks: bool,
}

impl ManifestBuilder {
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            load_type: None,
            dependencies: None,
            depends: Vec::new(),
            breaks: Vec::new(),
            provides: Vec::new(),
            last_is_breaks: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `always`, `if_possible` or `if_required`.
    pub fn load_type(mut self, load_type: &str) -> Self {
        self.load_type = Some(load_type.to_string());
        self
    }

    /// `[solver] dependencies = ...`, e.g. `plugin:compat`.
    pub fn dependency_handling(mut self, handling: &str) -> Self {
        self.dependencies = Some(handling.to_string());
        self
    }

    /// Depend on `id` matching `versions`; an empty string means any version.
    pub fn depends(mut self, id: &str, versions: &str) -> Self {
        self.depends.push(entry(id, versions));
        self.last_is_breaks = false;
        self
    }

    /// Depend on `id` unless a mod matching `unless` is present.
    pub fn depends_unless(mut self, id: &str, unless: &str) -> Self {
        let mut e = entry(id, "");
        e.unless = Some(unless.to_string());
        self.depends.push(e);
        self.last_is_breaks = false;
        self
    }

    pub fn breaks(mut self, id: &str, versions: &str) -> Self {
        self.breaks.push(entry(id, versions));
        self.last_is_breaks = true;
        self
    }

    /// Attach a reason to the most recent depends or breaks entry.
    pub fn reason(mut self, reason: &str) -> Self {
        let last = if self.last_is_breaks {
            self.breaks.last_mut()
        } else {
            self.depends.last_mut()
        };
        if let Some(e) = last {
            e.reason = Some(reason.to_string());
        }
        self
    }

    pub fn provides(mut self, id: &str, version: &str) -> Self {
        self.provides.push((id.to_string(), version.to_string()));
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        writeln!(out, "[mod]\nid = \"{}\"\nversion = \"{}\"", self.id, self.version).unwrap();
        if let Some(load_type) = &self.load_type {
            writeln!(out, "load_type = \"{load_type}\"").unwrap();
        }
        if let Some(handling) = &self.dependencies {
            writeln!(out, "\n[solver]\ndependencies = \"{handling}\"").unwrap();
        }
        for e in &self.depends {
            write_entry(&mut out, "depends", e);
        }
        for e in &self.breaks {
            write_entry(&mut out, "breaks", e);
        }
        for (id, version) in &self.provides {
            writeln!(out, "\n[[provides]]\nid = \"{id}\"\nversion = \"{version}\"").unwrap();
        }
        out
    }
}

fn entry(id: &str, versions: &str) -> Entry {
    Entry {
        id: id.to_string(),
        versions: (!versions.is_empty()).then(|| versions.to_string()),
        reason: None,
        unless: None,
    }
}

fn write_entry(out: &mut String, table: &str, e: &Entry) {
    writeln!(out, "\n[[{table}]]\nid = \"{}\"", e.id).unwrap();
    if let Some(versions) = &e.versions {
        writeln!(out, "versions = \"{versions}\"").unwrap();
    }
    if let Some(reason) = &e.reason {
        writeln!(out, "reason = \"{reason}\"").unwrap();
    }
    if let Some(unless) = &e.unless {
        writeln!(out, "\n[[{table}.unless]]\nid = \"{unless}\"").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest() {
        assert_eq!(
            ManifestBuilder::new("a", "1.0").build(),
            "[mod]\nid = \"a\"\nversion = \"1.0\"\n"
        );
    }

    #[test]
    fn test_reason_attaches_to_last_entry() {
        let text = ManifestBuilder::new("a", "1.0")
            .breaks("b", "=1.0.0")
            .reason("crashes")
            .build();
        assert!(text.contains("[[breaks]]\nid = \"b\"\nversions = \"=1.0.0\"\nreason = \"crashes\""));
    }
}
