//! End-to-end resolution scenarios read from manifests on disk.
//!
//! Each test lays out a mods directory with `TestModsDir`, scans it with
//! `DirectoryScanner` and resolves it through the public `Resolver` API.

use mods_core::{ModSolveResult, Plugin, ResolveError, Resolver, TentativeSpec, WorkError};
use mods_meta::{DirectoryScanner, ResolverConfig};
use mods_test_utils::meta::{dep, library, v};
use mods_test_utils::{ManifestBuilder, TestModsDir};
use pretty_assertions::assert_eq;

async fn resolve_dir(dir: &TestModsDir) -> mods_core::Result<ModSolveResult> {
    resolve_with(dir, Vec::new()).await
}

async fn resolve_with(dir: &TestModsDir, plugins: Vec<Plugin>) -> mods_core::Result<ModSolveResult> {
    let config = ResolverConfig::load(&dir.root().join(mods_meta::CONFIG_FILENAME))?;
    let mut builder = Resolver::builder()
        .scanner(DirectoryScanner::new(dir.root()))
        .config(config);
    for plugin in plugins {
        builder = builder.plugin(plugin);
    }
    builder.build().resolve().await
}

fn chosen(result: &ModSolveResult) -> Vec<String> {
    result
        .direct()
        .values()
        .map(|m| format!("{} {}", m.id(), m.version()))
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_mandatory_mod() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0"));

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0"]);
}

#[tokio::test]
async fn test_dependency_range_selects_matching_version() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("beta", ">=1.0.0 <2.0.0"));
    dir.add_mod(ManifestBuilder::new("beta", "1.0.0").load_type("if_required"));
    dir.add_mod(ManifestBuilder::new("beta", "2.0.0").load_type("if_required"));

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "beta 1.0.0"]);
}

#[tokio::test]
async fn test_breaks_reports_blame_chain() {
    let dir = TestModsDir::new();
    dir.add_mod(
        ManifestBuilder::new("alpha", "1.0")
            .breaks("beta", "=1.0.0")
            .reason("beta 1.0.0 corrupts alpha saves"),
    );
    dir.add_mod(ManifestBuilder::new("beta", "1.0.0"));

    let err = resolve_dir(&dir).await.unwrap_err();
    let ResolveError::Unsatisfiable(failure) = err else {
        panic!("expected an unsatisfiable result");
    };
    let breaks = failure
        .chain
        .iter()
        .find(|r| r.kind == "breaks")
        .expect("breaks rule in chain");
    assert_eq!(breaks.owner.as_deref(), Some("alpha"));
    assert_eq!(breaks.reason.as_deref(), Some("beta 1.0.0 corrupts alpha saves"));
    assert!(failure.mentions("beta"));
    assert!(failure.to_string().contains("blaming 'alpha'"));
}

#[tokio::test]
async fn test_provided_alias_choice_is_repeatable() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("render-api", "^2"));
    dir.add_mod(
        ManifestBuilder::new("fast-render", "3.1")
            .load_type("if_required")
            .provides("render-api", "2.1"),
    );
    dir.add_mod(
        ManifestBuilder::new("pretty-render", "0.9")
            .load_type("if_required")
            .provides("render-api", "2.0"),
    );

    let first = resolve_dir(&dir).await.unwrap();
    for _ in 0..3 {
        let again = resolve_dir(&dir).await.unwrap();
        assert_eq!(chosen(&again), chosen(&first));
    }

    assert_eq!(first.direct().len(), 2);
    let alias = &first.provided()["render-api"];
    assert!(first.direct().contains_key(alias.provider.id()));
    assert!(!first.direct().contains_key("render-api"));
}

#[tokio::test]
async fn test_unless_satisfied_skips_dependency() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends_unless("beta", "beta-lite"));
    dir.add_mod(ManifestBuilder::new("beta-lite", "1.0"));

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "beta-lite 1.0"]);
}

#[tokio::test]
async fn test_unless_without_exemption_requires_target() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends_unless("beta", "beta-lite"));
    dir.add_mod(ManifestBuilder::new("beta", "1.0").load_type("if_required"));

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "beta 1.0"]);
}

// ============================================================================
// Metadata features
// ============================================================================

#[tokio::test]
async fn test_optional_dependency_constrains_only_when_loaded() {
    let dir = TestModsDir::new();
    dir.write_manifest(
        "alpha",
        "[mod]\nid = \"alpha\"\nversion = \"1.0\"\n\n\
         [[depends]]\nid = \"beta\"\nversions = \"<2\"\noptional = true\n",
    );
    dir.add_mod(ManifestBuilder::new("beta", "1.0").load_type("if_possible"));
    dir.add_mod(ManifestBuilder::new("beta", "3.0").load_type("if_possible"));
    dir.add_mod(ManifestBuilder::new("gamma", "1.0").load_type("if_possible"));

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "beta 1.0", "gamma 1.0"]);
}

#[tokio::test]
async fn test_group_qualified_dependency() {
    let dir = TestModsDir::new();
    dir.write_manifest(
        "alpha",
        "[mod]\nid = \"alpha\"\nversion = \"1.0\"\n\n[[depends]]\nid = \"org.right:lib\"\n",
    );
    dir.write_manifest(
        "lib-wrong",
        "[mod]\nid = \"lib\"\ngroup = \"org.wrong\"\nversion = \"9.0\"\nload_type = \"if_required\"\n",
    );
    dir.write_manifest(
        "lib-right",
        "[mod]\nid = \"lib\"\ngroup = \"org.right\"\nversion = \"1.0\"\nload_type = \"if_required\"\n",
    );

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(result.get("lib").unwrap().group(), Some("org.right"));
}

#[tokio::test]
async fn test_invalid_version_is_parse_error() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("beta", ">=1.x"));

    let err = resolve_dir(&dir).await.unwrap_err();
    assert!(matches!(err, ResolveError::Scan(_)), "got {err:?}");
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_override_removes_conflicting_break() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").breaks("beta", ""));
    dir.add_mod(ManifestBuilder::new("beta", "1.0"));
    dir.write_config("[overrides.alpha]\nremove_breaks = [\"beta\"]\n");

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "beta 1.0"]);
}

#[tokio::test]
async fn test_relaxation_drops_library_dependency() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("beta", ""));
    dir.add_mod(
        ManifestBuilder::new("beta", "1.0")
            .load_type("if_required")
            .depends("missing", ""),
    );

    let result = resolve_dir(&dir).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "beta 1.0"]);
    assert_eq!(result.relaxed_rules().len(), 1);

    let report = serde_json::to_value(result.report()).unwrap();
    assert_eq!(report["relaxed_rules"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_relaxation_disabled_by_config() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("beta", ""));
    dir.add_mod(
        ManifestBuilder::new("beta", "1.0")
            .load_type("if_required")
            .depends("missing", ""),
    );
    dir.write_config("[resolver]\nrelax_on_unsat = false\n");

    let err = resolve_dir(&dir).await.unwrap_err();
    assert!(err.failure().is_some_and(|f| f.mentions("beta")));
}

// ============================================================================
// Plugins
// ============================================================================

/// Offers a tentative `net-lib` that a remote lookup turns into metadata.
fn remote_repository() -> Plugin {
    let mut offered = false;
    Plugin::new("remote").on_generate_rules(move |ctx| {
        let wanted = ctx.options_for("net-lib").is_empty();
        if wanted && !offered {
            offered = true;
            ctx.add_tentative(
                TentativeSpec::new("remote:net-lib:2.0", "net-lib", v("2.0")),
                |request| async move {
                    tokio::task::yield_now().await;
                    Ok::<_, WorkError>(library(&request.mod_id, &request.version.to_string()))
                },
            );
        }
        Ok(())
    })
}

#[tokio::test]
async fn test_tentative_option_replaced_by_remote_mod() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("net-lib", ">=2"));

    let result = resolve_with(&dir, vec![remote_repository()]).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "net-lib 2.0"]);
    assert!(result.get("net-lib").unwrap().source().is_none());
}

#[tokio::test]
async fn test_remote_lookup_skipped_for_local_candidate() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("net-lib", ">=1"));
    dir.add_mod(ManifestBuilder::new("net-lib", "1.5").load_type("if_required"));

    let result = resolve_with(&dir, vec![remote_repository()]).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "net-lib 1.5"]);
    assert_eq!(result.cycles(), 1);
}

#[tokio::test]
async fn test_plugin_owned_dependencies_from_manifest() {
    let dir = TestModsDir::new();
    dir.add_mod(
        ManifestBuilder::new("alpha", "1.0")
            .dependency_handling("plugin:compat")
            .depends("beta", ""),
    );

    // The manifest's own depends entry is left to the plugin, which ignores it.
    let compat = Plugin::new("compat").on_generate_rules(|_| Ok(()));
    let result = resolve_with(&dir, vec![compat]).await.unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0"]);

    let err = resolve_dir(&dir).await.unwrap_err();
    assert!(matches!(err, ResolveError::UnknownPlugin { .. }));
}

#[tokio::test]
async fn test_in_memory_candidates_join_scanned_ones() {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("beta", "^1"));

    let result = Resolver::builder()
        .scanner(DirectoryScanner::new(dir.root()))
        .candidate(library("beta", "1.3"))
        .build()
        .resolve()
        .await
        .unwrap();
    assert_eq!(chosen(&result), vec!["alpha 1.0", "beta 1.3"]);
    assert!(dep("beta", "^1").matches_version(result.get("beta").unwrap().version()));
}
