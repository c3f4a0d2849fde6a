//! Built-in rule generation from mod metadata.
//!
//! For each new option the generator makes sure its id has an id-definition
//! rule. For concrete options it also adds:
//!
//! - a mandatory rule when the load type is `always`;
//! - one provided option plus a provides rule per `provides` entry, unless a
//!   plugin owns provides handling;
//! - depends and breaks rules for active entries, unless a plugin owns
//!   dependency handling.
//!
//! Depends and breaks entries with `unless` exceptions are guarded: the rule
//! only exists while no exception is met by a live option. Guards are
//! re-checked every cycle, so a rule comes back when the exempting candidate
//! disappears, and goes away when one shows up.

use std::collections::HashSet;

use mods_meta::{DependencyHandling, LoadType, ModDependency};
use mods_solver::{
    LoadOption, MandatoryRule, OptionId, ProvidedOption, ProvidesRule, Rule, RuleId, Solver,
};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardKind {
    Depends,
    Breaks,
}

#[derive(Debug)]
struct Guard {
    source: OptionId,
    dependency: ModDependency,
    kind: GuardKind,
    rule: Option<RuleId>,
    /// The rule was removed by a plugin or relaxed; never regenerate it
    dropped: bool,
}

#[derive(Debug, Default)]
pub struct RuleGenerator {
    defined_ids: HashSet<String>,
    guards: Vec<Guard>,
}

impl RuleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate rules for `new_options`. Returns the provided options created
    /// on the way, which are new options too.
    pub fn generate(&mut self, solver: &mut Solver, new_options: &[OptionId]) -> Result<Vec<OptionId>> {
        let mut aliases = Vec::new();
        for &id in new_options {
            let option = solver.option(id)?.clone();
            self.define_id(solver, option.mod_id())?;

            let Some(meta) = option.metadata().cloned() else {
                continue;
            };
            if meta.load_type() == LoadType::Always {
                solver.add_rule(Rule::Mandatory(MandatoryRule { option: id }))?;
            }

            if *meta.provides_handling() == DependencyHandling::Solver {
                for provided in meta.provides() {
                    let alias = solver.add_option(LoadOption::Provided(ProvidedOption {
                        provider: id,
                        id: provided.id.clone(),
                        group: provided.group.clone(),
                        version: provided.version.clone(),
                    }));
                    self.define_id(solver, &provided.id)?;
                    solver.add_rule(Rule::Provides(ProvidesRule {
                        provider: id,
                        provided: alias,
                    }))?;
                    aliases.push(alias);
                }
            }

            if *meta.dependency_handling() == DependencyHandling::Solver {
                let entries = meta
                    .depends()
                    .iter()
                    .map(|d| (GuardKind::Depends, d))
                    .chain(meta.breaks().iter().map(|d| (GuardKind::Breaks, d)));
                for (kind, dependency) in entries {
                    if !dependency.is_active() {
                        tracing::trace!(source = %meta, %dependency, "skipping inactive entry");
                        continue;
                    }
                    self.guards.push(Guard {
                        source: id,
                        dependency: dependency.clone(),
                        kind,
                        rule: None,
                        dropped: false,
                    });
                }
            }
        }
        self.refresh(solver)?;
        Ok(aliases)
    }

    /// Re-evaluate every `unless` guard against the live options.
    pub fn refresh(&mut self, solver: &mut Solver) -> Result<()> {
        self.guards
            .retain(|g| !g.dropped && solver.universe().is_live(g.source));
        for guard in &mut self.guards {
            let exempt = is_exempt(solver, guard.source, &guard.dependency);
            match (exempt, guard.rule) {
                (true, Some(rule)) => {
                    tracing::debug!(dependency = %guard.dependency, "exception now met, removing rule");
                    solver.remove_rule(rule)?;
                    guard.rule = None;
                }
                (false, None) => {
                    let rule = match guard.kind {
                        GuardKind::Depends => Rule::depends(guard.source, guard.dependency.clone()),
                        GuardKind::Breaks => Rule::breaks(guard.source, guard.dependency.clone()),
                    };
                    guard.rule = Some(solver.add_rule(rule)?);
                }
                (true, None) => {
                    tracing::trace!(dependency = %guard.dependency, "exempted by unless");
                }
                (false, Some(_)) => {}
            }
        }
        Ok(())
    }

    /// Stop managing `rule`; it was removed from outside.
    pub fn forget(&mut self, rule: RuleId) {
        for guard in &mut self.guards {
            if guard.rule == Some(rule) {
                guard.rule = None;
                guard.dropped = true;
            }
        }
    }

    fn define_id(&mut self, solver: &mut Solver, mod_id: &str) -> Result<()> {
        if self.defined_ids.insert(mod_id.to_string()) {
            solver.add_rule(Rule::id_definition(mod_id))?;
        }
        Ok(())
    }
}

/// An entry is exempt when any of its `unless` entries is met.
fn is_exempt(solver: &Solver, source: OptionId, dependency: &ModDependency) -> bool {
    dependency
        .unless_entries()
        .iter()
        .any(|u| is_met(solver, source, u))
}

/// Met when active, not itself exempt, and some other known option matches.
fn is_met(solver: &Solver, source: OptionId, dependency: &ModDependency) -> bool {
    dependency.is_active()
        && !is_exempt(solver, source, dependency)
        && solver.universe().live().any(|(id, option)| {
            id != source
                && !option.is_tentative()
                && dependency.matches(option.mod_id(), option.group(), option.version())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mods_meta::{ModMetadata, ProvidedMod};
    use mods_solver::SolveOutcome;
    use mods_version::Version;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn add(solver: &mut Solver, meta: ModMetadata) -> OptionId {
        solver.add_option(LoadOption::concrete(meta))
    }

    fn kinds(solver: &Solver) -> Vec<&'static str> {
        solver.rules().map(|(_, r)| r.kind()).collect()
    }

    #[test]
    fn test_generates_builtin_rules() {
        let mut solver = Solver::new();
        let a = add(
            &mut solver,
            ModMetadata::builder("a", v("1.0"))
                .depends(ModDependency::new("b").unwrap())
                .breaks(ModDependency::new("c").unwrap())
                .provides(ProvidedMod::new("api", v("1.0")).unwrap())
                .build()
                .unwrap(),
        );
        let mut generator = RuleGenerator::new();
        let aliases = generator.generate(&mut solver, &[a]).unwrap();

        assert_eq!(aliases.len(), 1);
        assert_eq!(
            kinds(&solver),
            vec!["id-definition", "mandatory", "id-definition", "provides", "depends", "breaks"]
        );
    }

    #[test]
    fn test_plugin_handling_skips_rules() {
        let mut solver = Solver::new();
        let a = add(
            &mut solver,
            ModMetadata::builder("a", v("1.0"))
                .load_type(LoadType::IfPossible)
                .depends(ModDependency::new("b").unwrap())
                .dependency_handling(DependencyHandling::Plugin("p".to_string()))
                .build()
                .unwrap(),
        );
        RuleGenerator::new().generate(&mut solver, &[a]).unwrap();
        assert_eq!(kinds(&solver), vec!["id-definition"]);
    }

    #[test]
    fn test_inactive_entries_skipped() {
        let mut solver = Solver::new();
        let a = add(
            &mut solver,
            ModMetadata::builder("a", v("1.0"))
                .depends(ModDependency::new("b").unwrap().active(false))
                .build()
                .unwrap(),
        );
        RuleGenerator::new().generate(&mut solver, &[a]).unwrap();
        assert_eq!(kinds(&solver), vec!["id-definition", "mandatory"]);
    }

    #[test]
    fn test_unless_guard_follows_candidates() {
        let mut solver = Solver::new();
        let dep = ModDependency::new("b")
            .unwrap()
            .unless(ModDependency::new("b-lite").unwrap());
        let a = add(
            &mut solver,
            ModMetadata::builder("a", v("1.0")).depends(dep).build().unwrap(),
        );
        let lite = add(
            &mut solver,
            ModMetadata::builder("b-lite", v("1.0"))
                .load_type(LoadType::IfPossible)
                .build()
                .unwrap(),
        );
        let mut generator = RuleGenerator::new();
        generator.generate(&mut solver, &[a, lite]).unwrap();
        assert!(!kinds(&solver).contains(&"depends"));
        assert!(matches!(solver.solve(), SolveOutcome::Satisfied(_)));

        solver.remove_option(lite).unwrap();
        generator.refresh(&mut solver).unwrap();
        assert!(kinds(&solver).contains(&"depends"));
        assert!(matches!(solver.solve(), SolveOutcome::Unsatisfiable(_)));
    }

    #[test]
    fn test_forgotten_rule_not_regenerated() {
        let mut solver = Solver::new();
        let a = add(
            &mut solver,
            ModMetadata::builder("a", v("1.0"))
                .depends(ModDependency::new("b").unwrap())
                .build()
                .unwrap(),
        );
        let mut generator = RuleGenerator::new();
        generator.generate(&mut solver, &[a]).unwrap();
        let (rule, _) = solver
            .rules()
            .find(|(_, r)| r.kind() == "depends")
            .unwrap();
        solver.remove_rule(rule).unwrap();
        generator.forget(rule);
        generator.refresh(&mut solver).unwrap();
        assert!(!kinds(&solver).contains(&"depends"));
    }

    #[rstest]
    #[case(LoadType::Always, vec!["id-definition", "mandatory"])]
    #[case(LoadType::IfPossible, vec!["id-definition"])]
    #[case(LoadType::IfRequired, vec!["id-definition"])]
    fn test_mandatory_rule_only_for_always(
        #[case] load_type: LoadType,
        #[case] expected: Vec<&'static str>,
    ) {
        let mut solver = Solver::new();
        let a = add(
            &mut solver,
            ModMetadata::builder("a", v("1.0"))
                .load_type(load_type)
                .build()
                .unwrap(),
        );
        RuleGenerator::new().generate(&mut solver, &[a]).unwrap();
        assert_eq!(kinds(&solver), expected);
    }
}
