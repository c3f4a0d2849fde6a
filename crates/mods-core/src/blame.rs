//! Turning an unsat core into an explanation.
//!
//! The core is ordered as a chain: it starts at the lowest mandatory rule
//! (or the lowest rule if none is mandatory) and then repeatedly takes the
//! lowest rule sharing an option with the rules taken so far. Rules that
//! share nothing come last, lowest first.

use std::collections::BTreeSet;
use std::fmt;

use mods_solver::{OptionId, Rule, RuleId, Solver, UnsatCore};

/// One rule of a blame chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlamedRule {
    pub id: RuleId,
    pub kind: &'static str,
    /// Full explanation, ending with the declared reason if there is one
    pub description: String,
    /// The reason declared in metadata
    pub reason: Option<String>,
    /// Mod id of the option the rule belongs to
    pub owner: Option<String>,
}

/// A proof that no consistent mod set exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub chain: Vec<BlamedRule>,
    /// The mod most directly responsible
    pub blamed: Option<String>,
}

impl ResolutionFailure {
    /// One line per rule in the chain.
    pub fn explanations(&self) -> Vec<String> {
        self.chain.iter().map(|r| r.description.clone()).collect()
    }

    pub fn mentions(&self, mod_id: &str) -> bool {
        self.chain.iter().any(|r| r.owner.as_deref() == Some(mod_id))
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.blamed {
            Some(id) => write!(f, "no consistent set of mods exists (blaming '{id}')")?,
            None => write!(f, "no consistent set of mods exists")?,
        }
        for (i, rule) in self.chain.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, rule.description)?;
        }
        Ok(())
    }
}

pub(crate) fn explain(solver: &Solver, core: &UnsatCore) -> ResolutionFailure {
    let rules: Vec<(RuleId, &Rule)> = core
        .rules
        .iter()
        .filter_map(|&id| solver.rule(id).ok().map(|r| (id, r)))
        .collect();

    let order = chain_order(&rules);
    let chain: Vec<BlamedRule> = order
        .iter()
        .map(|&i| {
            let (id, rule) = rules[i];
            BlamedRule {
                id,
                kind: rule.kind(),
                description: rule.describe(solver.universe()),
                reason: rule.reason().map(str::to_string),
                owner: owner_id(solver, rule),
            }
        })
        .collect();

    let blamed = order
        .iter()
        .map(|&i| rules[i].1)
        .find(|r| !matches!(r, Rule::Mandatory(_) | Rule::IdDefinition(_)))
        .and_then(|r| owner_id(solver, r))
        .or_else(|| chain.iter().find_map(|r| r.owner.clone()));

    ResolutionFailure { chain, blamed }
}

fn chain_order(rules: &[(RuleId, &Rule)]) -> Vec<usize> {
    let options: Vec<BTreeSet<OptionId>> = rules
        .iter()
        .map(|(_, r)| r.options().into_iter().collect())
        .collect();
    let mut remaining: BTreeSet<usize> = (0..rules.len()).collect();
    let mut order = Vec::with_capacity(rules.len());
    let mut reached: BTreeSet<OptionId> = BTreeSet::new();

    // `rules` is sorted by id, so index order is id order.
    let mut next = rules
        .iter()
        .position(|(_, r)| matches!(r, Rule::Mandatory(_)))
        .or_else(|| remaining.first().copied());
    while let Some(i) = next {
        remaining.remove(&i);
        reached.extend(options[i].iter().copied());
        order.push(i);
        next = remaining
            .iter()
            .copied()
            .find(|&j| !options[j].is_disjoint(&reached))
            .or_else(|| remaining.first().copied());
    }
    order
}

fn owner_id(solver: &Solver, rule: &Rule) -> Option<String> {
    let owner = match rule {
        // The provider is the mod that matters for an alias.
        Rule::Provides(r) => Some(r.provider),
        _ => rule.owner(),
    }?;
    solver
        .universe()
        .lookup(owner)
        .map(|o| o.mod_id().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mods_meta::{LoadType, ModDependency, ModMetadata};
    use mods_solver::{LoadOption, MandatoryRule, SolveOutcome};
    use mods_version::Version;
    use pretty_assertions::assert_eq;

    fn concrete(id: &str, version: &str) -> LoadOption {
        LoadOption::concrete(
            ModMetadata::builder(id, Version::parse(version).unwrap())
                .load_type(LoadType::Always)
                .build()
                .unwrap(),
        )
    }

    fn failure(solver: &mut Solver) -> ResolutionFailure {
        match solver.solve() {
            SolveOutcome::Unsatisfiable(core) => explain(solver, &core),
            SolveOutcome::Satisfied(_) => panic!("expected unsat"),
        }
    }

    #[test]
    fn test_breaks_chain_blames_breaker() {
        let mut solver = Solver::new();
        let a = solver.add_option(concrete("a", "1.0"));
        let b = solver.add_option(concrete("b", "1.0.0"));
        solver
            .add_rule(Rule::Mandatory(MandatoryRule { option: a }))
            .unwrap();
        solver
            .add_rule(Rule::Mandatory(MandatoryRule { option: b }))
            .unwrap();
        let dep = ModDependency::new("b")
            .unwrap()
            .version("=1.0.0")
            .unwrap()
            .reason("b 1.0.0 crashes a on startup");
        solver.add_rule(Rule::breaks(a, dep)).unwrap();

        let failure = failure(&mut solver);
        let kinds: Vec<&str> = failure.chain.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec!["mandatory", "breaks", "mandatory"]);
        assert_eq!(failure.blamed.as_deref(), Some("a"));
        assert!(failure.mentions("b"));
        assert_eq!(
            failure.chain[1].reason.as_deref(),
            Some("b 1.0.0 crashes a on startup")
        );
        assert!(failure.to_string().contains("1. a 1.0 must be loaded"));
    }

    #[test]
    fn test_missing_dependency_chain() {
        let mut solver = Solver::new();
        let a = solver.add_option(concrete("a", "1.0"));
        solver
            .add_rule(Rule::Mandatory(MandatoryRule { option: a }))
            .unwrap();
        solver
            .add_rule(Rule::depends(a, ModDependency::new("missing").unwrap()))
            .unwrap();

        let failure = failure(&mut solver);
        assert_eq!(failure.chain.len(), 2);
        assert!(failure.explanations()[1].contains("candidates: nothing"));
        assert_eq!(failure.blamed.as_deref(), Some("a"));
    }

    #[test]
    fn test_chain_order_follows_shared_options() {
        let mut solver = Solver::new();
        let a = solver.add_option(concrete("a", "1.0"));
        solver.add_option(concrete("b", "1.0"));
        let c = solver.add_option(concrete("c", "1.0"));
        let r0 = solver.add_rule(Rule::breaks(c, ModDependency::new("b").unwrap())).unwrap();
        let r1 = solver.add_rule(Rule::depends(a, ModDependency::new("b").unwrap())).unwrap();
        let r2 = solver.add_rule(Rule::Mandatory(MandatoryRule { option: c })).unwrap();
        let r3 = solver.add_rule(Rule::Mandatory(MandatoryRule { option: a })).unwrap();

        let failure = failure(&mut solver);
        let ids: Vec<RuleId> = failure.chain.iter().map(|r| r.id).collect();
        // Starts at the lowest mandatory rule (c), then its break, then the
        // dependency sharing b, then a's mandatory rule.
        assert_eq!(ids, vec![r2, r0, r1, r3]);
    }
}
