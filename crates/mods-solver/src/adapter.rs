//! Incremental solver over load options and rules.
//!
//! Each option is one SAT variable. Each rule gets a selector variable `s`
//! and its clauses are added as `¬s ∨ clause`, so a rule is only in force
//! while `s` is assumed. Removing or redefining a rule retires its selector
//! with the unit clause `¬s`; nothing is ever deleted from the engine, which
//! keeps learnt clauses valid across cycles.
//!
//! Solving happens in three steps:
//!
//! 1. Solve under all live selectors.
//! 2. If that fails, shrink the failed selectors to an irreducible core.
//! 3. Otherwise improve the model with soft preferences, one literal at a
//!    time, in a fixed order (see [`Solver::preference_order`]).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mods_meta::LoadType;

use crate::error::{Error, Result};
use crate::option::{LoadOption, OptionId, OptionUniverse, version_rank};
use crate::rule::{Rule, RuleDefiner, RuleId};
use crate::sat::{Lit, SatOutcome, SatSolver, SatStats, Var};

#[derive(Debug)]
struct RuleEntry {
    rule: Rule,
    selector: Var,
}

/// The options chosen by a successful solve.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    selected: BTreeSet<OptionId>,
}

impl Assignment {
    pub fn is_selected(&self, id: OptionId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected options in ascending id order.
    pub fn selected(&self) -> impl Iterator<Item = OptionId> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// A set of rules that cannot hold together. Removing any one of them
/// makes the rest satisfiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatCore {
    pub rules: Vec<RuleId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Satisfied(Assignment),
    Unsatisfiable(UnsatCore),
}

#[derive(Debug)]
pub struct Solver {
    sat: SatSolver,
    universe: OptionUniverse,
    /// Indexed by [`OptionId::index`]
    vars: Vec<Var>,
    rules: BTreeMap<RuleId, RuleEntry>,
    selectors: HashMap<Var, RuleId>,
    next_rule: u32,
}

impl Solver {
    pub fn new() -> Self {
        Self {
            sat: SatSolver::new(),
            universe: OptionUniverse::new(),
            vars: Vec::new(),
            rules: BTreeMap::new(),
            selectors: HashMap::new(),
            next_rule: 0,
        }
    }

    pub fn universe(&self) -> &OptionUniverse {
        &self.universe
    }

    pub fn option(&self, id: OptionId) -> Result<&LoadOption> {
        self.universe.get(id)
    }

    pub fn rule(&self, id: RuleId) -> Result<&Rule> {
        self.rules
            .get(&id)
            .map(|e| &e.rule)
            .ok_or(Error::UnknownRule(id))
    }

    /// Active rules in ascending id order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().map(|(id, e)| (*id, &e.rule))
    }

    pub fn stats(&self) -> SatStats {
        self.sat.stats()
    }

    /// Add an option and let every rule react to it.
    pub fn add_option(&mut self, option: LoadOption) -> OptionId {
        let preferred = matches!(
            option.load_type(),
            Some(LoadType::Always | LoadType::IfPossible)
        );
        let id = self.universe.add(option.clone());
        self.vars.push(self.sat.new_var(preferred));
        tracing::trace!(option = %id, %option, "added option");

        let changed: Vec<RuleId> = self
            .rules
            .iter_mut()
            .filter_map(|(rule_id, entry)| {
                entry.rule.on_option_added(id, &option).then_some(*rule_id)
            })
            .collect();
        for rule_id in changed {
            self.redefine(rule_id);
        }
        id
    }

    /// Remove an option. It is forced false from now on, rules owned by it
    /// are removed and their ids returned.
    pub fn remove_option(&mut self, id: OptionId) -> Result<Vec<RuleId>> {
        self.universe.remove(id)?;
        let var = self.vars[id.index()];
        self.sat.add_clause(&[Lit::negative(var)]);

        let owned: Vec<RuleId> = self
            .rules
            .iter()
            .filter(|(_, e)| e.rule.owner() == Some(id))
            .map(|(rule_id, _)| *rule_id)
            .collect();
        for &rule_id in &owned {
            self.remove_rule(rule_id)?;
        }

        let changed: Vec<RuleId> = self
            .rules
            .iter_mut()
            .filter_map(|(rule_id, entry)| entry.rule.on_option_removed(id).then_some(*rule_id))
            .collect();
        for rule_id in changed {
            self.redefine(rule_id);
        }
        tracing::trace!(option = %id, removed_rules = owned.len(), "removed option");
        Ok(owned)
    }

    /// Swap `old` for a new option. Rules that name `old` explicitly are
    /// rewritten to name the replacement; the rest react as if the new option
    /// were added and the old one removed.
    pub fn replace_option(&mut self, old: OptionId, option: LoadOption) -> Result<OptionId> {
        self.universe.get(old)?;
        let new = self.add_option(option);
        let changed: Vec<RuleId> = self
            .rules
            .iter_mut()
            .filter_map(|(rule_id, entry)| {
                entry.rule.on_option_replaced(old, new).then_some(*rule_id)
            })
            .collect();
        for rule_id in changed {
            self.redefine(rule_id);
        }
        self.remove_option(old)?;
        Ok(new)
    }

    /// Add a rule. Rules that track options by id or version are first shown
    /// every live option.
    ///
    /// # Errors
    ///
    /// Fails if the rule names an option that is unknown or removed.
    pub fn add_rule(&mut self, mut rule: Rule) -> Result<RuleId> {
        for option in rule.options() {
            self.universe.get(option)?;
        }
        for (id, option) in self.universe.live() {
            rule.on_option_added(id, option);
        }

        let rule_id = RuleId(self.next_rule);
        self.next_rule += 1;
        let selector = self.sat.new_var(false);
        self.emit(&rule, selector);
        tracing::trace!(rule = %rule_id, kind = rule.kind(), "added rule");
        self.selectors.insert(selector, rule_id);
        self.rules.insert(rule_id, RuleEntry { rule, selector });
        Ok(rule_id)
    }

    pub fn remove_rule(&mut self, id: RuleId) -> Result<Rule> {
        let entry = self.rules.remove(&id).ok_or(Error::UnknownRule(id))?;
        self.retire(entry.selector);
        tracing::trace!(rule = %id, kind = entry.rule.kind(), "removed rule");
        Ok(entry.rule)
    }

    /// Find an assignment satisfying every rule, or a minimal core of rules
    /// that conflict.
    pub fn solve(&mut self) -> SolveOutcome {
        let assumptions: Vec<Lit> = self
            .rules
            .values()
            .map(|e| Lit::positive(e.selector))
            .collect();

        let outcome = match self.sat.solve(&assumptions) {
            SatOutcome::Unsat { failed } => {
                let failed = self.rule_ids(&failed);
                let core = self.minimise_core(failed);
                tracing::debug!(core = core.len(), "rules are unsatisfiable");
                SolveOutcome::Unsatisfiable(UnsatCore { rules: core })
            }
            SatOutcome::Sat => {
                self.apply_preferences(assumptions);
                let selected: BTreeSet<OptionId> = self
                    .universe
                    .live()
                    .map(|(id, _)| id)
                    .filter(|id| self.sat.model_value(Lit::positive(self.vars[id.index()])))
                    .collect();
                tracing::debug!(selected = selected.len(), "rules are satisfiable");
                SolveOutcome::Satisfied(Assignment { selected })
            }
        };
        let stats = self.sat.stats();
        tracing::trace!(
            solves = stats.solves,
            decisions = stats.decisions,
            conflicts = stats.conflicts,
            learnt = stats.learnt,
            "sat statistics"
        );
        outcome
    }

    /// Soft literals, in the order they are tried:
    ///
    /// 1. `always`/`if_possible` concrete options enabled, by id first
    ///    appearance, then highest version, then most recently added;
    /// 2. tentative options disabled, oldest first;
    /// 3. `if_required` concrete options disabled, by id first appearance,
    ///    then lowest version, then oldest.
    ///
    /// Provided options follow their provider and get no preference.
    pub fn preference_order(&self) -> Vec<(OptionId, bool)> {
        let mut wanted = Vec::new();
        let mut tentative = Vec::new();
        let mut required = Vec::new();
        for (id, option) in self.universe.live() {
            match option.load_type() {
                Some(LoadType::Always | LoadType::IfPossible) => wanted.push((id, option)),
                Some(LoadType::IfRequired) => required.push((id, option)),
                None if option.is_tentative() => tentative.push(id),
                None => {}
            }
        }

        let rank = |o: &LoadOption| self.universe.id_rank(o.mod_id());
        wanted.sort_by(|(ia, a), (ib, b)| {
            rank(a)
                .cmp(&rank(b))
                .then_with(|| version_rank(b.version(), a.version()))
                .then_with(|| ib.cmp(ia))
        });
        required.sort_by(|(ia, a), (ib, b)| {
            rank(a)
                .cmp(&rank(b))
                .then_with(|| version_rank(a.version(), b.version()))
                .then_with(|| ia.cmp(ib))
        });

        wanted
            .into_iter()
            .map(|(id, _)| (id, true))
            .chain(tentative.into_iter().map(|id| (id, false)))
            .chain(required.into_iter().map(|(id, _)| (id, false)))
            .collect()
    }

    fn apply_preferences(&mut self, mut fixed: Vec<Lit>) {
        for (id, positive) in self.preference_order() {
            let lit = Lit::new(self.vars[id.index()], positive);
            if self.sat.model_value(lit) {
                fixed.push(lit);
                continue;
            }
            fixed.push(lit);
            if let SatOutcome::Unsat { .. } = self.sat.solve(&fixed) {
                // The last model still stands and already has `!lit`.
                fixed.pop();
                fixed.push(!lit);
            }
        }
    }

    /// Drop rules from the core one at a time, keeping a removal whenever the
    /// rest is still unsatisfiable.
    fn minimise_core(&mut self, mut core: Vec<RuleId>) -> Vec<RuleId> {
        let mut i = 0;
        while i < core.len() {
            let trial: Vec<Lit> = core
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .filter_map(|(_, id)| self.rules.get(id))
                .map(|e| Lit::positive(e.selector))
                .collect();
            match self.sat.solve(&trial) {
                // Every rule already known to be needed is in `failed`, so
                // position `i` now holds the next untested rule.
                SatOutcome::Unsat { failed } => core = self.rule_ids(&failed),
                SatOutcome::Sat => i += 1,
            }
        }
        core
    }

    fn rule_ids(&self, lits: &[Lit]) -> Vec<RuleId> {
        let mut ids: Vec<RuleId> = lits
            .iter()
            .filter_map(|l| self.selectors.get(&l.var()).copied())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn redefine(&mut self, id: RuleId) {
        let selector = self.sat.new_var(false);
        let Some(entry) = self.rules.get_mut(&id) else {
            return;
        };
        let old = std::mem::replace(&mut entry.selector, selector);
        let rule = entry.rule.clone();
        self.retire(old);
        self.emit(&rule, selector);
        self.selectors.insert(selector, id);
    }

    fn retire(&mut self, selector: Var) {
        self.selectors.remove(&selector);
        self.sat.add_clause(&[Lit::negative(selector)]);
    }

    fn emit(&mut self, rule: &Rule, selector: Var) {
        let mut definer = RuleDefiner::new();
        rule.define(&mut definer);
        for clause in definer.into_clauses() {
            let lits: Vec<Lit> = std::iter::once(Lit::negative(selector))
                .chain(
                    clause
                        .iter()
                        .map(|l| Lit::new(self.vars[l.option.index()], l.positive)),
                )
                .collect();
            self.sat.add_clause(&lits);
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}
