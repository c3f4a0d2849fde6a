//! The per-cycle view plugins work through.
//!
//! Plugins never touch the option/rule universe directly. A [`RuleContext`]
//! gives them a read-only view of it plus a buffer of additions; the
//! resolver merges the buffer once the hook returns. Options added through
//! the buffer are referred to by [`OptionRef::Added`] until then.

use std::future::Future;

use mods_meta::ModMetadata;
use mods_solver::{LoadOption, OptionId, RuleId, Solver};
use mods_version::Version;

use crate::blame::BlamedRule;
use crate::work::{TentativeRequest, TentativeResolver, WorkError, WorkFuture};

/// An option that exists already or one added earlier through the same context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionRef {
    Existing(OptionId),
    Added(usize),
}

impl From<OptionId> for OptionRef {
    fn from(id: OptionId) -> Self {
        Self::Existing(id)
    }
}

/// A rule a plugin wants added, over options that may not exist yet.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub(crate) description: String,
    pub(crate) owner: Option<OptionRef>,
    pub(crate) clauses: Vec<Vec<(OptionRef, bool)>>,
}

impl RuleSpec {
    /// `description` is shown when the rule ends up in a blame chain.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            owner: None,
            clauses: Vec::new(),
        }
    }

    /// Drop the rule together with `option`.
    pub fn owner(mut self, option: impl Into<OptionRef>) -> Self {
        self.owner = Some(option.into());
        self
    }

    /// A raw clause: at least one of the literals must hold.
    pub fn clause(mut self, lits: impl IntoIterator<Item = (OptionRef, bool)>) -> Self {
        self.clauses.push(lits.into_iter().collect());
        self
    }

    pub fn require(self, option: impl Into<OptionRef>) -> Self {
        self.clause([(option.into(), true)])
    }

    pub fn forbid(self, option: impl Into<OptionRef>) -> Self {
        self.clause([(option.into(), false)])
    }

    pub fn implies(self, a: impl Into<OptionRef>, b: impl Into<OptionRef>) -> Self {
        self.clause([(a.into(), false), (b.into(), true)])
    }

    pub fn excludes(self, a: impl Into<OptionRef>, b: impl Into<OptionRef>) -> Self {
        self.clause([(a.into(), false), (b.into(), false)])
    }
}

/// Placeholder for a candidate a plugin will materialise later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TentativeSpec {
    /// Must be unique for the whole resolution
    pub key: String,
    pub mod_id: String,
    pub group: Option<String>,
    pub version: Version,
}

impl TentativeSpec {
    pub fn new(key: impl Into<String>, mod_id: impl Into<String>, version: Version) -> Self {
        Self {
            key: key.into(),
            mod_id: mod_id.into(),
            group: None,
            version,
        }
    }
}

pub(crate) enum AddedOption {
    Candidate(ModMetadata),
    Tentative {
        spec: TentativeSpec,
        resolver: TentativeResolver,
    },
}

/// Everything a plugin asked for during one hook call.
#[derive(Default)]
pub(crate) struct Additions {
    pub(crate) options: Vec<AddedOption>,
    pub(crate) rules: Vec<RuleSpec>,
    pub(crate) work: Vec<(String, WorkFuture<Vec<ModMetadata>>)>,
}

impl Additions {
    pub(crate) fn is_empty(&self) -> bool {
        self.options.is_empty() && self.rules.is_empty() && self.work.is_empty()
    }
}

/// What a plugin sees during rule generation and before each solve.
pub struct RuleContext<'a> {
    plugin: &'a str,
    cycle: usize,
    solver: &'a Solver,
    new_options: &'a [OptionId],
    additions: &'a mut Additions,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        plugin: &'a str,
        cycle: usize,
        solver: &'a Solver,
        new_options: &'a [OptionId],
        additions: &'a mut Additions,
    ) -> Self {
        Self {
            plugin,
            cycle,
            solver,
            new_options,
            additions,
        }
    }

    pub fn plugin(&self) -> &str {
        self.plugin
    }

    /// One-based cycle number.
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Options added since rules were last generated.
    pub fn new_options(&self) -> &[OptionId] {
        self.new_options
    }

    pub fn option(&self, id: OptionId) -> Option<&LoadOption> {
        self.solver.option(id).ok()
    }

    /// Every live option.
    pub fn options(&self) -> impl Iterator<Item = (OptionId, &LoadOption)> {
        self.solver.universe().live()
    }

    /// Live options answering to `mod_id`.
    pub fn options_for(&self, mod_id: &str) -> Vec<OptionId> {
        self.options()
            .filter(|(_, o)| o.mod_id() == mod_id)
            .map(|(id, _)| id)
            .collect()
    }

    /// Add a concrete candidate. Its depends/breaks/provides are turned into
    /// rules like those of scanned candidates.
    pub fn add_candidate(&mut self, metadata: ModMetadata) -> OptionRef {
        self.additions.options.push(AddedOption::Candidate(metadata));
        OptionRef::Added(self.additions.options.len() - 1)
    }

    /// Register a tentative option with the logic that resolves it once the
    /// solver selects it.
    pub fn add_tentative<F, Fut>(&mut self, spec: TentativeSpec, resolve: F) -> OptionRef
    where
        F: FnOnce(TentativeRequest) -> Fut + Send + 'static,
        Fut: Future<Output = Result<ModMetadata, WorkError>> + Send + 'static,
    {
        let resolver: TentativeResolver =
            Box::new(move |request| -> WorkFuture<ModMetadata> { Box::pin(resolve(request)) });
        self.additions
            .options
            .push(AddedOption::Tentative { spec, resolver });
        OptionRef::Added(self.additions.options.len() - 1)
    }

    pub fn add_rule(&mut self, rule: RuleSpec) {
        self.additions.rules.push(rule);
    }

    /// Run `work` on the worker pool. The candidates it yields are added at
    /// the start of the next cycle.
    pub fn submit<Fut>(&mut self, label: impl Into<String>, work: Fut)
    where
        Fut: Future<Output = Result<Vec<ModMetadata>, WorkError>> + Send + 'static,
    {
        self.additions.work.push((label.into(), Box::pin(work)));
    }
}

/// What a plugin sees when the rules turn out to be unsatisfiable.
pub struct UnsatContext<'a> {
    chain: &'a [BlamedRule],
    rules: RuleContext<'a>,
    removals: Vec<RuleId>,
}

impl<'a> UnsatContext<'a> {
    pub(crate) fn new(chain: &'a [BlamedRule], rules: RuleContext<'a>) -> Self {
        Self {
            chain,
            rules,
            removals: Vec::new(),
        }
    }

    /// The blamed rules, most relevant first.
    pub fn chain(&self) -> &[BlamedRule] {
        self.chain
    }

    /// Remove a rule from the chain. Rules outside the chain cannot be
    /// removed; returns false for them.
    pub fn remove_rule(&mut self, id: RuleId) -> bool {
        if !self.chain.iter().any(|r| r.id == id) {
            return false;
        }
        if !self.removals.contains(&id) {
            self.removals.push(id);
        }
        true
    }

    /// Add replacement options and rules.
    pub fn context(&mut self) -> &mut RuleContext<'a> {
        &mut self.rules
    }

    pub(crate) fn into_removals(self) -> Vec<RuleId> {
        self.removals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> ModMetadata {
        ModMetadata::builder(id, Version::parse("1.0").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_added_refs_are_positional() {
        let mut solver = Solver::new();
        let a = solver.add_option(LoadOption::concrete(meta("a")));
        let mut additions = Additions::default();
        let new = [a];
        let mut ctx = RuleContext::new("p", 1, &solver, &new, &mut additions);

        assert_eq!(ctx.options_for("a"), vec![a]);
        assert_eq!(ctx.new_options(), &[a]);
        let b = ctx.add_candidate(meta("b"));
        let t = ctx.add_tentative(
            TentativeSpec::new("k", "t", Version::parse("1.0").unwrap()),
            |req| async move { Ok(meta(&req.mod_id)) },
        );
        assert_eq!(b, OptionRef::Added(0));
        assert_eq!(t, OptionRef::Added(1));
        ctx.add_rule(RuleSpec::new("a needs b").owner(a).implies(a, b));
        assert!(!additions.is_empty());
        assert_eq!(additions.rules[0].clauses.len(), 1);
    }

    #[test]
    fn test_unsat_context_only_removes_chain_rules() {
        let solver = Solver::new();
        let mut additions = Additions::default();
        let ctx = RuleContext::new("p", 1, &solver, &[], &mut additions);
        let mut probe = Solver::new();
        let option = probe.add_option(LoadOption::concrete(meta("a")));
        let in_chain = probe
            .add_rule(mods_solver::Rule::Mandatory(mods_solver::MandatoryRule { option }))
            .unwrap();
        let outside = probe
            .add_rule(mods_solver::Rule::id_definition("a"))
            .unwrap();
        let chain = vec![BlamedRule {
            id: in_chain,
            kind: "mandatory",
            description: "a 1.0 must be loaded".to_string(),
            reason: None,
            owner: Some("a".to_string()),
        }];

        let mut unsat = UnsatContext::new(&chain, ctx);
        assert!(unsat.remove_rule(in_chain));
        assert!(!unsat.remove_rule(outside));
        assert_eq!(unsat.into_removals(), vec![in_chain]);
    }
}
