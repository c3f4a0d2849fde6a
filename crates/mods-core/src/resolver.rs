//! The cycle orchestrator.
//!
//! ```text
//!          ┌──────────────────────────────────────────────┐
//!          ▼                                              │
//!   SCAN ──► GENERATE_RULES ──► SOLVE ──┬─► SUCCESS        │
//!   (join work)  (built-in +            ├─► TENTATIVE_PENDING (spawn resolvers)
//!                 plugin hooks)         └─► UNSAT ──► plugin repair / relax ──┘
//! ```
//!
//! One session owns the solver, the rule generator and all plugin state.
//! Plugin hooks only see a [`RuleContext`]; their additions are merged by
//! the session right after the hook returns.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use mods_meta::{ModMetadata, ModScanner, ResolverConfig};
use mods_solver::{
    Assignment, LoadOption, OptionId, OptionLit, PluginRule, Rule, RuleId, SolveOutcome, Solver,
    TentativeFailedRule, TentativeOption, UnsatCore,
};

use crate::blame::{self, ResolutionFailure};
use crate::context::{AddedOption, Additions, OptionRef, RuleContext, UnsatContext};
use crate::error::{ResolveError, Result};
use crate::generator::RuleGenerator;
use crate::plugin::{Hook, Plugin, PluginHooks, RulesHook, UnsatResponse};
use crate::result::{ModSolveResult, ProvidedSelection};
use crate::work::{Completed, TentativeRequest, TentativeResolver, WorkQueue};

/// Entry point of a resolution.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> mods_core::Result<()> {
/// use mods_core::Resolver;
/// use mods_meta::DirectoryScanner;
///
/// let result = Resolver::builder()
///     .scanner(DirectoryScanner::new("mods"))
///     .build()
///     .resolve()
///     .await?;
/// for (id, meta) in result.direct() {
///     println!("{id} {}", meta.version());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Resolver {
    candidates: Vec<ModMetadata>,
    scanners: Vec<Box<dyn ModScanner>>,
    plugins: Vec<Plugin>,
    config: ResolverConfig,
}

#[derive(Default)]
pub struct ResolverBuilder {
    candidates: Vec<ModMetadata>,
    scanners: Vec<Box<dyn ModScanner>>,
    plugins: Vec<Plugin>,
    config: ResolverConfig,
}

impl ResolverBuilder {
    pub fn candidate(mut self, metadata: ModMetadata) -> Self {
        self.candidates.push(metadata);
        self
    }

    pub fn candidates(mut self, metadata: impl IntoIterator<Item = ModMetadata>) -> Self {
        self.candidates.extend(metadata);
        self
    }

    pub fn scanner(mut self, scanner: impl ModScanner + 'static) -> Self {
        self.scanners.push(Box::new(scanner));
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            candidates: self.candidates,
            scanners: self.scanners,
            plugins: self.plugins,
            config: self.config,
        }
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Run the resolution to completion.
    ///
    /// Must be called inside a tokio runtime; plugin work is spawned on it.
    ///
    /// # Errors
    ///
    /// See [`ResolveError`] for the failure taxonomy. Unsatisfiable rule sets
    /// are only reported once plugins and the fallback relaxation had their
    /// chance.
    pub async fn resolve(self) -> Result<ModSolveResult> {
        let Resolver {
            candidates,
            scanners,
            plugins,
            config,
        } = self;

        let mut ids = HashSet::new();
        for plugin in &plugins {
            if !ids.insert(plugin.id().to_string()) {
                return Err(ResolveError::plugin(plugin.id(), "registered twice"));
            }
        }

        let mut session = Session::new(plugins, config);
        let mut found = candidates;
        for scanner in &scanners {
            let scanned = scanner.scan().await?;
            tracing::debug!(scanner = scanner.name(), candidates = scanned.len(), "scan finished");
            found.extend(scanned);
        }
        for metadata in found {
            session.add_candidate(metadata)?;
        }
        session.run().await
    }
}

#[derive(Debug, Clone, Copy)]
enum RulesSlot {
    GenerateRules,
    BeforeSolve,
}

impl RulesSlot {
    fn of(self, hooks: &mut PluginHooks) -> &mut Hook<RulesHook> {
        match self {
            Self::GenerateRules => &mut hooks.generate_rules,
            Self::BeforeSolve => &mut hooks.before_solve,
        }
    }
}

struct PendingTentative {
    plugin: String,
    key: String,
    /// Taken when the option is first selected
    resolver: Option<TentativeResolver>,
}

struct Session {
    solver: Solver,
    generator: RuleGenerator,
    plugins: Vec<Plugin>,
    plugin_ids: HashSet<String>,
    config: ResolverConfig,
    tentatives: HashMap<OptionId, PendingTentative>,
    seen_keys: HashSet<String>,
    work: WorkQueue,
    new_options: Vec<OptionId>,
    relaxed: Vec<String>,
    cycle: usize,
}

impl Session {
    fn new(plugins: Vec<Plugin>, config: ResolverConfig) -> Self {
        let plugin_ids = plugins.iter().map(|p| p.id().to_string()).collect();
        Self {
            solver: Solver::new(),
            generator: RuleGenerator::new(),
            plugins,
            plugin_ids,
            config,
            tentatives: HashMap::new(),
            seen_keys: HashSet::new(),
            work: WorkQueue::new(),
            new_options: Vec::new(),
            relaxed: Vec::new(),
            cycle: 0,
        }
    }

    async fn run(&mut self) -> Result<ModSolveResult> {
        let max_cycles = self.config.resolver.max_cycles;
        let mut relaxed_in_episode = false;
        loop {
            self.cycle += 1;
            if self.cycle > max_cycles {
                return Err(ResolveError::consistency(format!(
                    "resolution did not settle within {max_cycles} cycles"
                )));
            }
            tracing::debug!(cycle = self.cycle, pending_work = self.work.len(), "scan");
            self.collect_work().await?;

            tracing::debug!(cycle = self.cycle, new_options = self.new_options.len(), "generate rules");
            self.generate()?;
            self.run_rules_hooks(RulesSlot::BeforeSolve, &[])?;
            if !self.new_options.is_empty() {
                self.generate()?;
            }

            tracing::debug!(cycle = self.cycle, "solve");
            match self.solver.solve() {
                SolveOutcome::Satisfied(assignment) => {
                    relaxed_in_episode = false;
                    let pending: Vec<OptionId> = assignment
                        .selected()
                        .filter(|id| self.tentatives.contains_key(id))
                        .collect();
                    if !pending.is_empty() {
                        tracing::info!(cycle = self.cycle, tentative = pending.len(), "resolving tentative options");
                        for id in pending {
                            self.start_tentative(id)?;
                        }
                    } else if self.work.is_empty() {
                        return self.finish(&assignment);
                    }
                }
                SolveOutcome::Unsatisfiable(core) => {
                    let failure = blame::explain(&self.solver, &core);
                    tracing::info!(cycle = self.cycle, rules = failure.chain.len(), "rules are unsatisfiable");
                    if !self.work.is_empty() {
                        // Outstanding candidates may still fix it.
                        continue;
                    }
                    if self.offer_unsat(&failure)? {
                        continue;
                    }
                    if self.config.resolver.relax_on_unsat
                        && !relaxed_in_episode
                        && let Some(rule) = self.pick_relaxation(&core)
                    {
                        self.relax(rule)?;
                        relaxed_in_episode = true;
                        continue;
                    }
                    return Err(ResolveError::Unsatisfiable(Box::new(failure)));
                }
            }
        }
    }

    /// Configuration and plugin checks every concrete candidate goes through,
    /// scanned or resolved from a tentative. `None` for disabled mods.
    fn admit(&self, metadata: ModMetadata) -> Result<Option<ModMetadata>> {
        if self.config.is_disabled(metadata.id()) {
            tracing::debug!(id = metadata.id(), "candidate disabled by configuration");
            return Ok(None);
        }
        let metadata = self.config.apply_overrides(metadata);
        for handling in [metadata.dependency_handling(), metadata.provides_handling()] {
            if let Some(plugin) = handling.plugin()
                && !self.plugin_ids.contains(plugin)
            {
                return Err(ResolveError::UnknownPlugin {
                    mod_id: metadata.id().to_string(),
                    plugin: plugin.to_string(),
                });
            }
        }
        Ok(Some(metadata))
    }

    fn add_candidate(&mut self, metadata: ModMetadata) -> Result<Option<OptionId>> {
        let Some(metadata) = self.admit(metadata)? else {
            return Ok(None);
        };
        let id = self.solver.add_option(LoadOption::concrete(metadata));
        self.new_options.push(id);
        Ok(Some(id))
    }

    async fn collect_work(&mut self) -> Result<()> {
        if self.work.is_empty() {
            return Ok(());
        }
        for completed in self.work.join_all().await {
            match completed {
                Completed::Candidates {
                    plugin,
                    label,
                    result,
                } => match result {
                    Ok(found) => {
                        tracing::debug!(%plugin, %label, candidates = found.len(), "work finished");
                        for metadata in found {
                            self.add_candidate(metadata)?;
                        }
                    }
                    Err(e) if e.fatal => {
                        return Err(ResolveError::WorkFailed {
                            label,
                            message: e.message,
                        });
                    }
                    Err(e) => tracing::warn!(%plugin, %label, error = %e, "work item failed"),
                },
                Completed::Tentative {
                    plugin,
                    label,
                    option,
                    result,
                } => match result {
                    Ok(metadata) => match self.admit(metadata)? {
                        Some(metadata) => {
                            tracing::info!(%plugin, key = %label, replacement = %metadata, "tentative option resolved");
                            let replacement = self
                                .solver
                                .replace_option(option, LoadOption::concrete(metadata))?;
                            self.tentatives.remove(&option);
                            self.new_options.push(replacement);
                        }
                        None => {
                            tracing::warn!(%plugin, key = %label, "tentative option resolved to a disabled mod");
                            self.solver
                                .add_rule(Rule::TentativeFailed(TentativeFailedRule {
                                    option,
                                    reason: "resolved mod is disabled by configuration".to_string(),
                                }))?;
                        }
                    },
                    Err(e) if e.fatal => {
                        return Err(ResolveError::WorkFailed {
                            label,
                            message: e.message,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(%plugin, key = %label, error = %e, "tentative option could not be resolved");
                        self.solver
                            .add_rule(Rule::TentativeFailed(TentativeFailedRule {
                                option,
                                reason: e.message,
                            }))?;
                    }
                },
            }
        }
        Ok(())
    }

    /// Built-in rules and `generate_rules` hooks, repeated while plugins add
    /// candidates.
    fn generate(&mut self) -> Result<()> {
        let limit = self.config.resolver.max_cycles;
        for _ in 0..limit {
            let mut fresh = std::mem::take(&mut self.new_options);
            let aliases = self.generator.generate(&mut self.solver, &fresh)?;
            fresh.extend(aliases);
            self.run_rules_hooks(RulesSlot::GenerateRules, &fresh)?;
            if self.new_options.is_empty() {
                return Ok(());
            }
        }
        Err(ResolveError::consistency(format!(
            "plugins kept adding options for {limit} rounds in cycle {}",
            self.cycle
        )))
    }

    fn run_rules_hooks(&mut self, slot: RulesSlot, new_options: &[OptionId]) -> Result<()> {
        for i in 0..self.plugins.len() {
            let mut hook = std::mem::take(slot.of(self.plugins[i].hooks_mut()));
            let Some(f) = hook.get_mut() else {
                continue;
            };
            let plugin = self.plugins[i].id().to_string();
            let mut additions = Additions::default();
            let outcome = {
                let mut ctx =
                    RuleContext::new(&plugin, self.cycle, &self.solver, new_options, &mut additions);
                f(&mut ctx)
            };
            *slot.of(self.plugins[i].hooks_mut()) = hook;
            outcome.map_err(|e| ResolveError::plugin(&plugin, e.0))?;
            self.merge(&plugin, additions)?;
        }
        Ok(())
    }

    /// Apply what a plugin added through its context.
    fn merge(&mut self, plugin: &str, additions: Additions) -> Result<()> {
        let mut added: Vec<Option<OptionId>> = Vec::with_capacity(additions.options.len());
        for option in additions.options {
            let id = match option {
                AddedOption::Candidate(metadata) => self.add_candidate(metadata)?,
                AddedOption::Tentative { spec, resolver } => {
                    if !self.seen_keys.insert(spec.key.clone()) {
                        return Err(ResolveError::consistency(format!(
                            "plugin '{plugin}' registered tentative option '{}' twice",
                            spec.key
                        )));
                    }
                    let id = self.solver.add_option(LoadOption::Tentative(TentativeOption {
                        key: spec.key.clone(),
                        owner: plugin.to_string(),
                        id: spec.mod_id,
                        group: spec.group,
                        version: spec.version,
                    }));
                    self.tentatives.insert(
                        id,
                        PendingTentative {
                            plugin: plugin.to_string(),
                            key: spec.key,
                            resolver: Some(resolver),
                        },
                    );
                    self.new_options.push(id);
                    Some(id)
                }
            };
            added.push(id);
        }

        let lookup = |r: OptionRef| -> Result<OptionId> {
            match r {
                OptionRef::Existing(id) => Ok(id),
                OptionRef::Added(i) => added.get(i).copied().flatten().ok_or_else(|| {
                    ResolveError::plugin(plugin, format!("rule refers to option {i}, which was not added"))
                }),
            }
        };
        for spec in additions.rules {
            let mut clauses = Vec::with_capacity(spec.clauses.len());
            for clause in &spec.clauses {
                let mut lits = Vec::with_capacity(clause.len());
                for &(option, positive) in clause {
                    lits.push(OptionLit {
                        option: lookup(option)?,
                        positive,
                    });
                }
                clauses.push(lits);
            }
            let owner = spec.owner.map(lookup).transpose()?;
            let rule = Rule::Plugin(PluginRule {
                plugin: plugin.to_string(),
                description: spec.description,
                owner,
                clauses,
            });
            self.solver
                .add_rule(rule)
                .map_err(|e| ResolveError::plugin(plugin, e.to_string()))?;
        }

        for (label, work) in additions.work {
            self.work.spawn_candidates(plugin, label, work);
        }
        Ok(())
    }

    fn start_tentative(&mut self, id: OptionId) -> Result<()> {
        let entry = self.tentatives.get_mut(&id).ok_or_else(|| {
            ResolveError::consistency(format!("option {id} is not a registered tentative option"))
        })?;
        let resolver = entry.resolver.take().ok_or_else(|| {
            ResolveError::consistency(format!(
                "tentative option '{}' was selected again after its resolution",
                entry.key
            ))
        })?;
        let option = self.solver.option(id)?;
        let request = TentativeRequest {
            key: entry.key.clone(),
            mod_id: option.mod_id().to_string(),
            version: option.version().clone(),
        };
        self.work.spawn_tentative(&entry.plugin, id, request, resolver);
        Ok(())
    }

    /// Offer the chain to each plugin in turn. Returns true once one of them
    /// changed something.
    fn offer_unsat(&mut self, failure: &ResolutionFailure) -> Result<bool> {
        for i in 0..self.plugins.len() {
            let mut hook = std::mem::take(&mut self.plugins[i].hooks_mut().on_unsat);
            let Some(f) = hook.get_mut() else {
                continue;
            };
            let plugin = self.plugins[i].id().to_string();
            let mut additions = Additions::default();
            let (response, removals) = {
                let ctx = RuleContext::new(&plugin, self.cycle, &self.solver, &[], &mut additions);
                let mut unsat = UnsatContext::new(&failure.chain, ctx);
                let response = f(&mut unsat);
                (response, unsat.into_removals())
            };
            self.plugins[i].hooks_mut().on_unsat = hook;

            if response == UnsatResponse::Declined {
                continue;
            }
            if removals.is_empty() && additions.is_empty() {
                return Err(ResolveError::consistency(format!(
                    "plugin '{plugin}' claimed to handle an unsatisfiable rule set without changing it"
                )));
            }
            for rule in removals {
                tracing::info!(%plugin, %rule, "plugin removed rule");
                self.solver.remove_rule(rule)?;
                self.generator.forget(rule);
            }
            self.merge(&plugin, additions)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// The rule the fallback drops: a depends, breaks or plugin rule whose
    /// owner is not mandatory, preferring the least mandatory load type, then
    /// the most recently added owner, then the newest rule.
    fn pick_relaxation(&self, core: &UnsatCore) -> Option<RuleId> {
        let mandatory: HashSet<OptionId> = self
            .solver
            .rules()
            .filter_map(|(_, r)| match r {
                Rule::Mandatory(m) => Some(m.option),
                _ => None,
            })
            .collect();
        core.rules
            .iter()
            .filter_map(|&id| {
                let rule = self.solver.rule(id).ok()?;
                if !matches!(rule, Rule::Depends(_) | Rule::Breaks(_) | Rule::Plugin(_)) {
                    return None;
                }
                let owner = rule.owner();
                if owner.is_some_and(|o| mandatory.contains(&o)) {
                    return None;
                }
                let load_type = owner
                    .and_then(|o| self.solver.universe().lookup(o))
                    .and_then(LoadOption::load_type);
                Some((load_type, owner, id))
            })
            .min_by(|a, b| {
                a.0.cmp(&b.0)
                    .then_with(|| b.1.cmp(&a.1))
                    .then_with(|| b.2.cmp(&a.2))
            })
            .map(|(_, _, id)| id)
    }

    fn relax(&mut self, rule: RuleId) -> Result<()> {
        let description = self.solver.rule(rule)?.describe(self.solver.universe());
        self.solver.remove_rule(rule)?;
        self.generator.forget(rule);
        tracing::warn!(%rule, %description, "dropping rule to recover from an unsatisfiable set");
        self.relaxed.push(description);
        Ok(())
    }

    fn finish(&mut self, assignment: &Assignment) -> Result<ModSolveResult> {
        let mut direct: BTreeMap<String, Arc<ModMetadata>> = BTreeMap::new();
        let mut provided: BTreeMap<String, ProvidedSelection> = BTreeMap::new();
        for id in assignment.selected() {
            match self.solver.option(id)? {
                LoadOption::Concrete(c) => {
                    let mod_id = c.metadata.id().to_string();
                    if direct.insert(mod_id.clone(), Arc::clone(&c.metadata)).is_some() {
                        return Err(ResolveError::consistency(format!(
                            "two options selected for mod '{mod_id}'"
                        )));
                    }
                }
                LoadOption::Provided(p) => {
                    let provider = self
                        .solver
                        .option(p.provider)?
                        .metadata()
                        .cloned()
                        .ok_or_else(|| {
                            ResolveError::consistency(format!("provider of '{}' is not concrete", p.id))
                        })?;
                    let selection = ProvidedSelection {
                        version: p.version.clone(),
                        provider,
                    };
                    if provided.insert(p.id.clone(), selection).is_some() {
                        return Err(ResolveError::consistency(format!(
                            "two providers selected for '{}'",
                            p.id
                        )));
                    }
                }
                LoadOption::Tentative(t) => {
                    return Err(ResolveError::consistency(format!(
                        "tentative option '{}' reached the final selection",
                        t.key
                    )));
                }
            }
        }
        for (id, selection) in &provided {
            if direct
                .get(id)
                .is_some_and(|d| !Arc::ptr_eq(d, &selection.provider))
            {
                return Err(ResolveError::consistency(format!(
                    "'{id}' resolves to two different mods"
                )));
            }
        }

        let draft = ModSolveResult::new(direct, provided, std::mem::take(&mut self.relaxed), self.cycle);
        let mut extras = BTreeMap::new();
        for plugin in &mut self.plugins {
            let id = plugin.id().to_string();
            if let Some(finish) = plugin.hooks_mut().finish.get_mut()
                && let Some(payload) = finish(&draft).map_err(|e| ResolveError::plugin(&id, e.0))?
            {
                extras.insert(id, payload);
            }
        }
        let result = draft.with_extras(extras);
        for plugin in &mut self.plugins {
            if let Some(on_result) = plugin.hooks_mut().on_result.get_mut() {
                on_result(&result);
            }
        }
        tracing::info!(
            cycles = self.cycle,
            mods = result.direct().len(),
            provided = result.provided().len(),
            "resolution finished"
        );
        Ok(result)
    }
}
