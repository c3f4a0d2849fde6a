//! Rules: named constraints over load options.
//!
//! A rule is both a source of clauses and the unit of blame. Rules react to
//! options being added, removed or replaced; when a reaction changes the
//! clauses a rule would emit, the owning [`Solver`](crate::Solver) redefines
//! it.

use std::fmt;

use mods_meta::ModDependency;

use crate::option::{LoadOption, OptionId, OptionUniverse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// An option or its negation inside a rule clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionLit {
    pub option: OptionId,
    pub positive: bool,
}

impl OptionLit {
    pub fn positive(option: OptionId) -> Self {
        Self {
            option,
            positive: true,
        }
    }

    pub fn negative(option: OptionId) -> Self {
        Self {
            option,
            positive: false,
        }
    }
}

/// Collects the clauses a rule emits.
#[derive(Debug, Default)]
pub struct RuleDefiner {
    clauses: Vec<Vec<OptionLit>>,
}

impl RuleDefiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clause(&mut self, lits: impl IntoIterator<Item = OptionLit>) {
        self.clauses.push(lits.into_iter().collect());
    }

    pub fn require(&mut self, option: OptionId) {
        self.clause([OptionLit::positive(option)]);
    }

    pub fn forbid(&mut self, option: OptionId) {
        self.clause([OptionLit::negative(option)]);
    }

    /// `a → b`
    pub fn implies(&mut self, a: OptionId, b: OptionId) {
        self.clause([OptionLit::negative(a), OptionLit::positive(b)]);
    }

    /// `¬(a ∧ b)`
    pub fn excludes(&mut self, a: OptionId, b: OptionId) {
        self.clause([OptionLit::negative(a), OptionLit::negative(b)]);
    }

    /// `a → (b1 ∨ b2 ∨ …)`; with no `b` this forbids `a`.
    pub fn implies_any(&mut self, a: OptionId, options: &[OptionId]) {
        self.clause(
            std::iter::once(OptionLit::negative(a))
                .chain(options.iter().copied().map(OptionLit::positive)),
        );
    }

    pub fn at_least_one_of(&mut self, options: &[OptionId]) {
        self.clause(options.iter().copied().map(OptionLit::positive));
    }

    /// Pairwise encoding.
    pub fn at_most_one_of(&mut self, options: &[OptionId]) {
        for (i, &a) in options.iter().enumerate() {
            for &b in &options[i + 1..] {
                self.excludes(a, b);
            }
        }
    }

    pub fn into_clauses(self) -> Vec<Vec<OptionLit>> {
        self.clauses
    }
}

/// An option that must be loaded.
#[derive(Debug, Clone)]
pub struct MandatoryRule {
    pub option: OptionId,
}

/// At most one option may answer to a given mod id.
#[derive(Debug, Clone)]
pub struct IdDefinitionRule {
    pub mod_id: String,
    pub options: Vec<OptionId>,
}

/// A concrete option and one of its aliases are loaded together or not at all.
#[derive(Debug, Clone)]
pub struct ProvidesRule {
    pub provider: OptionId,
    pub provided: OptionId,
}

/// `source` needs one of the options matching `dependency`.
#[derive(Debug, Clone)]
pub struct DependsRule {
    pub source: OptionId,
    pub dependency: ModDependency,
    /// Options with the target id whose version matches
    pub matching: Vec<OptionId>,
    /// Options with the target id whose version or group does not match
    pub mismatching: Vec<OptionId>,
}

/// `source` cannot be loaded together with options matching `dependency`.
#[derive(Debug, Clone)]
pub struct BreaksRule {
    pub source: OptionId,
    pub dependency: ModDependency,
    pub conflicts: Vec<OptionId>,
}

/// Clauses supplied directly by a plugin.
#[derive(Debug, Clone)]
pub struct PluginRule {
    pub plugin: String,
    pub description: String,
    /// Option on whose behalf the rule exists, if any
    pub owner: Option<OptionId>,
    pub clauses: Vec<Vec<OptionLit>>,
}

/// A tentative option whose resolution failed.
#[derive(Debug, Clone)]
pub struct TentativeFailedRule {
    pub option: OptionId,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Mandatory(MandatoryRule),
    IdDefinition(IdDefinitionRule),
    Provides(ProvidesRule),
    Depends(DependsRule),
    Breaks(BreaksRule),
    Plugin(PluginRule),
    TentativeFailed(TentativeFailedRule),
}

impl Rule {
    pub fn depends(source: OptionId, dependency: ModDependency) -> Self {
        Self::Depends(DependsRule {
            source,
            dependency,
            matching: Vec::new(),
            mismatching: Vec::new(),
        })
    }

    pub fn breaks(source: OptionId, dependency: ModDependency) -> Self {
        Self::Breaks(BreaksRule {
            source,
            dependency,
            conflicts: Vec::new(),
        })
    }

    pub fn id_definition(mod_id: impl Into<String>) -> Self {
        Self::IdDefinition(IdDefinitionRule {
            mod_id: mod_id.into(),
            options: Vec::new(),
        })
    }

    /// Short name of the rule kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mandatory(_) => "mandatory",
            Self::IdDefinition(_) => "id-definition",
            Self::Provides(_) => "provides",
            Self::Depends(_) => "depends",
            Self::Breaks(_) => "breaks",
            Self::Plugin(_) => "plugin",
            Self::TentativeFailed(_) => "tentative-failed",
        }
    }

    /// The option this rule exists for; the rule is dropped with it.
    pub fn owner(&self) -> Option<OptionId> {
        match self {
            Self::Mandatory(r) => Some(r.option),
            Self::IdDefinition(_) => None,
            Self::Provides(r) => Some(r.provided),
            Self::Depends(r) => Some(r.source),
            Self::Breaks(r) => Some(r.source),
            Self::Plugin(r) => r.owner,
            Self::TentativeFailed(r) => Some(r.option),
        }
    }

    /// Every option the rule mentions, in ascending order.
    pub fn options(&self) -> Vec<OptionId> {
        let mut options = match self {
            Self::Mandatory(r) => vec![r.option],
            Self::IdDefinition(r) => r.options.clone(),
            Self::Provides(r) => vec![r.provider, r.provided],
            Self::Depends(r) => std::iter::once(r.source)
                .chain(r.matching.iter().copied())
                .chain(r.mismatching.iter().copied())
                .collect(),
            Self::Breaks(r) => std::iter::once(r.source)
                .chain(r.conflicts.iter().copied())
                .collect(),
            Self::Plugin(r) => r.clauses.iter().flatten().map(|l| l.option).collect(),
            Self::TentativeFailed(r) => vec![r.option],
        };
        options.sort();
        options.dedup();
        options
    }

    /// The reason declared in metadata, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Depends(r) => r.dependency.reason_text(),
            Self::Breaks(r) => r.dependency.reason_text(),
            Self::TentativeFailed(r) => Some(&r.reason),
            _ => None,
        }
    }

    /// React to a new option. Returns true if the rule must be redefined.
    pub fn on_option_added(&mut self, id: OptionId, option: &LoadOption) -> bool {
        match self {
            Self::IdDefinition(r) => {
                if option.mod_id() != r.mod_id || r.options.contains(&id) {
                    return false;
                }
                r.options.push(id);
                true
            }
            Self::Depends(r) => {
                if id == r.source
                    || option.mod_id() != r.dependency.id()
                    || r.matching.contains(&id)
                    || r.mismatching.contains(&id)
                {
                    return false;
                }
                if r.dependency
                    .matches(option.mod_id(), option.group(), option.version())
                {
                    r.matching.push(id);
                    !r.dependency.is_optional()
                } else {
                    r.mismatching.push(id);
                    r.dependency.is_optional()
                }
            }
            Self::Breaks(r) => {
                // A mod never conflicts with the aliases it provides itself.
                if id == r.source
                    || option.provider() == Some(r.source)
                    || r.conflicts.contains(&id)
                    || !r
                        .dependency
                        .matches(option.mod_id(), option.group(), option.version())
                {
                    return false;
                }
                r.conflicts.push(id);
                true
            }
            Self::Mandatory(_)
            | Self::Provides(_)
            | Self::Plugin(_)
            | Self::TentativeFailed(_) => false,
        }
    }

    /// React to an option disappearing. Returns true if the rule must be redefined.
    pub fn on_option_removed(&mut self, id: OptionId) -> bool {
        fn drop_id(list: &mut Vec<OptionId>, id: OptionId) -> bool {
            let before = list.len();
            list.retain(|o| *o != id);
            list.len() != before
        }
        match self {
            Self::IdDefinition(r) => drop_id(&mut r.options, id),
            Self::Depends(r) => {
                let matched = drop_id(&mut r.matching, id);
                let mismatched = drop_id(&mut r.mismatching, id);
                matched || mismatched
            }
            Self::Breaks(r) => drop_id(&mut r.conflicts, id),
            Self::Mandatory(_)
            | Self::Provides(_)
            | Self::Plugin(_)
            | Self::TentativeFailed(_) => false,
        }
    }

    /// Substitute `new` for `old` where the rule names `old` explicitly.
    /// Returns true if the rule must be redefined.
    pub fn on_option_replaced(&mut self, old: OptionId, new: OptionId) -> bool {
        match self {
            Self::Plugin(r) => {
                let mut changed = false;
                for lit in r.clauses.iter_mut().flatten() {
                    if lit.option == old {
                        lit.option = new;
                        changed = true;
                    }
                }
                if r.owner == Some(old) {
                    r.owner = Some(new);
                }
                changed
            }
            Self::Mandatory(r) if r.option == old => {
                r.option = new;
                true
            }
            _ => false,
        }
    }

    /// Emit the rule's clauses.
    pub fn define(&self, definer: &mut RuleDefiner) {
        match self {
            Self::Mandatory(r) => definer.require(r.option),
            Self::IdDefinition(r) => definer.at_most_one_of(&r.options),
            Self::Provides(r) => {
                definer.implies(r.provider, r.provided);
                definer.implies(r.provided, r.provider);
            }
            Self::Depends(r) => {
                if r.dependency.is_optional() {
                    for &other in &r.mismatching {
                        definer.excludes(r.source, other);
                    }
                } else {
                    definer.implies_any(r.source, &r.matching);
                }
            }
            Self::Breaks(r) => {
                for &other in &r.conflicts {
                    definer.excludes(r.source, other);
                }
            }
            Self::Plugin(r) => {
                for clause in &r.clauses {
                    definer.clause(clause.iter().copied());
                }
            }
            Self::TentativeFailed(r) => definer.forbid(r.option),
        }
    }

    /// Human-readable explanation, ending with the declared reason if any.
    pub fn describe(&self, universe: &OptionUniverse) -> String {
        let name = |id: OptionId| universe.describe(id);
        let list = |ids: &[OptionId]| {
            if ids.is_empty() {
                "nothing".to_string()
            } else {
                ids.iter().map(|&id| name(id)).collect::<Vec<_>>().join(", ")
            }
        };
        let mut text = match self {
            Self::Mandatory(r) => format!("{} must be loaded", name(r.option)),
            Self::IdDefinition(r) => format!(
                "only one of {} may be loaded as '{}'",
                list(&r.options),
                r.mod_id
            ),
            Self::Provides(r) => format!("{} provides {}", name(r.provider), name(r.provided)),
            Self::Depends(r) if r.dependency.is_optional() => format!(
                "{} requires any loaded {} to match ({} excluded)",
                name(r.source),
                r.dependency,
                list(&r.mismatching)
            ),
            Self::Depends(r) => format!(
                "{} depends on {} (candidates: {})",
                name(r.source),
                r.dependency,
                list(&r.matching)
            ),
            Self::Breaks(r) => format!(
                "{} breaks {} (present: {})",
                name(r.source),
                r.dependency,
                list(&r.conflicts)
            ),
            Self::Plugin(r) => format!("[{}] {}", r.plugin, r.description),
            Self::TentativeFailed(r) => {
                return format!("{} could not be resolved: {}", name(r.option), r.reason);
            }
        };
        if let Some(reason) = self.reason() {
            text.push_str(": ");
            text.push_str(reason);
        }
        text
    }
}
