//! A small incremental CDCL SAT engine.
//!
//! The engine keeps two watched literals per clause, learns first-UIP
//! clauses on conflict and solves under assumptions. When the assumptions
//! cannot all hold it reports the subset responsible ([`SatOutcome::Unsat`]).
//!
//! Clauses may only be added between solves; every solve returns to
//! decision level 0 before handing control back.
//!
//! Decisions are deterministic: the lowest unassigned variable is picked and
//! assigned its saved phase, which starts as the preferred polarity given to
//! [`SatSolver::new_var`].

use std::fmt;
use std::ops::Not;

/// A propositional variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(u32);

impl Lit {
    pub fn new(var: Var, positive: bool) -> Self {
        Self(var.0 * 2 + u32::from(!positive))
    }

    pub fn positive(var: Var) -> Self {
        Self::new(var, true)
    }

    pub fn negative(var: Var) -> Self {
        Self::new(var, false)
    }

    pub fn var(self) -> Var {
        Var(self.0 / 2)
    }

    pub fn is_positive(self) -> bool {
        self.0 % 2 == 0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_positive() { "" } else { "-" };
        write!(f, "{sign}{}", self.var().0 + 1)
    }
}

/// Result of [`SatSolver::solve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    /// A model exists; read it with [`SatSolver::model_value`].
    Sat,
    /// No model extends the assumptions. `failed` lists assumptions that
    /// are jointly contradictory; it is empty when the clauses alone are.
    Unsat { failed: Vec<Lit> },
}

type ClauseRef = usize;

#[derive(Debug)]
struct Clause {
    lits: Vec<Lit>,
    learnt: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SatStats {
    pub solves: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
    pub learnt: u64,
}

#[derive(Debug, Default)]
pub struct SatSolver {
    clauses: Vec<Clause>,
    /// `watchers[l]` lists clauses watching literal `l`; visited when `l` becomes false.
    watchers: Vec<Vec<ClauseRef>>,
    assigns: Vec<Option<bool>>,
    level: Vec<u32>,
    reason: Vec<Option<ClauseRef>>,
    phase: Vec<bool>,
    seen: Vec<bool>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    model: Vec<bool>,
    /// False once the clause database is contradictory without assumptions.
    ok: bool,
    stats: SatStats,
}

fn lit_value(assigns: &[Option<bool>], lit: Lit) -> Option<bool> {
    assigns[lit.var().index()].map(|v| v == lit.is_positive())
}

impl SatSolver {
    pub fn new() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    /// Create a variable whose first decision will be `preferred`.
    pub fn new_var(&mut self, preferred: bool) -> Var {
        let var = Var(self.assigns.len() as u32);
        self.assigns.push(None);
        self.level.push(0);
        self.reason.push(None);
        self.phase.push(preferred);
        self.seen.push(false);
        self.model.push(false);
        self.watchers.push(Vec::new());
        self.watchers.push(Vec::new());
        var
    }

    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    pub fn stats(&self) -> SatStats {
        self.stats
    }

    /// Whether the clauses are still satisfiable without assumptions, as far
    /// as level-0 propagation can tell.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Add a clause. Returns `false` if the database became contradictory.
    ///
    /// The clause is simplified against level-0 facts: satisfied clauses are
    /// dropped and false literals removed.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        if !self.ok {
            return false;
        }
        let mut clause: Vec<Lit> = Vec::with_capacity(lits.len());
        for &lit in lits {
            match lit_value(&self.assigns, lit) {
                Some(true) => return true,
                Some(false) => continue,
                None => {}
            }
            if clause.contains(&!lit) {
                return true;
            }
            if !clause.contains(&lit) {
                clause.push(lit);
            }
        }

        match clause.len() {
            0 => {
                self.ok = false;
            }
            1 => {
                self.enqueue(clause[0], None);
                if self.propagate().is_some() {
                    self.ok = false;
                }
            }
            _ => {
                self.attach(clause, false);
            }
        }
        self.ok
    }

    fn attach(&mut self, lits: Vec<Lit>, learnt: bool) -> ClauseRef {
        let cref = self.clauses.len();
        self.watchers[lits[0].index()].push(cref);
        self.watchers[lits[1].index()].push(cref);
        self.clauses.push(Clause { lits, learnt });
        cref
    }

    /// Value of `lit` in the last model.
    pub fn model_value(&self, lit: Lit) -> bool {
        self.model[lit.var().index()] == lit.is_positive()
    }

    /// Value of `lit` fixed at decision level 0, if any.
    pub fn fixed_value(&self, lit: Lit) -> Option<bool> {
        match self.assigns[lit.var().index()] {
            Some(_) if self.level[lit.var().index()] == 0 => lit_value(&self.assigns, lit),
            _ => None,
        }
    }

    fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    fn enqueue(&mut self, lit: Lit, reason: Option<ClauseRef>) {
        let v = lit.var().index();
        self.assigns[v] = Some(lit.is_positive());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    fn cancel_until(&mut self, level: u32) {
        if self.decision_level() <= level {
            return;
        }
        let keep = self.trail_lim[level as usize];
        for lit in self.trail.drain(keep..) {
            let v = lit.var().index();
            self.phase[v] = lit.is_positive();
            self.assigns[v] = None;
            self.reason[v] = None;
        }
        self.trail_lim.truncate(level as usize);
        self.qhead = self.trail.len();
    }

    /// Unit propagation; returns the conflicting clause, if any.
    fn propagate(&mut self) -> Option<ClauseRef> {
        let mut conflict = None;
        while self.qhead < self.trail.len() && conflict.is_none() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            self.stats.propagations += 1;
            let false_lit = !p;

            let mut watchers = std::mem::take(&mut self.watchers[false_lit.index()]);
            let mut kept = 0;
            let mut i = 0;
            while i < watchers.len() {
                let cref = watchers[i];
                i += 1;

                let lits = &mut self.clauses[cref].lits;
                if lits[0] == false_lit {
                    lits.swap(0, 1);
                }
                let first = lits[0];
                if lit_value(&self.assigns, first) == Some(true) {
                    watchers[kept] = cref;
                    kept += 1;
                    continue;
                }

                let replacement =
                    (2..lits.len()).find(|&k| lit_value(&self.assigns, lits[k]) != Some(false));
                if let Some(k) = replacement {
                    lits.swap(1, k);
                    let watch = lits[1];
                    self.watchers[watch.index()].push(cref);
                    continue;
                }

                watchers[kept] = cref;
                kept += 1;
                if lit_value(&self.assigns, first) == Some(false) {
                    conflict = Some(cref);
                    while i < watchers.len() {
                        watchers[kept] = watchers[i];
                        kept += 1;
                        i += 1;
                    }
                } else {
                    self.enqueue(first, Some(cref));
                }
            }
            watchers.truncate(kept);
            self.watchers[false_lit.index()] = watchers;
        }
        if conflict.is_some() {
            self.qhead = self.trail.len();
        }
        conflict
    }

    /// First-UIP conflict analysis. Returns the learnt clause (asserting
    /// literal first) and the level to backjump to.
    fn analyze(&mut self, conflict: ClauseRef) -> (Vec<Lit>, u32) {
        let current = self.decision_level();
        let mut learnt = vec![Lit(0)];
        let mut pending = 0usize;
        let mut index = self.trail.len();
        let mut clause = Some(conflict);
        let mut asserting = None;

        while let Some(cref) = clause {
            let skip = usize::from(asserting.is_some());
            for k in skip..self.clauses[cref].lits.len() {
                let q = self.clauses[cref].lits[k];
                let v = q.var().index();
                if self.seen[v] || self.level[v] == 0 {
                    continue;
                }
                self.seen[v] = true;
                if self.level[v] >= current {
                    pending += 1;
                } else {
                    learnt.push(q);
                }
            }

            // next marked literal on the trail
            loop {
                index -= 1;
                if self.seen[self.trail[index].var().index()] {
                    break;
                }
            }
            let p = self.trail[index];
            self.seen[p.var().index()] = false;
            pending -= 1;
            asserting = Some(p);
            clause = if pending == 0 {
                None
            } else {
                self.reason[p.var().index()]
            };
        }

        if let Some(p) = asserting {
            learnt[0] = !p;
        }
        for lit in &learnt[1..] {
            self.seen[lit.var().index()] = false;
        }

        let backjump = if learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            for k in 2..learnt.len() {
                if self.level[learnt[k].var().index()] > self.level[learnt[max_i].var().index()] {
                    max_i = k;
                }
            }
            learnt.swap(1, max_i);
            self.level[learnt[1].var().index()]
        };
        (learnt, backjump)
    }

    /// Collect the assumptions that force `failed` (an assumption) false.
    fn analyze_final(&mut self, failed: Lit) -> Vec<Lit> {
        let mut out = vec![failed];
        if self.decision_level() == 0 {
            return out;
        }
        let var = failed.var().index();
        if self.level[var] == 0 {
            return out;
        }
        self.seen[var] = true;
        for i in (self.trail_lim[0]..self.trail.len()).rev() {
            let lit = self.trail[i];
            let v = lit.var().index();
            if !self.seen[v] {
                continue;
            }
            match self.reason[v] {
                None => {
                    if lit != failed {
                        out.push(lit);
                    }
                }
                Some(cref) => {
                    for k in 1..self.clauses[cref].lits.len() {
                        let q = self.clauses[cref].lits[k].var().index();
                        if self.level[q] > 0 {
                            self.seen[q] = true;
                        }
                    }
                }
            }
            self.seen[v] = false;
        }
        self.seen[var] = false;
        out
    }

    fn pick_branch(&self) -> Option<Var> {
        self.assigns
            .iter()
            .position(Option::is_none)
            .map(|i| Var(i as u32))
    }

    /// Solve under `assumptions`.
    pub fn solve(&mut self, assumptions: &[Lit]) -> SatOutcome {
        self.stats.solves += 1;
        if !self.ok {
            return SatOutcome::Unsat { failed: Vec::new() };
        }

        let outcome = loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                if self.decision_level() == 0 {
                    self.ok = false;
                    break SatOutcome::Unsat { failed: Vec::new() };
                }
                let (learnt, backjump) = self.analyze(conflict);
                self.cancel_until(backjump);
                self.stats.learnt += 1;
                if learnt.len() == 1 {
                    self.enqueue(learnt[0], None);
                } else {
                    let asserting = learnt[0];
                    let cref = self.attach(learnt, true);
                    self.enqueue(asserting, Some(cref));
                }
                continue;
            }

            let level = self.decision_level() as usize;
            if let Some(&assumption) = assumptions.get(level) {
                match lit_value(&self.assigns, assumption) {
                    Some(true) => self.new_decision_level(),
                    Some(false) => {
                        let failed = self.analyze_final(assumption);
                        break SatOutcome::Unsat { failed };
                    }
                    None => {
                        self.new_decision_level();
                        self.enqueue(assumption, None);
                    }
                }
                continue;
            }

            match self.pick_branch() {
                None => {
                    for (slot, value) in self.model.iter_mut().zip(&self.assigns) {
                        *slot = value.unwrap_or(false);
                    }
                    break SatOutcome::Sat;
                }
                Some(var) => {
                    self.stats.decisions += 1;
                    self.new_decision_level();
                    let lit = Lit::new(var, self.phase[var.index()]);
                    self.enqueue(lit, None);
                }
            }
        };

        self.cancel_until(0);
        tracing::trace!(
            vars = self.num_vars(),
            clauses = self.clauses.len(),
            learnt = self.clauses.iter().filter(|c| c.learnt).count(),
            conflicts = self.stats.conflicts,
            ?outcome,
            "sat solve finished"
        );
        outcome
    }
}
