//! Conflict-driven clause learning
//!
//! A MiniSat-style CDCL core:
//! - two watched literals with blocker literals
//! - first-UIP learning with local clause minimization
//! - VSIDS branching with phase saving
//! - Luby restarts and activity-based learnt clause deletion
//! - incremental solving under assumptions with failed-assumption analysis
//!
//! ## References
//!
//! - Eén, Sörensson: "An Extensible SAT-solver" (SAT 2003)
//! - Marques-Silva, Sakallah: "GRASP: A Search Algorithm for Propositional
//!   Satisfiability" (1999)
//! - Luby, Sinclair, Zuckerman: "Optimal Speedup of Las Vegas Algorithms" (1993)

use crate::literal::{LBool, Lit, Var};
use std::fmt;
use tracing::{debug, trace};

type ClauseRef = usize;

/// Polled during search; returning `true` stops the current solve call
pub type Terminator = Box<dyn FnMut() -> bool + Send>;

/// Outcome of a solve call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverResult {
    /// A model was found
    Sat,
    /// No model exists (under the given assumptions)
    Unsat,
    /// Search stopped early (termination or conflict budget)
    Unknown,
}

/// Search parameters
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Variable activity decay factor
    pub var_decay: f64,
    /// Clause activity decay factor
    pub clause_decay: f64,
    /// Conflicts before the first restart
    pub restart_first: u64,
    /// Base of the Luby restart sequence
    pub restart_inc: f64,
    /// Initial learnt clause limit relative to the problem clauses
    pub learntsize_factor: f64,
    /// Growth of the learnt clause limit per restart
    pub learntsize_inc: f64,
    /// Conflicts between two termination polls
    pub poll_interval: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            var_decay: 0.95,
            clause_decay: 0.999,
            restart_first: 100,
            restart_inc: 2.0,
            learntsize_factor: 1.0 / 3.0,
            learntsize_inc: 1.1,
            poll_interval: 1024,
        }
    }
}

/// Search statistics
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Solve calls
    pub solves: u64,
    /// Branching decisions
    pub decisions: u64,
    /// Propagated literals
    pub propagations: u64,
    /// Conflicts
    pub conflicts: u64,
    /// Restarts
    pub restarts: u64,
    /// Learnt clauses added
    pub learnt_clauses: u64,
    /// Learnt clauses deleted
    pub deleted_clauses: u64,
}

#[derive(Debug, Clone)]
struct Clause {
    lits: Vec<Lit>,
    learnt: bool,
    activity: f64,
    deleted: bool,
}

#[derive(Debug, Clone, Copy)]
struct Watcher {
    cref: ClauseRef,
    blocker: Lit,
}

enum WatchStep {
    Keep(Lit),
    Move(Lit, Lit),
    Unit(Lit),
}

/// Binary max-heap of variables ordered by activity
#[derive(Debug, Default)]
struct VarOrder {
    heap: Vec<Var>,
    pos: Vec<Option<usize>>,
}

impl VarOrder {
    fn grow(&mut self) {
        self.pos.push(None);
    }

    fn insert(&mut self, v: Var, act: &[f64]) {
        if self.pos[v.index()].is_some() {
            return;
        }
        self.heap.push(v);
        self.up(self.heap.len() - 1, act);
    }

    fn pop(&mut self, act: &[f64]) -> Option<Var> {
        let last = self.heap.pop()?;
        if self.heap.is_empty() {
            self.pos[last.index()] = None;
            return Some(last);
        }
        let top = self.heap[0];
        self.pos[top.index()] = None;
        self.heap[0] = last;
        self.down(0, act);
        Some(top)
    }

    fn bumped(&mut self, v: Var, act: &[f64]) {
        if let Some(i) = self.pos[v.index()] {
            self.up(i, act);
        }
    }

    fn up(&mut self, mut i: usize, act: &[f64]) {
        let v = self.heap[i];
        while i > 0 {
            let parent = (i - 1) / 2;
            if act[self.heap[parent].index()] >= act[v.index()] {
                break;
            }
            self.heap[i] = self.heap[parent];
            self.pos[self.heap[i].index()] = Some(i);
            i = parent;
        }
        self.heap[i] = v;
        self.pos[v.index()] = Some(i);
    }

    fn down(&mut self, mut i: usize, act: &[f64]) {
        let v = self.heap[i];
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let child = if right < n && act[self.heap[right].index()] > act[self.heap[left].index()] {
                right
            } else {
                left
            };
            if act[self.heap[child].index()] <= act[v.index()] {
                break;
            }
            self.heap[i] = self.heap[child];
            self.pos[self.heap[i].index()] = Some(i);
            i = child;
        }
        self.heap[i] = v;
        self.pos[v.index()] = Some(i);
    }
}

/// `y^seq` where `seq` is the `x`-th element of the Luby sequence
fn luby(y: f64, mut x: u32) -> f64 {
    let mut size: u32 = 1;
    let mut seq: i32 = 0;
    while size < x + 1 {
        seq += 1;
        size = 2 * size + 1;
    }
    while size - 1 != x {
        size = (size - 1) >> 1;
        seq -= 1;
        x %= size;
    }
    y.powi(seq)
}

/// Incremental CDCL SAT solver
pub struct Solver {
    config: SolverConfig,
    clauses: Vec<Clause>,
    learnts: Vec<ClauseRef>,
    watches: Vec<Vec<Watcher>>,
    assigns: Vec<LBool>,
    level: Vec<u32>,
    reason: Vec<Option<ClauseRef>>,
    phase: Vec<bool>,
    activity: Vec<f64>,
    seen: Vec<bool>,
    order: VarOrder,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    var_inc: f64,
    cla_inc: f64,
    max_learnts: f64,
    ok: bool,
    assumptions: Vec<Lit>,
    failed: Vec<Lit>,
    model: Vec<LBool>,
    terminate: Option<Terminator>,
    interrupted: bool,
    conflict_budget: Option<u64>,
    budget_start: u64,
    threads: usize,
    stats: SolverStats,
}

impl fmt::Debug for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("vars", &self.num_vars())
            .field("clauses", &self.num_clauses())
            .field("learnts", &self.learnts.len())
            .field("ok", &self.ok)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Create a solver with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Create a solver with a custom configuration
    #[must_use]
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config,
            clauses: Vec::new(),
            learnts: Vec::new(),
            watches: Vec::new(),
            assigns: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            phase: Vec::new(),
            activity: Vec::new(),
            seen: Vec::new(),
            order: VarOrder::default(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            var_inc: 1.0,
            cla_inc: 1.0,
            max_learnts: 0.0,
            ok: true,
            assumptions: Vec::new(),
            failed: Vec::new(),
            model: Vec::new(),
            terminate: None,
            interrupted: false,
            conflict_budget: None,
            budget_start: 0,
            threads: 1,
            stats: SolverStats::default(),
        }
    }

    /// Allocate a fresh variable
    pub fn new_var(&mut self) -> Var {
        let v = Var::new(self.assigns.len() as u32);
        self.assigns.push(LBool::Undef);
        self.level.push(0);
        self.reason.push(None);
        self.phase.push(false);
        self.activity.push(0.0);
        self.seen.push(false);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        self.order.grow();
        self.order.insert(v, &self.activity);
        v
    }

    /// Number of variables
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    /// Number of live problem clauses
    #[must_use]
    pub fn num_clauses(&self) -> usize {
        self.clauses.iter().filter(|c| !c.learnt && !c.deleted).count()
    }

    /// Number of live learnt clauses
    #[must_use]
    pub fn num_learnts(&self) -> usize {
        self.learnts.len()
    }

    /// Statistics
    #[must_use]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Current trail (level 0 facts between solve calls)
    #[must_use]
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// `false` once the clause set is unsatisfiable without assumptions
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Install or remove the termination callback
    pub fn set_terminate(&mut self, terminate: Option<Terminator>) {
        self.terminate = terminate;
    }

    /// Limit the conflicts of each solve call; `None` removes the limit
    pub fn set_conflict_budget(&mut self, budget: Option<u64>) {
        self.conflict_budget = budget;
    }

    /// Record the requested worker count. The bundled search is sequential,
    /// the value is kept for callers that inspect it.
    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads.max(1);
    }

    /// Requested worker count
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    fn lit_value(&self, l: Lit) -> LBool {
        self.assigns[l.var().index()].under(l)
    }

    /// Add a clause; returns `false` if the clause set became unsatisfiable
    pub fn add_clause<I: IntoIterator<Item = Lit>>(&mut self, lits: I) -> bool {
        if !self.ok {
            return false;
        }
        let mut lits: Vec<Lit> = lits.into_iter().collect();
        let max_var = lits.iter().map(|l| l.var().index() + 1).max().unwrap_or(0);
        while self.num_vars() < max_var {
            self.new_var();
        }
        lits.sort_unstable();
        lits.dedup();
        let mut out = Vec::with_capacity(lits.len());
        for (i, &l) in lits.iter().enumerate() {
            if i + 1 < lits.len() && lits[i + 1] == !l {
                return true;
            }
            match self.lit_value(l) {
                LBool::True => return true,
                LBool::False => {}
                LBool::Undef => out.push(l),
            }
        }
        match out.len() {
            0 => {
                self.ok = false;
            }
            1 => {
                self.enqueue(out[0], None);
                if self.propagate().is_some() {
                    self.ok = false;
                }
            }
            _ => {
                self.attach(out, false);
            }
        }
        self.ok
    }

    /// Add a clause in DIMACS notation, creating variables as needed
    pub fn add_clause_dimacs(&mut self, lits: &[i32]) -> bool {
        self.add_clause(lits.iter().filter(|&&l| l != 0).map(|&l| Lit::from_dimacs(l)))
    }

    fn attach(&mut self, lits: Vec<Lit>, learnt: bool) -> ClauseRef {
        let cref = self.clauses.len();
        self.watches[(!lits[0]).index()].push(Watcher { cref, blocker: lits[1] });
        self.watches[(!lits[1]).index()].push(Watcher { cref, blocker: lits[0] });
        self.clauses.push(Clause {
            lits,
            learnt,
            activity: 0.0,
            deleted: false,
        });
        if learnt {
            self.learnts.push(cref);
        }
        cref
    }

    fn enqueue(&mut self, l: Lit, reason: Option<ClauseRef>) {
        let v = l.var().index();
        self.assigns[v] = LBool::from(l.is_pos());
        self.level[v] = self.decision_level() as u32;
        self.reason[v] = reason;
        self.trail.push(l);
    }

    fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    fn propagate(&mut self) -> Option<ClauseRef> {
        let mut conflict = None;
        while self.qhead < self.trail.len() && conflict.is_none() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            self.stats.propagations += 1;
            let false_lit = !p;
            let mut ws = std::mem::take(&mut self.watches[p.index()]);
            let mut i = 0;
            let mut j = 0;
            while i < ws.len() {
                let w = ws[i];
                i += 1;
                if self.lit_value(w.blocker) == LBool::True {
                    ws[j] = w;
                    j += 1;
                    continue;
                }
                if self.clauses[w.cref].deleted {
                    continue;
                }
                let step = {
                    let assigns = &self.assigns;
                    let value = |l: Lit| assigns[l.var().index()].under(l);
                    let lits = &mut self.clauses[w.cref].lits;
                    if lits[0] == false_lit {
                        lits.swap(0, 1);
                    }
                    let first = lits[0];
                    if first != w.blocker && value(first) == LBool::True {
                        WatchStep::Keep(first)
                    } else {
                        let mut step = WatchStep::Unit(first);
                        for k in 2..lits.len() {
                            if value(lits[k]) != LBool::False {
                                lits.swap(1, k);
                                step = WatchStep::Move(lits[1], first);
                                break;
                            }
                        }
                        step
                    }
                };
                match step {
                    WatchStep::Keep(first) => {
                        ws[j] = Watcher { cref: w.cref, blocker: first };
                        j += 1;
                    }
                    WatchStep::Move(watch, first) => {
                        self.watches[(!watch).index()].push(Watcher { cref: w.cref, blocker: first });
                    }
                    WatchStep::Unit(first) => {
                        ws[j] = Watcher { cref: w.cref, blocker: first };
                        j += 1;
                        if self.lit_value(first) == LBool::False {
                            conflict = Some(w.cref);
                            self.qhead = self.trail.len();
                            while i < ws.len() {
                                ws[j] = ws[i];
                                j += 1;
                                i += 1;
                            }
                        } else {
                            self.enqueue(first, Some(w.cref));
                        }
                    }
                }
            }
            ws.truncate(j);
            let slot = &mut self.watches[p.index()];
            ws.append(slot);
            *slot = ws;
        }
        conflict
    }

    fn bump_var(&mut self, v: Var) {
        self.activity[v.index()] += self.var_inc;
        if self.activity[v.index()] > 1e100 {
            for a in &mut self.activity {
                *a *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }
        self.order.bumped(v, &self.activity);
    }

    fn bump_clause(&mut self, cref: ClauseRef) {
        let c = &mut self.clauses[cref];
        if !c.learnt {
            return;
        }
        c.activity += self.cla_inc;
        if c.activity > 1e20 {
            for &l in &self.learnts {
                self.clauses[l].activity *= 1e-20;
            }
            self.cla_inc *= 1e-20;
        }
    }

    /// First-UIP conflict analysis; returns the learnt clause (asserting
    /// literal first) and the backjump level
    fn analyze(&mut self, conflict: ClauseRef) -> (Vec<Lit>, usize) {
        let current = self.decision_level() as u32;
        let mut learnt: Vec<Lit> = vec![Lit::pos(Var::new(0))];
        let mut path = 0usize;
        let mut index = self.trail.len();
        let mut confl = Some(conflict);
        let mut p: Option<Lit> = None;

        loop {
            if let Some(cref) = confl {
                self.bump_clause(cref);
                let start = usize::from(p.is_some());
                for k in start..self.clauses[cref].lits.len() {
                    let q = self.clauses[cref].lits[k];
                    let v = q.var().index();
                    if !self.seen[v] && self.level[v] > 0 {
                        self.seen[v] = true;
                        self.bump_var(q.var());
                        if self.level[v] >= current {
                            path += 1;
                        } else {
                            learnt.push(q);
                        }
                    }
                }
            }
            loop {
                index -= 1;
                if self.seen[self.trail[index].var().index()] {
                    break;
                }
            }
            let pl = self.trail[index];
            let v = pl.var().index();
            confl = self.reason[v];
            self.seen[v] = false;
            p = Some(pl);
            path -= 1;
            if path == 0 {
                break;
            }
        }
        if let Some(pl) = p {
            learnt[0] = !pl;
        }

        // drop literals implied by the rest of the clause
        let mut kept = vec![learnt[0]];
        for &l in &learnt[1..] {
            let redundant = match self.reason[l.var().index()] {
                None => false,
                Some(r) => self.clauses[r].lits[1..].iter().all(|q| {
                    let v = q.var().index();
                    self.seen[v] || self.level[v] == 0
                }),
            };
            if !redundant {
                kept.push(l);
            }
        }
        for &l in &learnt {
            self.seen[l.var().index()] = false;
        }

        let bt = if kept.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            for k in 2..kept.len() {
                if self.level[kept[k].var().index()] > self.level[kept[max_i].var().index()] {
                    max_i = k;
                }
            }
            kept.swap(1, max_i);
            self.level[kept[1].var().index()] as usize
        };
        (kept, bt)
    }

    /// Collect the assumptions responsible for `a` being false
    fn analyze_final(&mut self, a: Lit) {
        self.failed.clear();
        self.failed.push(a);
        if self.decision_level() == 0 {
            return;
        }
        self.seen[a.var().index()] = true;
        for i in (self.trail_lim[0]..self.trail.len()).rev() {
            let x = self.trail[i].var().index();
            if !self.seen[x] {
                continue;
            }
            match self.reason[x] {
                None => {
                    if self.level[x] > 0 {
                        self.failed.push(self.trail[i]);
                    }
                }
                Some(r) => {
                    for k in 1..self.clauses[r].lits.len() {
                        let v = self.clauses[r].lits[k].var().index();
                        if self.level[v] > 0 {
                            self.seen[v] = true;
                        }
                    }
                }
            }
            self.seen[x] = false;
        }
        self.seen[a.var().index()] = false;
    }

    fn cancel_until(&mut self, level: usize) {
        if self.decision_level() <= level {
            return;
        }
        let lim = self.trail_lim[level];
        for i in (lim..self.trail.len()).rev() {
            let l = self.trail[i];
            let v = l.var();
            self.assigns[v.index()] = LBool::Undef;
            self.reason[v.index()] = None;
            self.phase[v.index()] = l.is_pos();
            self.order.insert(v, &self.activity);
        }
        self.trail.truncate(lim);
        self.trail_lim.truncate(level);
        self.qhead = self.trail.len();
    }

    fn pick_branch(&mut self) -> Option<Lit> {
        loop {
            let v = self.order.pop(&self.activity)?;
            if self.assigns[v.index()].is_undef() {
                return Some(Lit::new(v, self.phase[v.index()]));
            }
        }
    }

    fn locked(&self, cref: ClauseRef) -> bool {
        let l = self.clauses[cref].lits[0];
        self.reason[l.var().index()] == Some(cref) && self.lit_value(l) == LBool::True
    }

    fn reduce_db(&mut self) {
        let mut candidates: Vec<ClauseRef> = self.learnts.clone();
        candidates.sort_by(|&a, &b| self.clauses[a].activity.total_cmp(&self.clauses[b].activity));
        let limit = candidates.len() / 2;
        for &c in &candidates[..limit] {
            if self.clauses[c].lits.len() > 2 && !self.locked(c) {
                let clause = &mut self.clauses[c];
                clause.deleted = true;
                clause.lits = Vec::new();
                self.stats.deleted_clauses += 1;
            }
        }
        let clauses = &self.clauses;
        self.learnts.retain(|&c| !clauses[c].deleted);
        trace!(learnts = self.learnts.len(), "reduced learnt clauses");
    }

    fn poll_terminate(&mut self) -> bool {
        if let Some(f) = self.terminate.as_mut()
            && f()
        {
            self.interrupted = true;
        }
        self.interrupted
    }

    fn budget_exhausted(&self) -> bool {
        self.conflict_budget
            .is_some_and(|b| self.stats.conflicts - self.budget_start >= b)
    }

    fn search(&mut self, nof_conflicts: u64) -> LBool {
        let mut conflicts = 0u64;
        loop {
            if let Some(confl) = self.propagate() {
                self.stats.conflicts += 1;
                conflicts += 1;
                if self.decision_level() == 0 {
                    self.ok = false;
                    return LBool::False;
                }
                let (learnt, bt) = self.analyze(confl);
                self.cancel_until(bt);
                if learnt.len() == 1 {
                    self.enqueue(learnt[0], None);
                } else {
                    let first = learnt[0];
                    let cref = self.attach(learnt, true);
                    self.bump_clause(cref);
                    self.enqueue(first, Some(cref));
                    self.stats.learnt_clauses += 1;
                }
                self.var_inc /= self.config.var_decay;
                self.cla_inc /= self.config.clause_decay;
                if self.stats.conflicts % self.config.poll_interval == 0 && self.poll_terminate() {
                    self.cancel_until(0);
                    return LBool::Undef;
                }
            } else {
                if conflicts >= nof_conflicts || self.budget_exhausted() {
                    self.cancel_until(0);
                    return LBool::Undef;
                }
                if self.learnts.len() as f64 - self.trail.len() as f64 >= self.max_learnts {
                    self.reduce_db();
                }
                let mut next = None;
                while self.decision_level() < self.assumptions.len() {
                    let p = self.assumptions[self.decision_level()];
                    match self.lit_value(p) {
                        LBool::True => self.new_decision_level(),
                        LBool::False => {
                            self.analyze_final(p);
                            return LBool::False;
                        }
                        LBool::Undef => {
                            next = Some(p);
                            break;
                        }
                    }
                }
                let next = match next {
                    Some(p) => p,
                    None => {
                        self.stats.decisions += 1;
                        match self.pick_branch() {
                            Some(l) => l,
                            None => return LBool::True,
                        }
                    }
                };
                self.new_decision_level();
                self.enqueue(next, None);
            }
        }
    }

    /// Solve without assumptions
    pub fn solve(&mut self) -> SolverResult {
        self.solve_with_assumptions(&[])
    }

    /// Solve under `assumptions`, which hold for this call only
    pub fn solve_with_assumptions(&mut self, assumptions: &[Lit]) -> SolverResult {
        self.stats.solves += 1;
        self.model.clear();
        self.failed.clear();
        self.interrupted = false;
        if !self.ok {
            return SolverResult::Unsat;
        }
        let max_var = assumptions.iter().map(|l| l.var().index() + 1).max().unwrap_or(0);
        while self.num_vars() < max_var {
            self.new_var();
        }
        self.assumptions = assumptions.to_vec();
        self.budget_start = self.stats.conflicts;
        self.max_learnts = (self.num_clauses() as f64 * self.config.learntsize_factor).max(100.0);

        let mut restarts = 0u32;
        let status = loop {
            if self.poll_terminate() {
                break LBool::Undef;
            }
            let limit = luby(self.config.restart_inc, restarts) * self.config.restart_first as f64;
            let status = self.search(limit as u64);
            if status != LBool::Undef || self.interrupted || self.budget_exhausted() {
                break status;
            }
            restarts += 1;
            self.stats.restarts += 1;
            self.max_learnts *= self.config.learntsize_inc;
        };

        let result = match status {
            LBool::True => {
                self.model = self.assigns.clone();
                SolverResult::Sat
            }
            LBool::False => SolverResult::Unsat,
            LBool::Undef => SolverResult::Unknown,
        };
        self.cancel_until(0);
        self.assumptions.clear();
        debug!(
            ?result,
            conflicts = self.stats.conflicts,
            decisions = self.stats.decisions,
            restarts = self.stats.restarts,
            "sat solve finished"
        );
        result
    }

    /// Model of the last satisfiable call, indexed by variable
    #[must_use]
    pub fn model(&self) -> &[LBool] {
        &self.model
    }

    /// Value of `lit` in the last model
    #[must_use]
    pub fn model_value(&self, lit: Lit) -> LBool {
        self.model
            .get(lit.var().index())
            .map_or(LBool::Undef, |v| v.under(lit))
    }

    /// Assumptions of the last unsatisfiable call that together are
    /// inconsistent with the clauses; empty if the clauses alone are
    /// unsatisfiable
    #[must_use]
    pub fn failed_assumptions(&self) -> &[Lit] {
        &self.failed
    }

    /// Was `lit` among the failed assumptions of the last call
    #[must_use]
    pub fn is_failed(&self, lit: Lit) -> bool {
        self.failed.contains(&lit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luby() {
        let seq: Vec<f64> = (0..7).map(|i| luby(2.0, i)).collect();
        assert_eq!(seq, vec![1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_var_order_pops_most_active() {
        let mut order = VarOrder::default();
        let act = vec![0.5, 3.0, 1.0, 2.0];
        for i in 0..4 {
            order.grow();
            order.insert(Var::new(i), &act);
        }
        let popped: Vec<u32> = std::iter::from_fn(|| order.pop(&act)).map(Var::raw).collect();
        assert_eq!(popped, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_pigeonhole_unsat() {
        // 3 pigeons, 2 holes
        let mut s = Solver::new();
        let p: Vec<Vec<Var>> = (0..3).map(|_| (0..2).map(|_| s.new_var()).collect()).collect();
        for row in &p {
            s.add_clause(row.iter().map(|&v| Lit::pos(v)));
        }
        for h in 0..2 {
            for i in 0..3 {
                for j in i + 1..3 {
                    s.add_clause([Lit::neg(p[i][h]), Lit::neg(p[j][h])]);
                }
            }
        }
        assert_eq!(s.solve(), SolverResult::Unsat);
        assert!(!s.is_ok());
    }

    #[test]
    fn test_assumptions_and_failed() {
        let mut s = Solver::new();
        let a = s.new_var();
        let b = s.new_var();
        let c = s.new_var();
        // a -> b, b -> !c
        s.add_clause([Lit::neg(a), Lit::pos(b)]);
        s.add_clause([Lit::neg(b), Lit::neg(c)]);
        assert_eq!(s.solve_with_assumptions(&[Lit::pos(a), Lit::pos(c)]), SolverResult::Unsat);
        assert!(s.is_failed(Lit::pos(a)));
        assert!(s.is_failed(Lit::pos(c)));
        assert!(s.is_ok());
        assert_eq!(s.solve_with_assumptions(&[Lit::pos(a)]), SolverResult::Sat);
        assert!(s.model_value(Lit::pos(b)).is_true());
        assert!(s.model_value(Lit::neg(c)).is_true());
    }

    #[test]
    fn test_contradictory_assumptions() {
        let mut s = Solver::new();
        let a = s.new_var();
        assert_eq!(s.solve_with_assumptions(&[Lit::pos(a), Lit::neg(a)]), SolverResult::Unsat);
        assert!(s.is_failed(Lit::pos(a)));
        assert!(s.is_failed(Lit::neg(a)));
        assert_eq!(s.solve(), SolverResult::Sat);
    }

    #[test]
    fn test_terminate_callback() {
        let mut s = Solver::new();
        let a = s.new_var();
        s.add_clause([Lit::pos(a)]);
        s.set_terminate(Some(Box::new(|| true)));
        assert_eq!(s.solve(), SolverResult::Unknown);
        s.set_terminate(None);
        assert_eq!(s.solve(), SolverResult::Sat);
    }
}
