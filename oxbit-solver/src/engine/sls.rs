//! Score-based stochastic local search
//!
//! Each root is scored in `[0, 1]` under the current assignment: satisfied
//! roots score 1, unsatisfied equalities and comparisons score by how close
//! their operands are (Hamming distance and scaled difference, after
//! Fröhlich, Biere, Wintersteiger and Hamadi, AAAI 2015). A step picks an
//! unsatisfied root, tries every neighbor of every constant below it and
//! commits the best improving one. Neighbors are single-bit flips,
//! increment, decrement and complement, optionally flips of the low bit
//! ranges and of aligned segments. Without an improving move a random
//! candidate is randomized and the weights of the unsatisfied roots grow.
//! The engine never answers `unsat`.

use super::Engine;
use super::prop::{Cone, eval_term, is_word_level, random_value};
use crate::model::{Model, ModelValue};
use crate::options::Options;
use crate::result::SatResult;
use crate::terminate::TerminationMonitor;
use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::fold::default_value;
use oxbit_core::sort::SortKind;
use oxbit_core::value::{BitVec, Value};
use oxbit_core::{OxbitError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Moves without progress before the first restart
const FIRST_RESTART: u64 = 100;

/// Counters of the local search
#[derive(Debug, Clone, Default)]
pub struct SlsStats {
    /// Committed moves, counted against `sls-nflips`
    pub flips: u64,
    /// Best-move steps that improved the score
    pub improving_moves: u64,
    /// Random walk steps
    pub random_walks: u64,
    /// Candidates randomized after a failed step
    pub randomizations: u64,
    /// Neighbors scored
    pub neighbors: u64,
    /// Restarts
    pub restarts: u64,
}

/// Old values overwritten by a tentative move
struct Undo {
    constant: TermId,
    previous: Option<Value>,
    values: Vec<(TermId, Option<Value>)>,
}

/// Stochastic local search over Boolean and bit-vector roots
#[derive(Debug)]
pub struct SlsEngine {
    roots: Vec<TermId>,
    weights: Vec<f64>,
    candidates: FxHashMap<TermId, Vec<TermId>>,
    rng: StdRng,
    nflips: u64,
    move_range: bool,
    move_segment: bool,
    rand_walk: bool,
    prob_rand_walk: u32,
    use_restarts: bool,
    assignment: FxHashMap<TermId, Value>,
    last: Option<SatResult>,
    stats: SlsStats,
}

impl SlsEngine {
    /// Engine configured from the solver options
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            roots: Vec::new(),
            weights: Vec::new(),
            candidates: FxHashMap::default(),
            rng: StdRng::seed_from_u64(options.seed),
            nflips: options.sls_nflips,
            move_range: options.sls_move_range,
            move_segment: options.sls_move_segment,
            rand_walk: options.sls_move_rand_walk,
            prob_rand_walk: options.sls_prob_move_rand_walk,
            use_restarts: options.sls_use_restarts,
            assignment: FxHashMap::default(),
            last: None,
            stats: SlsStats::default(),
        }
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> &SlsStats {
        &self.stats
    }

    fn out_of_budget(&self) -> bool {
        self.nflips > 0 && self.stats.flips >= self.nflips
    }

    fn evaluate(&self, tm: &TermManager, order: &[TermId]) -> Result<FxHashMap<TermId, Value>> {
        let mut values = FxHashMap::default();
        for &id in order {
            let v = eval_term(tm, &self.assignment, &values, id)?;
            values.insert(id, v);
        }
        Ok(values)
    }

    /// Weighted score of all roots
    fn total(&self, tm: &TermManager, values: &FxHashMap<TermId, Value>) -> f64 {
        self.roots
            .iter()
            .zip(&self.weights)
            .map(|(&r, w)| w * score(tm, values, r, true))
            .sum()
    }

    /// Set `constant` to `value` and re-evaluate its cone
    fn apply(
        &mut self,
        tm: &TermManager,
        cone: &Cone,
        values: &mut FxHashMap<TermId, Value>,
        constant: TermId,
        value: Value,
    ) -> Result<Undo> {
        let previous = self.assignment.insert(constant, value);
        let mut undo = Undo {
            constant,
            previous,
            values: Vec::new(),
        };
        let v = eval_term(tm, &self.assignment, values, constant)?;
        undo.values.push((constant, values.insert(constant, v)));
        for id in cone.above(constant) {
            let v = eval_term(tm, &self.assignment, values, id)?;
            undo.values.push((id, values.insert(id, v)));
        }
        Ok(undo)
    }

    fn revert(&mut self, values: &mut FxHashMap<TermId, Value>, undo: Undo) {
        match undo.previous {
            Some(v) => self.assignment.insert(undo.constant, v),
            None => self.assignment.remove(&undo.constant),
        };
        for (id, old) in undo.values.into_iter().rev() {
            match old {
                Some(v) => values.insert(id, v),
                None => values.remove(&id),
            };
        }
    }

    fn current(&self, tm: &TermManager, c: TermId) -> Option<Value> {
        self.assignment
            .get(&c)
            .cloned()
            .or_else(|| default_value(tm.sort_kind(c)))
    }

    /// Constants below `root` that a move may change
    fn candidates_of(&mut self, tm: &TermManager, root: TermId) -> Vec<TermId> {
        self.candidates
            .entry(root)
            .or_insert_with(|| {
                tm.collect_consts(&[root])
                    .into_iter()
                    .filter(|&c| matches!(tm.sort_kind(c), SortKind::Bool | SortKind::BitVec(_)))
                    .collect()
            })
            .clone()
    }

    /// Best improving neighbor over all candidates
    fn best_move(
        &mut self,
        tm: &TermManager,
        cone: &Cone,
        values: &mut FxHashMap<TermId, Value>,
        candidates: &[TermId],
    ) -> Result<Option<(TermId, Value)>> {
        let mut best_score = self.total(tm, values);
        let mut best = None;
        for &c in candidates {
            let Some(cur) = self.current(tm, c) else {
                continue;
            };
            for n in neighbors(&cur, self.move_range, self.move_segment) {
                self.stats.neighbors += 1;
                let undo = self.apply(tm, cone, values, c, n.clone())?;
                let s = self.total(tm, values);
                self.revert(values, undo);
                if s > best_score {
                    best_score = s;
                    best = Some((c, n));
                }
            }
        }
        Ok(best)
    }

    fn restart(&mut self, tm: &TermManager) {
        self.stats.restarts += 1;
        let consts = tm.collect_consts(&self.roots);
        self.assignment.clear();
        for c in consts {
            if let Some(v) = random_value(&mut self.rng, tm.sort_kind(c)) {
                self.assignment.insert(c, v);
            }
        }
        self.weights.iter_mut().for_each(|w| *w = 1.0);
    }
}

impl Engine for SlsEngine {
    fn name(&self) -> &'static str {
        "sls"
    }

    fn reset_roots(&mut self) {
        self.roots.clear();
        self.weights.clear();
        self.candidates.clear();
        self.last = None;
    }

    fn try_assert(&mut self, tm: &mut TermManager, root: TermId) -> Result<bool> {
        if !is_word_level(tm, root) {
            return Ok(false);
        }
        self.roots.push(root);
        self.weights.push(1.0);
        Ok(true)
    }

    fn check_sat(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        self.stats = SlsStats::default();
        let order = tm.post_order(&self.roots);
        let cone = Cone::new(tm, &order);
        let mut values = self.evaluate(tm, &order)?;
        let mut restart_limit = FIRST_RESTART;
        let mut since_restart = 0u64;
        let result = loop {
            let unsat: Vec<usize> = (0..self.roots.len())
                .filter(|&i| values.get(&self.roots[i]).and_then(Value::as_bool) != Some(true))
                .collect();
            if unsat.is_empty() {
                break SatResult::Sat;
            }
            if self.out_of_budget() || monitor.should_terminate() {
                break SatResult::Unknown;
            }
            if self.use_restarts && since_restart >= restart_limit {
                trace!(restarts = self.stats.restarts, "restart");
                self.restart(tm);
                values = self.evaluate(tm, &order)?;
                restart_limit *= 2;
                since_restart = 0;
                continue;
            }
            let root = self.roots[unsat[self.rng.random_range(0..unsat.len())]];
            let candidates = self.candidates_of(tm, root);
            if candidates.is_empty() {
                break SatResult::Unknown;
            }
            self.stats.flips += 1;

            if self.rand_walk && self.rng.random_range(0..1000) < self.prob_rand_walk {
                let c = candidates[self.rng.random_range(0..candidates.len())];
                if let Some(cur) = self.current(tm, c) {
                    let all = neighbors(&cur, self.move_range, self.move_segment);
                    let n = all[self.rng.random_range(0..all.len())].clone();
                    self.apply(tm, &cone, &mut values, c, n)?;
                    self.stats.random_walks += 1;
                }
                since_restart += 1;
                continue;
            }

            match self.best_move(tm, &cone, &mut values, &candidates)? {
                Some((c, v)) => {
                    self.apply(tm, &cone, &mut values, c, v)?;
                    self.stats.improving_moves += 1;
                }
                None => {
                    let c = candidates[self.rng.random_range(0..candidates.len())];
                    if let Some(v) = random_value(&mut self.rng, tm.sort_kind(c)) {
                        self.apply(tm, &cone, &mut values, c, v)?;
                    }
                    self.stats.randomizations += 1;
                    for &i in &unsat {
                        self.weights[i] += 1.0;
                    }
                    since_restart += 1;
                }
            }
        };
        debug!(
            result = %result,
            flips = self.stats.flips,
            neighbors = self.stats.neighbors,
            restarts = self.stats.restarts,
            "stochastic local search finished"
        );
        self.last = Some(result);
        Ok(result)
    }

    fn assignment(&mut self, tm: &mut TermManager) -> Result<Model> {
        if self.last != Some(SatResult::Sat) {
            return Err(OxbitError::state("the last check was not satisfiable"));
        }
        let mut model = Model::new();
        for c in tm.collect_consts(&self.roots) {
            let v = self
                .current(tm, c)
                .ok_or_else(|| OxbitError::state("sort without default value"))?;
            model.insert(c, ModelValue::Scalar(v));
        }
        Ok(model)
    }

    fn failed_roots(&self) -> Vec<usize> {
        Vec::new()
    }
}

/// Neighbors of a constant's value
pub(super) fn neighbors(cur: &Value, range: bool, segment: bool) -> Vec<Value> {
    let bv = match cur {
        Value::Bool(b) => return vec![Value::Bool(!b)],
        Value::BitVec(bv) => bv,
        _ => return Vec::new(),
    };
    let w = bv.width();
    let mask = |len: u32, offset: u32| BitVec::ones(len).zero_extend(w - len).shl_const(offset);
    let mut out: Vec<BitVec> = (0..w).map(|i| bv.xor(&mask(1, i))).collect();
    out.push(bv.inc());
    out.push(bv.dec());
    out.push(bv.not());
    if range {
        out.extend((2..=w).map(|k| bv.xor(&mask(k, 0))));
    }
    if segment {
        let mut size = 2;
        while size <= w {
            let mut offset = 0;
            while offset < w {
                out.push(bv.xor(&mask(size.min(w - offset), offset)));
                offset += size;
            }
            size *= 2;
        }
    }
    out.into_iter().map(Value::BitVec).collect()
}

/// Fraction `v / 2^width` from the top 53 bits
fn fraction(v: &BitVec) -> f64 {
    let w = v.width();
    let low = w.saturating_sub(53);
    (low..w)
        .filter(|&i| v.bit(i))
        .map(|i| 2f64.powi(i as i32 - w as i32))
        .sum()
}

/// How close `t` is to taking the Boolean value `want`
fn score(tm: &TermManager, values: &FxHashMap<TermId, Value>, t: TermId, want: bool) -> f64 {
    if values.get(&t).and_then(Value::as_bool) == Some(want) {
        return 1.0;
    }
    let term = &tm[t];
    let bv = |i: usize| term.args.get(i).and_then(|a| values.get(a)).and_then(Value::as_bv);
    let flip = |b: &BitVec| b.xor(&BitVec::min_signed(b.width()));
    use TermKind as K;
    match (term.kind, want) {
        (K::Not, _) => score(tm, values, term.args[0], !want),
        (K::And, true) | (K::Or, false) => {
            let n = term.args.len().max(1) as f64;
            term.args.iter().map(|&a| score(tm, values, a, want)).sum::<f64>() / n
        }
        (K::And, false) | (K::Or, true) => term
            .args
            .iter()
            .map(|&a| score(tm, values, a, want))
            .fold(0.0, f64::max),
        (K::Equal, true) if term.args.len() == 2 => match (bv(0), bv(1)) {
            (Some(a), Some(b)) => {
                let differ = (0..a.width()).filter(|&i| a.bit(i) != b.bit(i)).count();
                0.5 * (1.0 - differ as f64 / f64::from(a.width()))
            }
            _ => 0.0,
        },
        (K::BvUlt | K::BvUle | K::BvUgt | K::BvUge | K::BvSlt | K::BvSle | K::BvSgt | K::BvSge, _) => {
            let (Some(a), Some(b)) = (bv(0), bv(1)) else {
                return 0.0;
            };
            let signed = matches!(term.kind, K::BvSlt | K::BvSle | K::BvSgt | K::BvSge);
            let (a, b) = if signed { (flip(a), flip(b)) } else { (a.clone(), b.clone()) };
            // normalize to `lo < hi` or `lo <= hi` being wanted
            let (lo, hi) = match term.kind {
                K::BvUlt | K::BvUle | K::BvSlt | K::BvSle => (a, b),
                _ => (b, a),
            };
            let (lo, hi) = if want { (lo, hi) } else { (hi, lo) };
            // wanted `lo <= hi` holds too little: the gap is `lo - hi`
            0.5 * (1.0 - fraction(&lo.sub(&hi)))
        }
        _ => 0.0,
    }
}
