//! Word-level propagation-based local search
//!
//! Starting from an all-zero assignment, the engine repeatedly picks an
//! unsatisfied root and propagates the target value `true` down a path to
//! a constant. At each operator one operand is selected and given a new
//! target: an inverse value that makes the operator produce the wanted
//! result when one exists (with a configurable probability), a random value
//! otherwise. The constant at the end of the path is updated and only its
//! cone of influence is re-evaluated, in topological order. The engine is
//! incomplete: it answers `sat` or `unknown`, never `unsat`.

use super::Engine;
use crate::model::{Model, ModelValue};
use crate::options::Options;
use crate::result::SatResult;
use crate::terminate::TerminationMonitor;
use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::fold::{default_value, fold};
use oxbit_core::sort::SortKind;
use oxbit_core::value::{BitVec, Value};
use oxbit_core::{OxbitError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Counters of the local search
#[derive(Debug, Clone, Default)]
pub struct PropStats {
    /// Propagation steps
    pub props: u64,
    /// Constant updates
    pub updates: u64,
    /// Inverse values used
    pub inverse_values: u64,
    /// Random values used
    pub random_values: u64,
    /// Terms re-evaluated after updates
    pub reevaluations: u64,
}

/// Evaluation order and fan-out of the current roots
#[derive(Debug, Default)]
pub(super) struct Cone {
    position: FxHashMap<TermId, usize>,
    parents: FxHashMap<TermId, Vec<TermId>>,
}

impl Cone {
    pub(super) fn new(tm: &TermManager, order: &[TermId]) -> Self {
        let mut cone = Cone::default();
        for (i, &id) in order.iter().enumerate() {
            cone.position.insert(id, i);
            for &a in &tm[id].args {
                let parents = cone.parents.entry(a).or_default();
                if !parents.contains(&id) {
                    parents.push(id);
                }
            }
        }
        cone
    }

    /// Terms depending on `changed`, excluding it, in evaluation order
    pub(super) fn above(&self, changed: TermId) -> Vec<TermId> {
        let mut seen: FxHashSet<TermId> = FxHashSet::default();
        let mut stack = vec![changed];
        while let Some(t) = stack.pop() {
            for &p in self.parents.get(&t).map_or(&[][..], Vec::as_slice) {
                if seen.insert(p) {
                    stack.push(p);
                }
            }
        }
        let mut out: Vec<TermId> = seen.into_iter().collect();
        out.sort_unstable_by_key(|t| self.position.get(t).copied().unwrap_or(usize::MAX));
        out
    }
}

/// Propagation-based local search over Boolean and bit-vector roots
#[derive(Debug)]
pub struct PropEngine {
    roots: Vec<TermId>,
    rng: StdRng,
    nprops: u64,
    nupdates: u64,
    prob_inverse: u32,
    assignment: FxHashMap<TermId, Value>,
    last: Option<SatResult>,
    stats: PropStats,
}

impl PropEngine {
    /// Engine configured from the solver options
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            roots: Vec::new(),
            rng: StdRng::seed_from_u64(options.seed),
            nprops: options.prop_nprops,
            nupdates: options.prop_nupdates,
            prob_inverse: options.prop_prob_use_inv_value,
            assignment: FxHashMap::default(),
            last: None,
            stats: PropStats::default(),
        }
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> &PropStats {
        &self.stats
    }

    fn out_of_budget(&self) -> bool {
        (self.nprops > 0 && self.stats.props >= self.nprops)
            || (self.nupdates > 0 && self.stats.updates >= self.nupdates)
    }

    fn evaluate(&self, tm: &TermManager, order: &[TermId]) -> Result<FxHashMap<TermId, Value>> {
        let mut values: FxHashMap<TermId, Value> = FxHashMap::default();
        for &id in order {
            let v = eval_term(tm, &self.assignment, &values, id)?;
            values.insert(id, v);
        }
        Ok(values)
    }

    /// Re-evaluate the cone above the updated constant `changed`
    fn update_cone(
        &mut self,
        tm: &TermManager,
        cone: &Cone,
        values: &mut FxHashMap<TermId, Value>,
        changed: TermId,
    ) -> Result<()> {
        let v = eval_term(tm, &self.assignment, values, changed)?;
        values.insert(changed, v);
        for id in cone.above(changed) {
            let v = eval_term(tm, &self.assignment, values, id)?;
            values.insert(id, v);
            self.stats.reevaluations += 1;
        }
        Ok(())
    }

    /// One propagation path from `root`; returns the updated constant
    fn propagate(&mut self, tm: &TermManager, values: &FxHashMap<TermId, Value>, root: TermId) -> Option<TermId> {
        let mut cur = root;
        let mut target = Value::Bool(true);
        loop {
            let term = &tm[cur];
            match term.kind {
                TermKind::Const => {
                    self.assignment.insert(cur, target);
                    self.stats.updates += 1;
                    return Some(cur);
                }
                TermKind::Value => return None,
                _ => {}
            }
            self.stats.props += 1;
            let vals: Vec<Value> = term.args.iter().filter_map(|a| values.get(a).cloned()).collect();
            if vals.len() != term.args.len() {
                return None;
            }
            let idx = self.select_operand(tm, cur, &vals, &target)?;
            let child = term.args[idx];
            let use_inverse = self.rng.random_range(0..1000) < self.prob_inverse;
            let inverse = if use_inverse {
                inverse_value(term.kind, &term.indices, &vals, idx, &target, &mut self.rng)
            } else {
                None
            };
            target = match inverse {
                Some(v) => {
                    self.stats.inverse_values += 1;
                    v
                }
                None => {
                    self.stats.random_values += 1;
                    random_value(&mut self.rng, tm.sort_kind(child))?
                }
            };
            cur = child;
        }
    }

    /// Operand to change so that `cur` may take the value `target`
    fn select_operand(&mut self, tm: &TermManager, cur: TermId, vals: &[Value], target: &Value) -> Option<usize> {
        let term = &tm[cur];
        let changeable: Vec<usize> = (0..term.args.len()).filter(|&i| !tm.is_value(term.args[i])).collect();
        if changeable.is_empty() {
            return None;
        }
        let pick = |rng: &mut StdRng, from: &[usize]| -> Option<usize> {
            if from.is_empty() {
                None
            } else {
                Some(from[rng.random_range(0..from.len())])
            }
        };
        let want = target.as_bool();
        match term.kind {
            // an operand that already blocks the wanted value must change
            TermKind::And | TermKind::Or => {
                let blocking = if term.kind == TermKind::And { Some(false) } else { Some(true) };
                let essential: Vec<usize> = changeable
                    .iter()
                    .copied()
                    .filter(|&i| vals[i].as_bool() == blocking && want != blocking)
                    .collect();
                pick(&mut self.rng, &essential).or_else(|| pick(&mut self.rng, &changeable))
            }
            TermKind::Ite => {
                let cond = vals[0].as_bool()?;
                let (taken, other) = if cond { (1, 2) } else { (2, 1) };
                let cond_free = changeable.contains(&0);
                if cond_free && (vals[other] == *target || !changeable.contains(&taken)) {
                    Some(0)
                } else if changeable.contains(&taken) {
                    Some(taken)
                } else {
                    None
                }
            }
            _ => pick(&mut self.rng, &changeable),
        }
    }
}

impl Engine for PropEngine {
    fn name(&self) -> &'static str {
        "prop"
    }

    fn reset_roots(&mut self) {
        self.roots.clear();
        self.last = None;
    }

    fn try_assert(&mut self, tm: &mut TermManager, root: TermId) -> Result<bool> {
        if !is_word_level(tm, root) {
            return Ok(false);
        }
        self.roots.push(root);
        Ok(true)
    }

    fn check_sat(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        self.stats = PropStats::default();
        let order = tm.post_order(&self.roots);
        let cone = Cone::new(tm, &order);
        let mut values = self.evaluate(tm, &order)?;
        let result = loop {
            let unsat: Vec<TermId> = self
                .roots
                .iter()
                .copied()
                .filter(|r| values.get(r).and_then(Value::as_bool) != Some(true))
                .collect();
            if unsat.is_empty() {
                break SatResult::Sat;
            }
            if self.out_of_budget() || monitor.should_terminate() {
                break SatResult::Unknown;
            }
            let root = unsat[self.rng.random_range(0..unsat.len())];
            match self.propagate(tm, &values, root) {
                Some(changed) => self.update_cone(tm, &cone, &mut values, changed)?,
                None => {
                    if unsat.iter().all(|&r| tm.is_value(r)) {
                        break SatResult::Unknown;
                    }
                    // a failed move still spends budget
                    self.stats.updates += 1;
                }
            }
        };
        debug!(
            result = %result,
            props = self.stats.props,
            updates = self.stats.updates,
            reevaluations = self.stats.reevaluations,
            "local search finished"
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
            let v = match self.assignment.get(&c) {
                Some(v) => v.clone(),
                None => default_value(tm.sort_kind(c))
                    .ok_or_else(|| OxbitError::state("sort without default value"))?,
            };
            model.insert(c, ModelValue::Scalar(v));
        }
        Ok(model)
    }

    fn failed_roots(&self) -> Vec<usize> {
        Vec::new()
    }
}

/// Value of `id` from the values of its operands; constants read the
/// assignment and default to zero
pub(super) fn eval_term(
    tm: &TermManager,
    assignment: &FxHashMap<TermId, Value>,
    values: &FxHashMap<TermId, Value>,
    id: TermId,
) -> Result<Value> {
    let term = &tm[id];
    let v = match term.kind {
        TermKind::Value => term.value.clone(),
        TermKind::Const => match assignment.get(&id) {
            Some(v) => Some(v.clone()),
            None => default_value(tm.sort_kind(id)),
        },
        kind => {
            let args: Vec<Value> = term
                .args
                .iter()
                .map(|a| values.get(a).cloned())
                .collect::<Option<_>>()
                .ok_or_else(|| OxbitError::state("operand was not evaluated"))?;
            fold(kind, &term.indices, &args)
        }
    };
    v.ok_or_else(|| OxbitError::state(format!("cannot evaluate {id}")))
}

/// Is `root` built from Boolean and bit-vector operators only
pub(crate) fn is_word_level(tm: &TermManager, root: TermId) -> bool {
    tm.post_order(&[root]).into_iter().all(|id| {
        let term = &tm[id];
        matches!(tm.sort_kind(id), SortKind::Bool | SortKind::BitVec(_))
            && !matches!(
                term.kind,
                TermKind::Var
                    | TermKind::Apply
                    | TermKind::Lambda
                    | TermKind::Forall
                    | TermKind::Exists
                    | TermKind::ArraySelect
            )
            && term.args.iter().all(|&a| matches!(tm.sort_kind(a), SortKind::Bool | SortKind::BitVec(_)))
    })
}

fn random_bv(rng: &mut StdRng, width: u32) -> BitVec {
    let bits: Vec<bool> = (0..width).map(|_| rng.random::<bool>()).collect();
    BitVec::from_bits(&bits)
}

pub(super) fn random_value(rng: &mut StdRng, sort: &SortKind) -> Option<Value> {
    match sort {
        SortKind::Bool => Some(Value::Bool(rng.random::<bool>())),
        SortKind::BitVec(w) => Some(Value::BitVec(random_bv(rng, *w))),
        _ => None,
    }
}

/// Random `x` with `x > s` (or `x >= s` when not strict)
fn above(rng: &mut StdRng, s: &BitVec, strict: bool) -> Option<BitVec> {
    let w = s.width();
    let r = random_bv(rng, w);
    if strict {
        if s.is_ones() {
            return None;
        }
        let span = BitVec::ones(w).sub(s);
        Some(s.inc().add(&r.urem(&span)))
    } else {
        // span wraps to zero for s = 0, and x urem 0 = x
        let span = BitVec::ones(w).sub(s).inc();
        Some(s.add(&r.urem(&span)))
    }
}

/// Random `x` with `x < s` (or `x <= s` when not strict)
fn below(rng: &mut StdRng, s: &BitVec, strict: bool) -> Option<BitVec> {
    let r = random_bv(rng, s.width());
    if strict {
        if s.is_zero() {
            return None;
        }
        Some(r.urem(s))
    } else {
        Some(r.urem(&s.inc()))
    }
}

/// Inverse of an unsigned comparison `lhs < rhs` / `lhs <= rhs` for the
/// operand at `idx`
fn compare_inverse(rng: &mut StdRng, strict: bool, idx: usize, other: &BitVec, want: bool) -> Option<BitVec> {
    match (idx, want) {
        // x < s
        (0, true) => below(rng, other, strict),
        // x >= s / x > s
        (0, false) => above(rng, other, !strict),
        // s < x
        (_, true) => above(rng, other, strict),
        (_, false) => below(rng, other, !strict),
    }
}

fn odd_inverse(s: &BitVec) -> BitVec {
    let w = s.width();
    let two = BitVec::from_u64(w, 2);
    let mut inv = s.clone();
    let mut precision = 3;
    while precision < w {
        inv = inv.mul(&two.sub(&s.mul(&inv)));
        precision *= 2;
    }
    inv
}

fn trailing_zeros(s: &BitVec) -> u32 {
    (0..s.width()).find(|&i| s.bit(i)).unwrap_or(s.width())
}

fn mul_inverse(rng: &mut StdRng, s: &BitVec, t: &BitVec) -> Option<BitVec> {
    let w = s.width();
    if s.is_zero() {
        return t.is_zero().then(|| random_bv(rng, w));
    }
    let tz = trailing_zeros(s);
    if trailing_zeros(t) < tz {
        return None;
    }
    let x = t.lshr_const(tz).mul(&odd_inverse(&s.lshr_const(tz)));
    // the top tz bits of x are shifted out
    let free = BitVec::ones(w).shl_const(w - tz);
    Some(x.and(&free.not()).or(&random_bv(rng, w).and(&free)))
}

fn shift_amount_inverse(kind: TermKind, x: &BitVec, t: &BitVec) -> Option<BitVec> {
    let w = x.width();
    let shifted = |n: &BitVec| match kind {
        TermKind::BvShl => x.shl(n),
        TermKind::BvShr => x.lshr(n),
        _ => x.ashr(n),
    };
    let limit = if w >= 64 { u64::MAX } else { (1u64 << w) - 1 };
    (0..u64::from(w).min(limit))
        .map(|n| BitVec::from_u64(w, n))
        .chain(std::iter::once(BitVec::ones(w)))
        .find(|n| shifted(n) == *t)
}

fn shifted_operand_inverse(rng: &mut StdRng, kind: TermKind, amount: &BitVec, t: &BitVec) -> Option<BitVec> {
    let w = t.width();
    let n = match amount.to_u64() {
        Some(n) if n < u64::from(w) => n as u32,
        _ => {
            let all_out = match kind {
                TermKind::BvAshr => t.is_zero() || t.is_ones(),
                _ => t.is_zero(),
            };
            if !all_out {
                return None;
            }
            let r = random_bv(rng, w);
            return Some(if kind == TermKind::BvAshr && t.is_ones() {
                r.or(&BitVec::min_signed(w))
            } else if kind == TermKind::BvAshr {
                r.and(&BitVec::max_signed(w))
            } else {
                r
            });
        }
    };
    let r = random_bv(rng, w);
    let x = match kind {
        TermKind::BvShl => t
            .lshr_const(n)
            .or(&r.and(&BitVec::ones(w).shl_const(w - n))),
        TermKind::BvShr => t.shl_const(n).or(&r.and(&BitVec::ones(w).lshr_const(w - n))),
        _ => t.shl_const(n).or(&r.and(&BitVec::ones(w).lshr_const(w - n))),
    };
    let ok = match kind {
        TermKind::BvShl => x.shl_const(n) == *t,
        TermKind::BvShr => x.lshr_const(n) == *t,
        _ => x.ashr(amount) == *t,
    };
    ok.then_some(x)
}

/// Value for operand `idx` under which the operator yields `target`, given
/// the current values of the other operands
fn inverse_value(
    kind: TermKind,
    indices: &[u32],
    vals: &[Value],
    idx: usize,
    target: &Value,
    rng: &mut StdRng,
) -> Option<Value> {
    use TermKind as K;
    let other = |i: usize| -> Option<&Value> { vals.get(if i == 0 { 1 } else { 0 }) };
    match target {
        Value::Bool(t) => {
            let t = *t;
            let bool_result = match kind {
                K::Not => Some(!t),
                K::And | K::Or => Some(t),
                K::Xor if vals.len() == 2 => Some(t ^ other(idx)?.as_bool()?),
                K::Iff => Some(!(t ^ other(idx)?.as_bool()?)),
                K::Implies if vals.len() == 2 => match (idx, t) {
                    (0, true) => Some(false),
                    (0, false) => Some(true),
                    (_, b) => Some(b),
                },
                _ => None,
            };
            if let Some(b) = bool_result {
                return Some(Value::Bool(b));
            }
            match kind {
                K::Equal | K::Distinct if vals.len() == 2 => {
                    let want_equal = t == (kind == K::Equal);
                    let s = other(idx)?;
                    if want_equal {
                        return Some(s.clone());
                    }
                    match s {
                        Value::Bool(b) => Some(Value::Bool(!b)),
                        Value::BitVec(bv) => {
                            let r = random_bv(rng, bv.width());
                            Some(Value::BitVec(if r == *bv { r.inc() } else { r }))
                        }
                        _ => None,
                    }
                }
                K::Ite => ite_inverse(vals, idx, target),
                K::BvUlt | K::BvUle | K::BvUgt | K::BvUge | K::BvSlt | K::BvSle | K::BvSgt | K::BvSge => {
                    let s = other(idx)?.as_bv()?;
                    let strict = matches!(kind, K::BvUlt | K::BvUgt | K::BvSlt | K::BvSgt);
                    let signed = matches!(kind, K::BvSlt | K::BvSle | K::BvSgt | K::BvSge);
                    // greater-than swaps the operand roles
                    let pos = if matches!(kind, K::BvUgt | K::BvUge | K::BvSgt | K::BvSge) {
                        1 - idx
                    } else {
                        idx
                    };
                    let flip = BitVec::min_signed(s.width());
                    let s = if signed { s.xor(&flip) } else { s.clone() };
                    let x = compare_inverse(rng, strict, pos, &s, t)?;
                    Some(Value::BitVec(if signed { x.xor(&flip) } else { x }))
                }
                _ => None,
            }
        }
        Value::BitVec(t) => {
            let s = || other(idx).and_then(Value::as_bv);
            let x = match kind {
                K::Ite => return ite_inverse(vals, idx, target),
                K::BvNot => t.not(),
                K::BvNeg => t.neg(),
                K::BvInc => t.dec(),
                K::BvDec => t.inc(),
                K::BvAdd => t.sub(s()?),
                K::BvSub if idx == 0 => t.add(s()?),
                K::BvSub => s()?.sub(t),
                K::BvXor => t.xor(s()?),
                K::BvXnor => t.xor(s()?).not(),
                K::BvAnd | K::BvNand => {
                    let t = if kind == K::BvNand { t.not() } else { t.clone() };
                    let s = s()?;
                    if !t.and(&s.not()).is_zero() {
                        return None;
                    }
                    t.or(&random_bv(rng, t.width()).and(&s.not()))
                }
                K::BvOr | K::BvNor => {
                    let t = if kind == K::BvNor { t.not() } else { t.clone() };
                    let s = s()?;
                    if !s.and(&t.not()).is_zero() {
                        return None;
                    }
                    t.and(&s.not()).or(&random_bv(rng, t.width()).and(s))
                }
                K::BvMul => mul_inverse(rng, s()?, t)?,
                K::BvShl | K::BvShr | K::BvAshr if idx == 0 => shifted_operand_inverse(rng, kind, s()?, t)?,
                K::BvShl | K::BvShr | K::BvAshr => shift_amount_inverse(kind, s()?, t)?,
                K::BvRoli => t.rotate_right(*indices.first()?),
                K::BvRori => t.rotate_left(*indices.first()?),
                K::BvRol if idx == 0 => t.ror(s()?),
                K::BvRor if idx == 0 => t.rol(s()?),
                K::BvConcat => {
                    let low = vals.get(1)?.as_bv()?.width();
                    if idx == 0 {
                        t.extract(t.width() - 1, low)
                    } else {
                        t.extract(low - 1, 0)
                    }
                }
                K::BvExtract => {
                    let (hi, lo) = (*indices.first()?, *indices.get(1)?);
                    let cur = vals.first()?.as_bv()?;
                    let mut bits = cur.to_bits();
                    for i in lo..=hi {
                        bits[i as usize] = t.bit(i - lo);
                    }
                    BitVec::from_bits(&bits)
                }
                K::BvZeroExtend | K::BvSignExtend | K::BvRepeat => {
                    let w = vals.first()?.as_bv()?.width();
                    t.extract(w - 1, 0)
                }
                K::BvComp if vals.len() == 2 => {
                    let s = s()?;
                    if t.is_one() {
                        s.clone()
                    } else {
                        let r = random_bv(rng, s.width());
                        if r == *s { r.inc() } else { r }
                    }
                }
                _ => return None,
            };
            Some(Value::BitVec(x))
        }
        _ => None,
    }
}

fn ite_inverse(vals: &[Value], idx: usize, target: &Value) -> Option<Value> {
    match idx {
        0 if vals.get(1) == Some(target) => Some(Value::Bool(true)),
        0 if vals.get(2) == Some(target) => Some(Value::Bool(false)),
        0 => None,
        _ => Some(target.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(tm: &mut TermManager, roots: &[TermId]) -> (SatResult, PropEngine) {
        let mut engine = PropEngine::new(&Options::default().with_seed(7));
        for &r in roots {
            assert!(engine.try_assert(tm, r).unwrap());
        }
        let r = engine.check_sat(tm, &TerminationMonitor::new()).unwrap();
        (r, engine)
    }

    #[test]
    fn test_linear_equation() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(16).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let k = tm.mk_bv_value_u64(s, 1234).unwrap();
        let sum = tm.mk_term(TermKind::BvAdd, &[x, k], &[]).unwrap();
        let t = tm.mk_bv_value_u64(s, 4321).unwrap();
        let eq = tm.mk_eq(sum, t).unwrap();
        let (r, mut engine) = solve(&mut tm, &[eq]);
        assert_eq!(r, SatResult::Sat);
        let model = engine.assignment(&mut tm).unwrap();
        assert_eq!(
            model.get(x),
            Some(&ModelValue::Scalar(Value::BitVec(BitVec::from_u64(16, 3087))))
        );
    }

    #[test]
    fn test_updates_reevaluate_only_the_cone() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(16).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let k = tm.mk_bv_value_u64(s, 1234).unwrap();
        let sum = tm.mk_term(TermKind::BvAdd, &[x, k], &[]).unwrap();
        let t = tm.mk_bv_value_u64(s, 4321).unwrap();
        let eq = tm.mk_eq(sum, t).unwrap();
        // a long chain over y that holds from the start
        let one = tm.mk_bv_value_u64(s, 1).unwrap();
        let mut chain = y;
        for _ in 0..64 {
            chain = tm.mk_term(TermKind::BvAdd, &[chain, one], &[]).unwrap();
        }
        let zero = tm.mk_bv_value_u64(s, 0).unwrap();
        let holds = tm.mk_term(TermKind::BvUge, &[chain, zero], &[]).unwrap();
        let (r, engine) = solve(&mut tm, &[holds, eq]);
        assert_eq!(r, SatResult::Sat);
        let stats = engine.stats();
        assert!(stats.updates >= 1);
        assert!(stats.reevaluations <= 2 * stats.updates);
    }

    #[test]
    fn test_odd_multiplication() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(32).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let k = tm.mk_bv_value_u64(s, 12345).unwrap();
        let prod = tm.mk_term(TermKind::BvMul, &[x, k], &[]).unwrap();
        let t = tm.mk_bv_value_u64(s, 99).unwrap();
        let eq = tm.mk_eq(prod, t).unwrap();
        let (r, _) = solve(&mut tm, &[eq]);
        assert_eq!(r, SatResult::Sat);
    }

    #[test]
    fn test_inequalities() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let lo = tm.mk_bv_value_u64(s, 100).unwrap();
        let gt = tm.mk_term(TermKind::BvUgt, &[x, lo], &[]).unwrap();
        let slt = tm.mk_term(TermKind::BvSlt, &[y, x], &[]).unwrap();
        let (r, mut engine) = solve(&mut tm, &[gt, slt]);
        assert_eq!(r, SatResult::Sat);
        let model = engine.assignment(&mut tm).unwrap();
        let xv = model.get(x).and_then(ModelValue::as_scalar).and_then(Value::as_bv).unwrap().clone();
        let yv = model.get(y).and_then(ModelValue::as_scalar).and_then(Value::as_bv).unwrap().clone();
        assert!(xv.to_u64().unwrap() > 100);
        assert!(yv.slt(&xv));
    }

    #[test]
    fn test_budget_gives_unknown() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let lt = tm.mk_term(TermKind::BvUlt, &[x, x], &[]).unwrap();
        let mut options = Options::default();
        options.prop_nprops = 50;
        let mut engine = PropEngine::new(&options);
        assert!(engine.try_assert(&mut tm, lt).unwrap());
        let r = engine.check_sat(&mut tm, &TerminationMonitor::new()).unwrap();
        assert_eq!(r, SatResult::Unknown);
    }

    #[test]
    fn test_inverse_values() {
        let mut rng = StdRng::seed_from_u64(1);
        let t = Value::BitVec(BitVec::from_u64(8, 24));
        let vals = [Value::BitVec(BitVec::from_u64(8, 0)), Value::BitVec(BitVec::from_u64(8, 3))];
        let x = inverse_value(TermKind::BvShl, &[], &vals, 0, &t, &mut rng).unwrap();
        assert_eq!(x.as_bv().unwrap().shl_const(3), BitVec::from_u64(8, 24));
        let vals = [Value::BitVec(BitVec::from_u64(8, 6)), Value::BitVec(BitVec::from_u64(8, 0))];
        let n = inverse_value(TermKind::BvShl, &[], &vals, 1, &Value::BitVec(BitVec::from_u64(8, 24)), &mut rng);
        assert_eq!(n, Some(Value::BitVec(BitVec::from_u64(8, 2))));
        assert!(inverse_value(TermKind::BvMul, &[], &vals, 1, &Value::BitVec(BitVec::from_u64(8, 1)), &mut rng).is_none());
    }

    #[test]
    fn test_declines_arrays() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(s, Some("i"));
        let rd = tm.mk_select(a, i).unwrap();
        let eq = tm.mk_eq(rd, i).unwrap();
        let mut engine = PropEngine::new(&Options::default());
        assert!(!engine.try_assert(&mut tm, eq).unwrap());
    }
}
