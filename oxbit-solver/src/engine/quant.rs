//! Counterexample-guided quantifier instantiation
//!
//! Every outermost quantifier is replaced by a fresh Boolean literal and the
//! resulting ground abstraction is decided by a [`BitblastEngine`]. Each
//! literal `q` stands for a universal formula `forall xs. body` (an
//! existential is the negation of a universal). Two kinds of lemmas tie the
//! literals to their meaning:
//!
//! - skolemization, added once: `q or not body[xs := sks]` with fresh
//!   constants `sks`
//! - instances, added per round: `q -> body[xs := ts]`
//!
//! After a satisfiable ground check every literal that is true in the model
//! is checked for a counterexample: the negated body with all free
//! constants replaced by their model values. A counterexample yields an
//! instance whose terms are synthesized from the ground constants when they
//! refute the model as well, and the counterexample values otherwise. When
//! no literal has a counterexample the ground model is a model of the
//! quantified formula.
//!
//! When the round limit is reached the engine can retry on the dual
//! problem: the negated formula with all constants universally quantified.
//! The dual being satisfiable proves the original unsatisfiable, and any
//! counterexample of the dual is a model of the original.

use super::{BitblastEngine, Engine, has_quantifiers};
use crate::model::{Evaluator, Model, ModelOracle, ModelValue, default_model_value};
use crate::options::Options;
use crate::result::SatResult;
use crate::terminate::TerminationMonitor;
use oxbit_core::ast::{SubstMap, TermId, TermKind, TermManager};
use oxbit_core::sort::SortKind;
use oxbit_core::{OxbitError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Counters of the quantifier engine
#[derive(Debug, Clone, Default)]
pub struct QuantStats {
    /// Refinement rounds
    pub rounds: u64,
    /// Quantifiers abstracted
    pub quantifiers: u64,
    /// Instances added
    pub instances: u64,
    /// Instances built from synthesized terms
    pub synthesized: u64,
    /// Variables removed by destructive equality resolution
    pub der_eliminated: u64,
    /// Dual checks run
    pub dual_checks: u64,
}

#[derive(Debug)]
struct Quantifier {
    term: TermId,
    lit: TermId,
    vars: Vec<TermId>,
    body: TermId,
    instances: FxHashSet<Vec<TermId>>,
}

enum Counterexample {
    Holds,
    Refuted(Vec<ModelValue>),
    Unknown,
}

/// Quantifier instantiation on top of the bit-blasting engine
#[derive(Debug)]
pub struct QuantEngine {
    options: Options,
    ground: BitblastEngine,
    roots: Vec<TermId>,
    quants: Vec<Quantifier>,
    quant_of: FxHashMap<TermId, usize>,
    witness: Option<FxHashMap<TermId, ModelValue>>,
    model: Option<Model>,
    last: Option<SatResult>,
    failed: Vec<usize>,
    stats: QuantStats,
}

impl QuantEngine {
    /// Engine configured from the solver options
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            options: options.clone(),
            ground: BitblastEngine::new(options),
            roots: Vec::new(),
            quants: Vec::new(),
            quant_of: FxHashMap::default(),
            witness: None,
            model: None,
            last: None,
            failed: Vec::new(),
            stats: QuantStats::default(),
        }
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> &QuantStats {
        &self.stats
    }

    /// Replace every outermost quantifier of `t` by its literal
    fn abstract_term(&mut self, tm: &mut TermManager, t: TermId) -> Result<TermId> {
        let mut found = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack = vec![t];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let term = &tm[id];
            if term.kind.is_quantifier() {
                found.push(id);
            } else {
                stack.extend(term.args.iter().copied());
            }
        }
        if found.is_empty() {
            return Ok(t);
        }
        let mut map = SubstMap::default();
        for q in found {
            let replacement = self.register(tm, q)?;
            map.insert(q, replacement);
        }
        tm.substitute(t, &map)
    }

    fn register(&mut self, tm: &mut TermManager, q: TermId) -> Result<TermId> {
        if !tm[q].free_vars.is_empty() {
            return Err(OxbitError::unsupported("quantifier under a binder"));
        }
        let (forall, negated) = if tm[q].kind == TermKind::Exists {
            let (var, body) = (tm[q].args[0], tm[q].args[1]);
            let nbody = tm.mk_not(body)?;
            (tm.mk_term(TermKind::Forall, &[var, nbody], &[])?, true)
        } else {
            (q, false)
        };
        let lit = match self.quant_of.get(&forall) {
            Some(&k) => self.quants[k].lit,
            None => self.add_quantifier(tm, forall)?,
        };
        if negated { tm.mk_not(lit) } else { Ok(lit) }
    }

    fn add_quantifier(&mut self, tm: &mut TermManager, forall: TermId) -> Result<TermId> {
        let (mut vars, mut body) = prefix(tm, forall)?;
        if self.options.quant_der {
            let before = vars.len();
            (vars, body) = destructive_equality_resolution(tm, vars, body)?;
            self.stats.der_eliminated += (before - vars.len()) as u64;
        }
        let bool_sort = tm.mk_bool_sort();
        let lit = tm.mk_fresh_const(bool_sort, "q");
        let k = self.quants.len();
        self.quants.push(Quantifier {
            term: forall,
            lit,
            vars: vars.clone(),
            body,
            instances: FxHashSet::default(),
        });
        self.quant_of.insert(forall, k);
        self.stats.quantifiers += 1;
        trace!(quantifier = %forall, vars = vars.len(), "quantifier abstracted");

        let mut skolems = SubstMap::default();
        for &v in &vars {
            let sk = tm.mk_fresh_const(tm.sort_of(v), "sk");
            skolems.insert(v, sk);
        }
        let witness = tm.substitute(body, &skolems)?;
        let refuted = tm.mk_not(witness)?;
        let lemma = tm.mk_or(&[lit, refuted])?;
        self.add_lemma(tm, lemma)?;
        if vars.is_empty() {
            let holds = tm.mk_implies(lit, body)?;
            self.add_lemma(tm, holds)?;
        }
        Ok(lit)
    }

    fn add_lemma(&mut self, tm: &mut TermManager, lemma: TermId) -> Result<()> {
        let ground = self.abstract_term(tm, lemma)?;
        self.ground.add_lemma(tm, ground)
    }

    /// Search a counterexample of quantifier `k` under `model`
    fn counterexample(
        &mut self,
        tm: &mut TermManager,
        k: usize,
        model: &Model,
        monitor: &TerminationMonitor,
    ) -> Result<Counterexample> {
        let (vars, body) = (self.quants[k].vars.clone(), self.quants[k].body);
        let mut oracle = ModelOracle::new(model.clone());
        let mut map = SubstMap::default();
        for c in tm.collect_consts(&[body]) {
            let v = oracle.value(tm, c)?;
            map.insert(c, v);
        }
        let mut ces = Vec::with_capacity(vars.len());
        for &x in &vars {
            let c = tm.mk_fresh_const(tm.sort_of(x), "ce");
            map.insert(x, c);
            ces.push(c);
        }
        let instance = tm.substitute(body, &map)?;
        let query = tm.mk_not(instance)?;

        let mut options = self.options.clone();
        options.quant_dual_solver = false;
        let (result, sub_model) = if has_quantifiers(tm, query) {
            let mut engine = QuantEngine::new(&options);
            solve_with(&mut engine, tm, query, monitor)?
        } else {
            let mut engine = BitblastEngine::new(&options);
            solve_with(&mut engine, tm, query, monitor)?
        };
        Ok(match (result, sub_model) {
            (SatResult::Unsat, _) => Counterexample::Holds,
            (SatResult::Sat, Some(m)) => {
                let mut values = Vec::with_capacity(ces.len());
                for &c in &ces {
                    values.push(match m.get(c) {
                        Some(v) => v.clone(),
                        None => default_model_value(tm, tm.sort_of(c))?,
                    });
                }
                Counterexample::Refuted(values)
            }
            _ => Counterexample::Unknown,
        })
    }

    /// Instantiation terms for quantifier `k` refuted by `values`
    fn instantiation(
        &mut self,
        tm: &mut TermManager,
        k: usize,
        model: &Model,
        values: &[ModelValue],
    ) -> Result<Vec<TermId>> {
        let (vars, body) = (self.quants[k].vars.clone(), self.quants[k].body);
        let mut oracle = ModelOracle::new(model.clone());
        let mut fallback = Vec::with_capacity(vars.len());
        for (&x, v) in vars.iter().zip(values) {
            let sort = tm.sort_of(x);
            fallback.push(oracle.to_term(tm, v, sort)?);
        }
        if !self.options.quant_synth_qi || vars.is_empty() {
            return Ok(fallback);
        }

        let ground_consts = tm.collect_consts(&self.roots);
        let mut candidates: Vec<Vec<TermId>> = Vec::with_capacity(vars.len());
        for (&x, &value) in vars.iter().zip(&fallback) {
            let sort = tm.sort_of(x);
            let mut pool: Vec<TermId> = ground_consts
                .iter()
                .copied()
                .filter(|&c| tm.sort_of(c) == sort)
                .collect();
            if let SortKind::BitVec(_) = tm.sort_kind(x) {
                pool.push(tm.mk_bv_zero(sort)?);
                pool.push(tm.mk_bv_one(sort)?);
            }
            pool.push(value);
            let mut unique = FxHashSet::default();
            pool.retain(|t| unique.insert(*t));
            candidates.push(pool);
        }

        let limit = u64::from(self.options.quant_synth_limit);
        let mut odometer = vec![0usize; vars.len()];
        let mut evaluator = Evaluator::new();
        let mut tried = 0u64;
        while tried < limit {
            let tuple: Vec<TermId> = odometer.iter().zip(&candidates).map(|(&i, pool)| pool[i]).collect();
            tried += 1;
            if tuple != fallback && !self.quants[k].instances.contains(&tuple) {
                let map: SubstMap = vars.iter().copied().zip(tuple.iter().copied()).collect();
                let instance = tm.substitute(body, &map)?;
                if let Ok(v) = evaluator.eval(tm, model, instance)
                    && v.as_bool() == Some(false)
                {
                    self.stats.synthesized += 1;
                    return Ok(tuple);
                }
            }
            // advance; stop after the last tuple
            let mut pos = 0;
            loop {
                if pos == odometer.len() {
                    return Ok(fallback);
                }
                odometer[pos] += 1;
                if odometer[pos] < candidates[pos].len() {
                    break;
                }
                odometer[pos] = 0;
                pos += 1;
            }
        }
        Ok(fallback)
    }

    /// One refinement pass over the literals true in `model`; returns the
    /// number of instances added and whether some check was inconclusive
    fn refine(&mut self, tm: &mut TermManager, model: &Model, monitor: &TerminationMonitor) -> Result<(usize, bool)> {
        let mut added = 0;
        let mut incomplete = false;
        let mut evaluator = Evaluator::new();
        let mut k = 0;
        // lemmas may register new quantifiers while iterating
        while k < self.quants.len() {
            let lit = self.quants[k].lit;
            if evaluator.eval(tm, model, lit)?.as_bool() != Some(true) {
                k += 1;
                continue;
            }
            match self.counterexample(tm, k, model, monitor)? {
                Counterexample::Holds => {}
                Counterexample::Unknown => incomplete = true,
                Counterexample::Refuted(values) => {
                    if self.witness.is_none() && self.roots.contains(&self.quants[k].term) {
                        let vars = &self.quants[k].vars;
                        self.witness = Some(vars.iter().copied().zip(values.iter().cloned()).collect());
                    }
                    let terms = self.instantiation(tm, k, model, &values)?;
                    if self.quants[k].instances.insert(terms.clone()) {
                        let map: SubstMap = self.quants[k].vars.iter().copied().zip(terms.iter().copied()).collect();
                        let instance = tm.substitute(self.quants[k].body, &map)?;
                        let lemma = tm.mk_implies(lit, instance)?;
                        self.add_lemma(tm, lemma)?;
                        self.stats.instances += 1;
                        added += 1;
                    } else {
                        incomplete = true;
                    }
                }
            }
            k += 1;
        }
        Ok((added, incomplete))
    }

    fn check_dual(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        let formula = tm.mk_and(&self.roots)?;
        let consts = tm.collect_consts(&[formula]);
        if consts.is_empty()
            || consts
                .iter()
                .any(|&c| matches!(tm.sort_kind(c), SortKind::Array { .. } | SortKind::Function { .. }))
        {
            return Ok(SatResult::Unknown);
        }
        self.stats.dual_checks += 1;
        let mut map = SubstMap::default();
        let mut args: SmallVec<[TermId; 4]> = SmallVec::new();
        for &c in &consts {
            let v = tm.mk_fresh_var(tm.sort_of(c), "d")?;
            map.insert(c, v);
            args.push(v);
        }
        let open = tm.substitute(formula, &map)?;
        args.push(tm.mk_not(open)?);
        let dual = tm.mk_term(TermKind::Forall, &args, &[])?;

        let mut options = self.options.clone();
        options.quant_dual_solver = false;
        options.quant_der = false;
        let mut engine = QuantEngine::new(&options);
        if !engine.try_assert(tm, dual)? {
            return Ok(SatResult::Unknown);
        }
        let result = engine.check_sat(tm, monitor)?;
        debug!(result = %result, "dual check finished");
        if let Some(witness) = engine.witness.take() {
            let mut model = Model::new();
            for &c in &consts {
                let value = match map.get(&c).and_then(|v| witness.get(v)) {
                    Some(v) => v.clone(),
                    None => default_model_value(tm, tm.sort_of(c))?,
                };
                model.insert(c, value);
            }
            self.model = Some(model);
            return Ok(SatResult::Sat);
        }
        if result == SatResult::Sat {
            self.failed = (0..self.roots.len()).collect();
            return Ok(SatResult::Unsat);
        }
        Ok(SatResult::Unknown)
    }

    fn solve(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        for round in 0..self.options.quant_max_rounds {
            if monitor.should_terminate() {
                return Ok(SatResult::Unknown);
            }
            self.stats.rounds += 1;
            match self.ground.check_sat(tm, monitor)? {
                SatResult::Unsat => {
                    self.failed = self.ground.failed_roots();
                    return Ok(SatResult::Unsat);
                }
                SatResult::Unknown => return Ok(SatResult::Unknown),
                SatResult::Sat => {}
            }
            let model = self.ground.assignment(tm)?;
            let (added, incomplete) = self.refine(tm, &model, monitor)?;
            debug!(round, instances = added, "quantifier round");
            if added == 0 {
                if incomplete {
                    return Ok(SatResult::Unknown);
                }
                self.model = Some(model);
                return Ok(SatResult::Sat);
            }
        }
        if self.options.quant_dual_solver && !monitor.should_terminate() {
            return self.check_dual(tm, monitor);
        }
        Ok(SatResult::Unknown)
    }
}

impl Engine for QuantEngine {
    fn name(&self) -> &'static str {
        "quant"
    }

    fn reset_roots(&mut self) {
        self.ground.reset_roots();
        self.roots.clear();
        self.failed.clear();
        self.model = None;
        self.last = None;
    }

    fn try_assert(&mut self, tm: &mut TermManager, root: TermId) -> Result<bool> {
        let ground = self.abstract_term(tm, root)?;
        if !self.ground.try_assert(tm, ground)? {
            return Ok(false);
        }
        self.roots.push(root);
        Ok(true)
    }

    fn check_sat(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        self.failed.clear();
        self.model = None;
        let result = self.solve(tm, monitor)?;
        debug!(
            result = %result,
            rounds = self.stats.rounds,
            instances = self.stats.instances,
            "quantifier check finished"
        );
        self.last = Some(result);
        Ok(result)
    }

    fn assignment(&mut self, _tm: &mut TermManager) -> Result<Model> {
        match (&self.last, &self.model) {
            (Some(SatResult::Sat), Some(m)) => Ok(m.clone()),
            _ => Err(OxbitError::state("the last check was not satisfiable")),
        }
    }

    fn failed_roots(&self) -> Vec<usize> {
        self.failed.clone()
    }
}

fn solve_with<E: Engine>(
    engine: &mut E,
    tm: &mut TermManager,
    query: TermId,
    monitor: &TerminationMonitor,
) -> Result<(SatResult, Option<Model>)> {
    if !engine.try_assert(tm, query)? {
        return Ok((SatResult::Unknown, None));
    }
    let result = engine.check_sat(tm, monitor)?;
    let model = if result == SatResult::Sat {
        Some(engine.assignment(tm)?)
    } else {
        None
    };
    Ok((result, model))
}

/// Variables and body of a universal prefix; `not exists` is read as
/// `forall not`
fn prefix(tm: &mut TermManager, forall: TermId) -> Result<(Vec<TermId>, TermId)> {
    let mut vars = Vec::new();
    let mut body = forall;
    loop {
        let (kind, first, second) = {
            let term = &tm[body];
            (term.kind, term.args.first().copied(), term.args.get(1).copied())
        };
        match (kind, first, second) {
            (TermKind::Forall, Some(var), Some(inner)) => {
                vars.push(var);
                body = inner;
            }
            (TermKind::Not, Some(e), _) if tm[e].kind == TermKind::Exists => {
                let (var, inner) = (tm[e].args[0], tm[e].args[1]);
                vars.push(var);
                body = tm.mk_not(inner)?;
            }
            _ => return Ok((vars, body)),
        }
    }
}

fn disjuncts(tm: &TermManager, t: TermId) -> Vec<TermId> {
    let mut out = Vec::new();
    let mut stack = vec![t];
    while let Some(id) = stack.pop() {
        let term = &tm[id];
        if term.kind == TermKind::Or {
            stack.extend(term.args.iter().rev().copied());
        } else {
            out.push(id);
        }
    }
    out
}

/// Remove variables `x` with a disjunct `x != t`, substituting `t` for `x`
fn destructive_equality_resolution(
    tm: &mut TermManager,
    mut vars: Vec<TermId>,
    mut body: TermId,
) -> Result<(Vec<TermId>, TermId)> {
    loop {
        let parts = disjuncts(tm, body);
        if parts.len() < 2 {
            return Ok((vars, body));
        }
        let mut found = None;
        'search: for (i, &d) in parts.iter().enumerate() {
            let term = &tm[d];
            if term.kind != TermKind::Not {
                continue;
            }
            let eq = &tm[term.args[0]];
            if eq.kind != TermKind::Equal || eq.args.len() != 2 {
                continue;
            }
            for (x, t) in [(eq.args[0], eq.args[1]), (eq.args[1], eq.args[0])] {
                if vars.contains(&x) && !tm.occurs(x, t) {
                    found = Some((i, x, t));
                    break 'search;
                }
            }
        }
        let Some((i, x, t)) = found else {
            return Ok((vars, body));
        };
        let rest: Vec<TermId> = parts
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &d)| d)
            .collect();
        let rest = tm.mk_or(&rest)?;
        let map: SubstMap = std::iter::once((x, t)).collect();
        body = tm.substitute(rest, &map)?;
        vars.retain(|&v| v != x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(tm: &mut TermManager, options: &Options, roots: &[TermId]) -> (SatResult, QuantEngine) {
        let mut engine = QuantEngine::new(options);
        for &r in roots {
            assert!(engine.try_assert(tm, r).unwrap());
        }
        let r = engine.check_sat(tm, &TerminationMonitor::new()).unwrap();
        (r, engine)
    }

    #[test]
    fn test_universal_lower_bound() {
        // forall x. c <= x  forces c = 0
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let c = tm.mk_const(s, Some("c"));
        let x = tm.mk_var(s, Some("x")).unwrap();
        let le = tm.mk_term(TermKind::BvUle, &[c, x], &[]).unwrap();
        let all = tm.mk_term(TermKind::Forall, &[x, le], &[]).unwrap();
        let (r, mut engine) = check(&mut tm, &Options::default(), &[all]);
        assert_eq!(r, SatResult::Sat);
        let model = engine.assignment(&mut tm).unwrap();
        let v = Evaluator::new().eval(&tm, &model, c).unwrap();
        assert_eq!(v, default_model_value(&tm, s).unwrap());
    }

    #[test]
    fn test_universal_contradiction() {
        // forall x. x != c is unsatisfiable
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let c = tm.mk_const(s, Some("c"));
        let x = tm.mk_var(s, Some("x")).unwrap();
        let ne = tm.mk_term(TermKind::Distinct, &[x, c], &[]).unwrap();
        let all = tm.mk_term(TermKind::Forall, &[x, ne], &[]).unwrap();
        let (r, engine) = check(&mut tm, &Options::default(), &[all]);
        assert_eq!(r, SatResult::Unsat);
        assert_eq!(engine.failed_roots(), vec![0]);
    }

    #[test]
    fn test_existential_is_skolemized() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_var(s, Some("x")).unwrap();
        let k = tm.mk_bv_value_u64(s, 3).unwrap();
        let prod = tm.mk_term(TermKind::BvMul, &[x, k], &[]).unwrap();
        let nine = tm.mk_bv_value_u64(s, 9).unwrap();
        let eq = tm.mk_eq(prod, nine).unwrap();
        let ex = tm.mk_term(TermKind::Exists, &[x, eq], &[]).unwrap();
        let (r, _) = check(&mut tm, &Options::default(), &[ex]);
        assert_eq!(r, SatResult::Sat);
    }

    #[test]
    fn test_der_removes_variable() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let c = tm.mk_const(s, Some("c"));
        let x = tm.mk_var(s, Some("x")).unwrap();
        let eq = tm.mk_eq(x, c).unwrap();
        let ne = tm.mk_not(eq).unwrap();
        let zero = tm.mk_bv_zero(s).unwrap();
        let is_zero = tm.mk_eq(x, zero).unwrap();
        let body = tm.mk_or(&[ne, is_zero]).unwrap();
        let (vars, rest) = destructive_equality_resolution(&mut tm, vec![x], body).unwrap();
        assert!(vars.is_empty());
        assert!(!tm.occurs(x, rest));
    }

    #[test]
    fn test_function_axiom() {
        // forall x. f(x) = x together with f(a) != a is unsatisfiable
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let fs = tm.mk_fun_sort(&[s], s).unwrap();
        let f = tm.mk_const(fs, Some("f"));
        let a = tm.mk_const(s, Some("a"));
        let x = tm.mk_var(s, Some("x")).unwrap();
        let fx = tm.mk_apply(f, &[x]).unwrap();
        let id = tm.mk_eq(fx, x).unwrap();
        let all = tm.mk_term(TermKind::Forall, &[x, id], &[]).unwrap();
        let fa = tm.mk_apply(f, &[a]).unwrap();
        let bad = tm.mk_term(TermKind::Distinct, &[fa, a], &[]).unwrap();
        let (r, _) = check(&mut tm, &Options::default(), &[all, bad]);
        assert_eq!(r, SatResult::Unsat);
    }
}
