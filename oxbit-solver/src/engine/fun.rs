//! Bit-blasting engine
//!
//! Ground roots are reduced to scalar terms, blasted into one shared AIG and
//! handed to the SAT backend clause by clause. Everything learned stays in
//! the backend across checks: theory lemmas, refinement lemmas and the CNF
//! of every blasted cone. Roots of a check are passed as assumptions, so a
//! failed assumption names a root of the unsat core.
//!
//! Floating-point operators are blasted to exact rounding circuits, so the
//! only lazy refinement left is function congruence: after each satisfiable
//! SAT call the AIG is simulated under the SAT model and every pair of
//! applications that agrees on its arguments but not on its result gets a
//! congruence lemma, unless Ackermann lemmas were added eagerly.

use super::aig::{Aig, AigEdge, edge_value};
use super::blast::{Blaster, decode};
use super::cnf::CnfEncoder;
use super::elim::TheoryElim;
use super::{Engine, has_quantifiers};
use crate::model::{Evaluator, Model, ModelValue, default_model_value};
use crate::options::Options;
use crate::result::SatResult;
use crate::terminate::TerminationMonitor;
use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::sort::SortKind;
use oxbit_core::{OxbitError, Result};
use oxbit_sat::{Lit, SatBackend, SolverResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use tracing::{debug, trace};

/// Counters of the bit-blasting engine
#[derive(Debug, Clone, Default)]
pub struct BitblastStats {
    /// `check_sat` calls
    pub checks: u64,
    /// SAT calls that needed refinement
    pub refinements: u64,
    /// Lazy function congruence lemmas
    pub congruence_lemmas: u64,
}

/// Persistent bit-blasting engine over one SAT backend
pub struct BitblastEngine {
    aig: Aig,
    blaster: Blaster,
    cnf: CnfEncoder,
    sat: Box<dyn SatBackend>,
    elim: TheoryElim,
    encoded: FxHashSet<TermId>,
    roots: Vec<TermId>,
    root_lits: Vec<Lit>,
    refinement_limit: u32,
    last: Option<SatResult>,
    failed: Vec<usize>,
    stats: BitblastStats,
}

impl fmt::Debug for BitblastEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitblastEngine")
            .field("backend", &self.sat.name())
            .field("aig_nodes", &self.aig.len())
            .field("roots", &self.roots.len())
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl BitblastEngine {
    /// Engine over the default CDCL backend
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self::with_backend(options, Box::new(oxbit_sat::Solver::new()))
    }

    /// Engine over a caller-provided SAT backend
    #[must_use]
    pub fn with_backend(options: &Options, mut sat: Box<dyn SatBackend>) -> Self {
        sat.set_threads(options.sat_threads as usize);
        Self {
            aig: Aig::new(),
            blaster: Blaster::new(),
            cnf: CnfEncoder::new(),
            sat,
            elim: TheoryElim::new(options.ackermann),
            encoded: FxHashSet::default(),
            roots: Vec::new(),
            root_lits: Vec::new(),
            refinement_limit: options.refinement_limit,
            last: None,
            failed: Vec::new(),
            stats: BitblastStats::default(),
        }
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> &BitblastStats {
        &self.stats
    }

    /// Roots accepted since the last reset
    #[must_use]
    pub fn roots(&self) -> &[TermId] {
        &self.roots
    }

    /// Assert a quantifier-free formula permanently, for all later checks
    ///
    /// # Errors
    ///
    /// Fails for quantified or unsupported formulas.
    pub fn add_lemma(&mut self, tm: &mut TermManager, lemma: TermId) -> Result<()> {
        if has_quantifiers(tm, lemma) {
            return Err(OxbitError::unsupported("quantified lemma"));
        }
        let reduced = self.elim.process(tm, lemma)?;
        self.assert_reduced(tm, reduced)?;
        self.flush_theory(tm)
    }

    fn assert_edge(&mut self, edge: AigEdge) {
        if !self.cnf.assert_edge(&self.aig, self.sat.as_mut(), edge) {
            trace!("clause database became unsatisfiable");
        }
    }

    fn flush_side_constraints(&mut self) {
        for edge in self.blaster.take_side_constraints() {
            self.assert_edge(edge);
        }
    }

    fn assert_reduced(&mut self, tm: &TermManager, t: TermId) -> Result<()> {
        let edge = self.blaster.blast_bool(&mut self.aig, tm, t)?;
        self.assert_edge(edge);
        self.flush_side_constraints();
        Ok(())
    }

    /// Assert pending theory lemmas and encode the terms the model and the
    /// lazy refinement read back: application arguments and read indices
    fn flush_theory(&mut self, tm: &mut TermManager) -> Result<()> {
        for lemma in self.elim.drain_lemmas(tm)? {
            self.assert_reduced(tm, lemma)?;
        }
        let mut pending = Vec::new();
        for (_, apps) in self.elim.applications() {
            for (args, r) in apps {
                pending.extend(args.iter().copied());
                pending.push(*r);
            }
        }
        for (_, reads) in self.elim.array_reads() {
            for &(i, r) in reads {
                pending.push(i);
                pending.push(r);
            }
        }
        for t in pending {
            if !self.encoded.insert(t) {
                continue;
            }
            let bits = self.blaster.blast(&mut self.aig, tm, t)?;
            for edge in bits {
                self.cnf.lit(&self.aig, self.sat.as_mut(), edge);
            }
            self.flush_side_constraints();
        }
        Ok(())
    }

    fn node_values(&self) -> Vec<bool> {
        let cnf = &self.cnf;
        let sat = self.sat.as_ref();
        self.aig.simulate(|node| cnf.input_value(sat, node))
    }

    /// Check function congruence against the SAT model and add a lemma for
    /// every violated pair; returns the number of lemmas
    fn refine(&mut self, tm: &mut TermManager) -> Result<usize> {
        let values = self.node_values();
        let read = |bits: &[AigEdge]| -> Vec<bool> { bits.iter().map(|&e| edge_value(&values, e)).collect() };

        let mut count = 0;
        let mut conflicts = Vec::new();
        for (f, apps) in self.elim.applications() {
            let mut seen: FxHashMap<Vec<bool>, usize> = FxHashMap::default();
            for (k, (args, r)) in apps.iter().enumerate() {
                let mut key = Vec::new();
                for a in args {
                    if let Some(bits) = self.blaster.bits(*a) {
                        key.extend(read(bits));
                    }
                }
                let Some(result) = self.blaster.bits(*r).map(&read) else {
                    continue;
                };
                match seen.get(&key) {
                    Some(&j) => {
                        let other = self.blaster.bits(apps[j].1).map(&read);
                        if other.as_ref() != Some(&result) {
                            conflicts.push((f, j, k));
                        }
                    }
                    None => {
                        seen.insert(key, k);
                    }
                }
            }
        }
        for (f, j, k) in conflicts {
            let lemma = self.elim.congruence_lemma(tm, f, j, k)?;
            self.assert_reduced(tm, lemma)?;
            self.stats.congruence_lemmas += 1;
            count += 1;
        }
        Ok(count)
    }

    fn solve(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        let mut rounds = 0u32;
        loop {
            if monitor.should_terminate() {
                return Ok(SatResult::Unknown);
            }
            match self.sat.solve(&self.root_lits) {
                SolverResult::Unsat => {
                    self.failed = (0..self.root_lits.len())
                        .filter(|&i| self.sat.failed(self.root_lits[i]))
                        .collect();
                    return Ok(SatResult::Unsat);
                }
                SolverResult::Unknown => return Ok(SatResult::Unknown),
                SolverResult::Sat => {
                    let lemmas = self.refine(tm)?;
                    if lemmas == 0 {
                        return Ok(SatResult::Sat);
                    }
                    self.stats.refinements += 1;
                    rounds += 1;
                    if rounds > self.refinement_limit {
                        debug!(rounds, "refinement limit reached");
                        return Ok(SatResult::Unknown);
                    }
                }
            }
        }
    }

    fn array_defaults(
        &self,
        tm: &TermManager,
        scalars: &Model,
        ev: &mut Evaluator,
    ) -> Result<FxHashMap<TermId, ModelValue>> {
        let mut classes = UnionFind::default();
        for eq in self.elim.array_eqs() {
            if ev.eval(tm, scalars, eq.lit)?.as_bool() != Some(true) {
                continue;
            }
            let a = array_base(tm, scalars, ev, eq.lhs)?;
            let b = array_base(tm, scalars, ev, eq.rhs)?;
            if let (Some(a), Some(b)) = (a, b) {
                classes.union(a, b);
            }
        }
        Ok(classes.constant_defaults())
    }
}

impl Engine for BitblastEngine {
    fn name(&self) -> &'static str {
        "bitblast"
    }

    fn reset_roots(&mut self) {
        self.roots.clear();
        self.root_lits.clear();
        self.failed.clear();
        self.last = None;
    }

    fn try_assert(&mut self, tm: &mut TermManager, root: TermId) -> Result<bool> {
        if has_quantifiers(tm, root) {
            return Ok(false);
        }
        let reduced = self.elim.process(tm, root)?;
        let edge = self.blaster.blast_bool(&mut self.aig, tm, reduced)?;
        self.flush_side_constraints();
        let lit = self.cnf.lit(&self.aig, self.sat.as_mut(), edge);
        self.flush_theory(tm)?;
        self.roots.push(root);
        self.root_lits.push(lit);
        Ok(true)
    }

    fn check_sat(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        self.stats.checks += 1;
        self.failed.clear();
        self.sat.set_terminate(Some(monitor.sat_terminator()));
        let result = self.solve(tm, monitor);
        self.sat.set_terminate(None);
        let result = result?;
        debug!(
            result = %result,
            roots = self.roots.len(),
            aig_nodes = self.aig.len(),
            clauses = self.cnf.num_clauses(),
            "bit-blasting check finished"
        );
        self.last = Some(result);
        Ok(result)
    }

    fn assignment(&mut self, tm: &mut TermManager) -> Result<Model> {
        if self.last != Some(SatResult::Sat) {
            return Err(OxbitError::state("the last check was not satisfiable"));
        }
        let values = self.node_values();
        let mut scalars = Model::new();
        for (t, bits) in self.blaster.inputs() {
            let raw: Vec<bool> = bits.iter().map(|&e| edge_value(&values, e)).collect();
            let v = decode(tm.sort_kind(*t), &raw)
                .ok_or_else(|| OxbitError::state(format!("cannot decode the value of {t}")))?;
            scalars.insert(*t, ModelValue::Scalar(v));
        }

        let mut ev = Evaluator::new();
        let defaults = self.array_defaults(tm, &scalars, &mut ev)?;

        let mut consts = tm.collect_consts(&self.roots);
        consts.extend(self.elim.array_reads().map(|(a, _)| a));
        consts.extend(self.elim.applications().map(|(f, _)| f));

        let mut model = scalars.clone();
        for c in consts {
            if model.contains(c) {
                continue;
            }
            let value = match tm.sort_kind(c).clone() {
                SortKind::Array { element, .. } => {
                    let default = match defaults.get(&c) {
                        Some(d) => d.clone(),
                        None => default_model_value(tm, element)?,
                    };
                    let mut table = ModelValue::constant_array(default);
                    for &(i, r) in self.elim.reads_of(c) {
                        let iv = ev.eval(tm, &scalars, i)?;
                        let rv = ev.eval(tm, &scalars, r)?;
                        table = table
                            .store(iv, rv)
                            .ok_or_else(|| OxbitError::state("array table expected"))?;
                    }
                    table
                }
                SortKind::Function { codomain, .. } => {
                    let default = default_model_value(tm, codomain)?;
                    let mut entries: Vec<(Vec<ModelValue>, ModelValue)> = Vec::new();
                    for (args, r) in self.elim.applications_of(c) {
                        let point = args
                            .iter()
                            .map(|&a| ev.eval(tm, &scalars, a))
                            .collect::<Result<Vec<_>>>()?;
                        let rv = ev.eval(tm, &scalars, *r)?;
                        if rv != default && !entries.iter().any(|(p, _)| *p == point) {
                            entries.push((point, rv));
                        }
                    }
                    ModelValue::Fun {
                        default: Box::new(default),
                        entries,
                    }
                }
                _ => default_model_value(tm, tm.sort_of(c))?,
            };
            model.insert(c, value);
        }
        Ok(model)
    }

    fn failed_roots(&self) -> Vec<usize> {
        self.failed.clone()
    }
}

/// Representative array of an array term under the scalar model: stores are
/// peeled, if-then-else follows the true branch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ArrayBase {
    Const(TermId),
    Constant(ModelValue),
}

fn array_base(tm: &TermManager, scalars: &Model, ev: &mut Evaluator, mut t: TermId) -> Result<Option<ArrayBase>> {
    loop {
        let term = &tm[t];
        match term.kind {
            TermKind::ArrayStore => t = term.args[0],
            TermKind::Ite => {
                let c = ev.eval(tm, scalars, term.args[0])?.as_bool() == Some(true);
                t = if c { term.args[1] } else { term.args[2] };
            }
            TermKind::ConstArray => {
                return Ok(Some(ArrayBase::Constant(ev.eval(tm, scalars, term.args[0])?)));
            }
            TermKind::Const => return Ok(Some(ArrayBase::Const(t))),
            _ => return Ok(None),
        }
    }
}

#[derive(Debug, Default)]
struct UnionFind {
    ids: FxHashMap<ArrayBase, usize>,
    bases: Vec<ArrayBase>,
    parent: Vec<usize>,
}

impl UnionFind {
    fn id(&mut self, b: ArrayBase) -> usize {
        if let Some(&i) = self.ids.get(&b) {
            return i;
        }
        let i = self.bases.len();
        self.ids.insert(b.clone(), i);
        self.bases.push(b);
        self.parent.push(i);
        i
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: ArrayBase, b: ArrayBase) {
        let a = self.id(a);
        let b = self.id(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }

    /// Default element of every array constant whose class contains a
    /// constant array
    fn constant_defaults(mut self) -> FxHashMap<TermId, ModelValue> {
        let mut by_root: FxHashMap<usize, ModelValue> = FxHashMap::default();
        for i in 0..self.bases.len() {
            if let ArrayBase::Constant(v) = self.bases[i].clone() {
                let r = self.find(i);
                by_root.insert(r, v);
            }
        }
        let mut out = FxHashMap::default();
        for i in 0..self.bases.len() {
            if let ArrayBase::Const(a) = self.bases[i] {
                let r = self.find(i);
                if let Some(v) = by_root.get(&r) {
                    out.insert(a, v.clone());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxbit_core::value::{BitVec, Value};

    fn check(tm: &mut TermManager, engine: &mut BitblastEngine, roots: &[TermId]) -> SatResult {
        engine.reset_roots();
        for &r in roots {
            assert!(engine.try_assert(tm, r).unwrap());
        }
        engine.check_sat(tm, &TerminationMonitor::new()).unwrap()
    }

    #[test]
    fn test_bv_sat_and_model() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let c = tm.mk_bv_value_u64(s, 7).unwrap();
        let prod = tm.mk_term(TermKind::BvMul, &[x, c], &[]).unwrap();
        let target = tm.mk_bv_value_u64(s, 21).unwrap();
        let eq = tm.mk_eq(prod, target).unwrap();
        let mut engine = BitblastEngine::new(&Options::default());
        assert_eq!(check(&mut tm, &mut engine, &[eq]), SatResult::Sat);
        let model = engine.assignment(&mut tm).unwrap();
        assert_eq!(
            model.get(x),
            Some(&ModelValue::Scalar(Value::BitVec(BitVec::from_u64(8, 3))))
        );
    }

    #[test]
    fn test_failed_roots() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let lt = tm.mk_term(TermKind::BvUlt, &[x, y], &[]).unwrap();
        let gt = tm.mk_term(TermKind::BvUgt, &[x, y], &[]).unwrap();
        let free = tm.mk_eq(x, x).unwrap();
        let mut engine = BitblastEngine::new(&Options::default());
        assert_eq!(check(&mut tm, &mut engine, &[free, lt, gt]), SatResult::Unsat);
        let failed = engine.failed_roots();
        assert!(failed.contains(&1) && failed.contains(&2));
        // learned clauses do not leak into later checks
        assert_eq!(check(&mut tm, &mut engine, &[lt]), SatResult::Sat);
    }

    #[test]
    fn test_array_model() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(s, Some("i"));
        let five = tm.mk_bv_value_u64(s, 5).unwrap();
        let rd = tm.mk_select(a, i).unwrap();
        let eq = tm.mk_eq(rd, five).unwrap();
        let mut engine = BitblastEngine::new(&Options::default());
        assert_eq!(check(&mut tm, &mut engine, &[eq]), SatResult::Sat);
        let model = engine.assignment(&mut tm).unwrap();
        let v = Evaluator::new().eval(&tm, &model, eq).unwrap();
        assert_eq!(v.as_bool(), Some(true));
    }

    #[test]
    fn test_lazy_congruence() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let fs = tm.mk_fun_sort(&[s], s).unwrap();
        let f = tm.mk_const(fs, Some("f"));
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let fx = tm.mk_apply(f, &[x]).unwrap();
        let fy = tm.mk_apply(f, &[y]).unwrap();
        let same = tm.mk_eq(x, y).unwrap();
        let differ = tm.mk_term(TermKind::Distinct, &[fx, fy], &[]).unwrap();
        let mut engine = BitblastEngine::new(&Options::default());
        assert_eq!(check(&mut tm, &mut engine, &[same, differ]), SatResult::Unsat);
        assert_eq!(check(&mut tm, &mut engine, &[differ]), SatResult::Sat);
        let model = engine.assignment(&mut tm).unwrap();
        let v = Evaluator::new().eval(&tm, &model, differ).unwrap();
        assert_eq!(v.as_bool(), Some(true));
    }

    #[test]
    fn test_quantified_roots_are_declined() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let v = tm.mk_var(s, Some("v")).unwrap();
        let body = tm.mk_eq(v, v).unwrap();
        let all = tm.mk_term(TermKind::Forall, &[v, body], &[]).unwrap();
        let mut engine = BitblastEngine::new(&Options::default());
        assert!(!engine.try_assert(&mut tm, all).unwrap());
    }
}
