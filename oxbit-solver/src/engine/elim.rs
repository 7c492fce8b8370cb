//! Reduction of arrays and uninterpreted functions to scalar terms
//!
//! Reads are pushed through stores, if-then-else and constant arrays down
//! to reads of array constants, and each such base read becomes a fresh
//! scalar constant. Applications of function constants become fresh
//! constants as well. The reduction is completed by lemmas:
//!
//! - read congruence: `i = j -> a[i] = a[j]` for every pair of base reads
//! - extensionality: an array equality is a fresh Boolean `e` with
//!   `e -> a[i] = b[i]` for every index `i` of the index sort and
//!   `!e -> a[w] != b[w]` for a fresh witness index `w`
//! - function congruence, added eagerly or on demand by the engine
//!
//! Applications of lambdas are beta-reduced and applications of
//! if-then-else heads are pushed into the branches. Arrays of arrays and
//! functions returning arrays are not supported.

use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::rewrite::beta_reduce;
use oxbit_core::sort::{SortId, SortKind};
use oxbit_core::{OxbitError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Argument tuple of an application
pub type AppArgs = SmallVec<[TermId; 4]>;

/// An array equality replaced by a Boolean constant
#[derive(Debug, Clone, Copy)]
pub struct ArrayEq {
    /// Boolean constant standing for the equality
    pub lit: TermId,
    /// Left array term
    pub lhs: TermId,
    /// Right array term
    pub rhs: TermId,
    witness: TermId,
}

#[derive(Debug, Clone, Copy)]
enum Work {
    EqAtIndex(usize, TermId),
    Witness(usize),
}

/// Counters of the reduction
#[derive(Debug, Clone, Default)]
pub struct ElimStats {
    /// Base reads introduced
    pub reads: u64,
    /// Array equalities abstracted
    pub array_eqs: u64,
    /// Function applications abstracted
    pub apps: u64,
    /// Lemmas produced
    pub lemmas: u64,
}

/// Incremental array and function reducer
#[derive(Debug, Default)]
pub struct TheoryElim {
    eager_ackermann: bool,
    cache: FxHashMap<TermId, TermId>,
    reads: FxHashMap<(TermId, TermId), TermId>,
    reads_of: FxHashMap<TermId, Vec<(TermId, TermId)>>,
    indices: FxHashMap<SortId, Vec<TermId>>,
    index_set: FxHashSet<TermId>,
    array_eqs: Vec<ArrayEq>,
    array_eq_lits: FxHashMap<(TermId, TermId), TermId>,
    eqs_by_sort: FxHashMap<SortId, Vec<usize>>,
    apps: FxHashMap<TermId, Vec<(AppArgs, TermId)>>,
    app_cache: FxHashMap<(TermId, AppArgs), TermId>,
    work: Vec<Work>,
    lemmas: Vec<TermId>,
    stats: ElimStats,
}

impl TheoryElim {
    /// Reducer; `eager_ackermann` adds function congruence lemmas up front
    #[must_use]
    pub fn new(eager_ackermann: bool) -> Self {
        Self {
            eager_ackermann,
            ..Self::default()
        }
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> &ElimStats {
        &self.stats
    }

    /// Base reads per array constant
    pub fn array_reads(&self) -> impl Iterator<Item = (TermId, &[(TermId, TermId)])> {
        self.reads_of.iter().map(|(&a, r)| (a, r.as_slice()))
    }

    /// Base reads of one array constant
    #[must_use]
    pub fn reads_of(&self, array: TermId) -> &[(TermId, TermId)] {
        self.reads_of.get(&array).map_or(&[], Vec::as_slice)
    }

    /// Abstracted applications of one function constant
    #[must_use]
    pub fn applications_of(&self, f: TermId) -> &[(AppArgs, TermId)] {
        self.apps.get(&f).map_or(&[], Vec::as_slice)
    }

    /// Abstracted array equalities
    #[must_use]
    pub fn array_eqs(&self) -> &[ArrayEq] {
        &self.array_eqs
    }

    /// Abstracted applications per function constant
    pub fn applications(&self) -> impl Iterator<Item = (TermId, &[(AppArgs, TermId)])> {
        self.apps.iter().map(|(&f, a)| (f, a.as_slice()))
    }

    /// Scalar, array-free and function-free equivalent of `root`
    ///
    /// # Errors
    ///
    /// Returns an unsupported-feature error for nested arrays, functions
    /// returning arrays, quantifiers and stray lambdas.
    pub fn process(&mut self, tm: &mut TermManager, root: TermId) -> Result<TermId> {
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if self.cache.contains_key(&id) {
                continue;
            }
            if !expanded {
                stack.push((id, true));
                let term = &tm[id];
                let children: &[TermId] = match term.kind {
                    TermKind::Apply => &term.args[1..],
                    TermKind::Lambda | TermKind::Forall | TermKind::Exists => &[],
                    _ => &term.args,
                };
                for &c in children.iter().rev() {
                    if !self.cache.contains_key(&c) {
                        stack.push((c, false));
                    }
                }
                continue;
            }
            let r = self.process_node(tm, id)?;
            self.cache.insert(id, r);
        }
        self.cache
            .get(&root)
            .copied()
            .ok_or_else(|| OxbitError::state(format!("{root} was not reduced")))
    }

    fn mapped(&self, t: TermId) -> Result<TermId> {
        self.cache
            .get(&t)
            .copied()
            .ok_or_else(|| OxbitError::state(format!("{t} was not reduced")))
    }

    fn process_node(&mut self, tm: &mut TermManager, id: TermId) -> Result<TermId> {
        use TermKind as K;
        let term = tm[id].clone();
        match term.kind {
            K::Value | K::Const => Ok(id),
            K::Var => Err(OxbitError::unsupported("free bound variable")),
            K::Lambda => Err(OxbitError::unsupported("lambda outside an application")),
            K::Forall | K::Exists => Err(OxbitError::unsupported(
                "quantifiers are handled by the quantifier engine",
            )),
            K::ArraySelect => {
                let a = self.mapped(term.args[0])?;
                let i = self.mapped(term.args[1])?;
                self.read(tm, a, i)
            }
            K::Apply => {
                let mut args = AppArgs::new();
                for &a in &term.args[1..] {
                    args.push(self.mapped(a)?);
                }
                self.apply(tm, term.args[0], &args)
            }
            K::Equal | K::Distinct if tm.sort(tm.sort_of(term.args[0])).is_array() => {
                let mut args = Vec::with_capacity(term.args.len());
                for &a in &term.args {
                    args.push(self.mapped(a)?);
                }
                if term.kind == K::Equal {
                    let mut lits = Vec::new();
                    for w in args.windows(2) {
                        lits.push(self.array_eq(tm, w[0], w[1])?);
                    }
                    tm.mk_and(&lits)
                } else {
                    let mut lits = Vec::new();
                    for i in 0..args.len() {
                        for j in i + 1..args.len() {
                            let e = self.array_eq(tm, args[i], args[j])?;
                            lits.push(tm.mk_not(e)?);
                        }
                    }
                    tm.mk_and(&lits)
                }
            }
            _ => {
                let mut args = Vec::with_capacity(term.args.len());
                for &a in &term.args {
                    args.push(self.mapped(a)?);
                }
                if term.kind == K::ArrayStore {
                    self.register_index(tm, args[1]);
                }
                tm.rebuild(id, &args)
            }
        }
    }

    fn read(&mut self, tm: &mut TermManager, array: TermId, index: TermId) -> Result<TermId> {
        // walk the store chain iteratively, branch on ite recursively
        let mut layers: Vec<(TermId, TermId)> = Vec::new();
        let mut cur = array;
        let base = loop {
            let t = &tm[cur];
            match t.kind {
                TermKind::ArrayStore => {
                    let (inner, j, e) = (t.args[0], t.args[1], t.args[2]);
                    if j == index {
                        break e;
                    }
                    layers.push((j, e));
                    cur = inner;
                }
                TermKind::ConstArray => break t.args[0],
                TermKind::Ite => {
                    let (c, x, y) = (t.args[0], t.args[1], t.args[2]);
                    let rx = self.read(tm, x, index)?;
                    let ry = self.read(tm, y, index)?;
                    break tm.mk_ite(c, rx, ry)?;
                }
                TermKind::Const => break self.base_read(tm, cur, index)?,
                kind => {
                    return Err(OxbitError::unsupported(format!("reads from '{kind}' arrays")));
                }
            }
        };
        let mut acc = base;
        for &(j, e) in layers.iter().rev() {
            let hit = tm.mk_eq(index, j)?;
            acc = tm.mk_ite(hit, e, acc)?;
        }
        Ok(acc)
    }

    fn base_read(&mut self, tm: &mut TermManager, array: TermId, index: TermId) -> Result<TermId> {
        if let Some(&r) = self.reads.get(&(array, index)) {
            return Ok(r);
        }
        let element = match tm.sort_kind(array) {
            SortKind::Array { element, .. } => *element,
            _ => return Err(OxbitError::type_error("read from a non-array term")),
        };
        if !is_scalar(tm, element) {
            return Err(OxbitError::unsupported("arrays with non-scalar elements"));
        }
        let r = tm.mk_fresh_const(element, "read");
        let previous = self.reads_of.get(&array).cloned().unwrap_or_default();
        for (j, rj) in previous {
            let same = tm.mk_eq(index, j)?;
            let agree = tm.mk_eq(r, rj)?;
            let lemma = tm.mk_implies(same, agree)?;
            self.push_lemma(lemma);
        }
        self.reads_of.entry(array).or_default().push((index, r));
        self.reads.insert((array, index), r);
        self.stats.reads += 1;
        self.register_index(tm, index);
        Ok(r)
    }

    fn register_index(&mut self, tm: &TermManager, index: TermId) {
        if !self.index_set.insert(index) {
            return;
        }
        let sort = tm.sort_of(index);
        self.indices.entry(sort).or_default().push(index);
        if let Some(eqs) = self.eqs_by_sort.get(&sort) {
            for &k in eqs {
                self.work.push(Work::EqAtIndex(k, index));
            }
        }
    }

    fn array_eq(&mut self, tm: &mut TermManager, a: TermId, b: TermId) -> Result<TermId> {
        if a == b {
            return Ok(tm.mk_true());
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&lit) = self.array_eq_lits.get(&key) {
            return Ok(lit);
        }
        let (index, element) = match tm.sort_kind(a) {
            SortKind::Array { index, element } => (*index, *element),
            _ => return Err(OxbitError::type_error("array equality over non-arrays")),
        };
        if !is_scalar(tm, element) || !is_scalar(tm, index) {
            return Err(OxbitError::unsupported("equality of nested arrays"));
        }
        let bool_sort = tm.mk_bool_sort();
        let lit = tm.mk_fresh_const(bool_sort, "arreq");
        let witness = tm.mk_fresh_const(index, "ext");
        let k = self.array_eqs.len();
        self.array_eqs.push(ArrayEq {
            lit,
            lhs: key.0,
            rhs: key.1,
            witness,
        });
        self.array_eq_lits.insert(key, lit);
        self.eqs_by_sort.entry(index).or_default().push(k);
        self.work.push(Work::Witness(k));
        let known = self.indices.get(&index).cloned().unwrap_or_default();
        for i in known {
            self.work.push(Work::EqAtIndex(k, i));
        }
        self.register_index(tm, witness);
        self.stats.array_eqs += 1;
        Ok(lit)
    }

    fn apply(&mut self, tm: &mut TermManager, f: TermId, args: &[TermId]) -> Result<TermId> {
        let head = tm[f].clone();
        match head.kind {
            TermKind::Lambda => {
                let body = beta_reduce(tm, f, args)?
                    .ok_or_else(|| OxbitError::type_error("lambda applied to too many arguments"))?;
                self.process(tm, body)
            }
            TermKind::Ite => {
                let c = self.process(tm, head.args[0])?;
                let x = self.apply(tm, head.args[1], args)?;
                let y = self.apply(tm, head.args[2], args)?;
                tm.mk_ite(c, x, y)
            }
            TermKind::Const => self.fun_app(tm, f, args),
            kind => Err(OxbitError::unsupported(format!("application of a '{kind}' head"))),
        }
    }

    fn fun_app(&mut self, tm: &mut TermManager, f: TermId, args: &[TermId]) -> Result<TermId> {
        let key: AppArgs = args.iter().copied().collect();
        if let Some(&r) = self.app_cache.get(&(f, key.clone())) {
            return Ok(r);
        }
        let codomain = match tm.sort_kind(f) {
            SortKind::Function { codomain, .. } => *codomain,
            _ => return Err(OxbitError::type_error("application of a non-function")),
        };
        if !is_scalar(tm, codomain) {
            return Err(OxbitError::unsupported("functions returning arrays or functions"));
        }
        let r = tm.mk_fresh_const(codomain, "app");
        if self.eager_ackermann {
            let previous = self.apps.get(&f).cloned().unwrap_or_default();
            for (other, ro) in previous {
                let lemma = congruence(tm, &key, r, &other, ro)?;
                self.push_lemma(lemma);
            }
        }
        self.apps.entry(f).or_default().push((key.clone(), r));
        self.app_cache.insert((f, key), r);
        self.stats.apps += 1;
        Ok(r)
    }

    /// Congruence lemma between the `i`-th and `j`-th application of `f`
    ///
    /// # Errors
    ///
    /// Fails for unknown applications.
    pub fn congruence_lemma(&mut self, tm: &mut TermManager, f: TermId, i: usize, j: usize) -> Result<TermId> {
        let apps = self
            .apps
            .get(&f)
            .ok_or_else(|| OxbitError::state("unknown function"))?;
        let (a, ra) = apps.get(i).cloned().ok_or_else(|| OxbitError::state("unknown application"))?;
        let (b, rb) = apps.get(j).cloned().ok_or_else(|| OxbitError::state("unknown application"))?;
        self.stats.lemmas += 1;
        congruence(tm, &a, ra, &b, rb)
    }

    fn push_lemma(&mut self, lemma: TermId) {
        self.stats.lemmas += 1;
        self.lemmas.push(lemma);
    }

    /// Lemmas produced since the last call, all scalar and reduced
    ///
    /// # Errors
    ///
    /// Propagates reduction failures of pending extensionality instances.
    pub fn drain_lemmas(&mut self, tm: &mut TermManager) -> Result<Vec<TermId>> {
        let mut out = Vec::new();
        loop {
            out.append(&mut self.lemmas);
            let Some(work) = self.work.pop() else { break };
            let lemma = match work {
                Work::EqAtIndex(k, i) => {
                    let eq = self.array_eqs[k];
                    let ra = self.read(tm, eq.lhs, i)?;
                    let rb = self.read(tm, eq.rhs, i)?;
                    let agree = tm.mk_eq(ra, rb)?;
                    tm.mk_implies(eq.lit, agree)?
                }
                Work::Witness(k) => {
                    let eq = self.array_eqs[k];
                    let ra = self.read(tm, eq.lhs, eq.witness)?;
                    let rb = self.read(tm, eq.rhs, eq.witness)?;
                    let agree = tm.mk_eq(ra, rb)?;
                    let differ = tm.mk_not(agree)?;
                    tm.mk_or(&[eq.lit, differ])?
                }
            };
            self.stats.lemmas += 1;
            out.push(lemma);
        }
        Ok(out)
    }
}

fn is_scalar(tm: &TermManager, sort: SortId) -> bool {
    let s = tm.sort(sort);
    !s.is_array() && !s.is_fun()
}

fn congruence(tm: &mut TermManager, a: &[TermId], ra: TermId, b: &[TermId], rb: TermId) -> Result<TermId> {
    let mut premises = Vec::with_capacity(a.len());
    for (&x, &y) in a.iter().zip(b) {
        if x != y {
            premises.push(tm.mk_eq(x, y)?);
        }
    }
    let premise = tm.mk_and(&premises)?;
    let agree = tm.mk_eq(ra, rb)?;
    tm.mk_implies(premise, agree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_over_store_chain() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(s, Some("i"));
        let j = tm.mk_const(s, Some("j"));
        let e = tm.mk_const(s, Some("e"));
        let st = tm.mk_store(a, i, e).unwrap();
        let rd = tm.mk_select(st, j).unwrap();
        let mut elim = TheoryElim::new(false);
        let r = elim.process(&mut tm, rd).unwrap();
        assert_eq!(tm[r].kind, TermKind::Ite);
        assert!(!tm.contains_kind(&[r], &[TermKind::ArraySelect, TermKind::ArrayStore]));
        assert_eq!(elim.stats().reads, 1);
    }

    #[test]
    fn test_read_congruence_lemmas() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(s, Some("i"));
        let j = tm.mk_const(s, Some("j"));
        let ri = tm.mk_select(a, i).unwrap();
        let rj = tm.mk_select(a, j).unwrap();
        let ne = tm.mk_term(TermKind::Distinct, &[ri, rj], &[]).unwrap();
        let mut elim = TheoryElim::new(false);
        elim.process(&mut tm, ne).unwrap();
        assert_eq!(elim.drain_lemmas(&mut tm).unwrap().len(), 1);
        assert!(elim.drain_lemmas(&mut tm).unwrap().is_empty());
    }

    #[test]
    fn test_array_equality_instances() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let b = tm.mk_const(arr, Some("b"));
        let i = tm.mk_const(s, Some("i"));
        let eq = tm.mk_eq(a, b).unwrap();
        let ri = tm.mk_select(a, i).unwrap();
        let rbi = tm.mk_select(b, i).unwrap();
        let ne = tm.mk_term(TermKind::Distinct, &[ri, rbi], &[]).unwrap();
        let f = tm.mk_and(&[eq, ne]).unwrap();
        let mut elim = TheoryElim::new(false);
        let r = elim.process(&mut tm, f).unwrap();
        assert!(!tm.contains_kind(&[r], &[TermKind::ArraySelect]));
        let lemmas = elim.drain_lemmas(&mut tm).unwrap();
        // witness lemma plus instances at i and at the witness
        assert!(lemmas.len() >= 3);
        assert_eq!(elim.array_eqs().len(), 1);
    }

    #[test]
    fn test_function_applications() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let fs = tm.mk_fun_sort(&[s], s).unwrap();
        let f = tm.mk_const(fs, Some("f"));
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let fx = tm.mk_apply(f, &[x]).unwrap();
        let fy = tm.mk_apply(f, &[y]).unwrap();
        let ne = tm.mk_term(TermKind::Distinct, &[fx, fy], &[]).unwrap();

        let mut lazy = TheoryElim::new(false);
        lazy.process(&mut tm, ne).unwrap();
        assert!(lazy.drain_lemmas(&mut tm).unwrap().is_empty());
        assert_eq!(lazy.applications().count(), 1);

        let mut eager = TheoryElim::new(true);
        eager.process(&mut tm, ne).unwrap();
        assert_eq!(eager.drain_lemmas(&mut tm).unwrap().len(), 1);
    }
}
