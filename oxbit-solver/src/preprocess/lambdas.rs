//! Beta reduction and application merging
//!
//! Applications of lambdas are replaced by the instantiated body. With
//! merging enabled an application whose head is an `ite` over functions is
//! pushed into the branches, `(ite c f g)(a) ~> ite c f(a) g(a)`, which
//! exposes further redexes when the branches are lambdas.
//!
//! [`LambdaMerger`] works on lambdas that are not applied yet: a lambda
//! whose body applies another lambda, `lambda x. (lambda y. t)(s)`, is
//! merged into one lambda `lambda x. t[y := s]`, so a chain of lambdas built
//! by nested definitions or by lambda extraction is instantiated once.

use oxbit_core::Result;
use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::rewrite::beta_reduce;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Debug, Default)]
pub(crate) struct BetaReducer {
    merge: bool,
    cache: FxHashMap<TermId, TermId>,
    reductions: u64,
    merged: u64,
}

impl BetaReducer {
    pub(crate) fn new(merge: bool) -> Self {
        Self {
            merge,
            ..Self::default()
        }
    }

    pub(crate) fn reductions(&self) -> u64 {
        self.reductions
    }

    pub(crate) fn merged(&self) -> u64 {
        self.merged
    }

    pub(crate) fn reduce(&mut self, tm: &mut TermManager, root: TermId) -> Result<TermId> {
        if let Some(&r) = self.cache.get(&root) {
            return Ok(r);
        }
        for id in tm.post_order(&[root]) {
            if self.cache.contains_key(&id) {
                continue;
            }
            let args: SmallVec<[TermId; 4]> = tm[id]
                .args
                .iter()
                .map(|a| self.cache.get(a).copied().unwrap_or(*a))
                .collect();
            let rebuilt = tm.rebuild(id, &args)?;
            let result = match self.step(tm, rebuilt)? {
                Some(next) => self.reduce(tm, next)?,
                None => rebuilt,
            };
            self.cache.insert(id, result);
        }
        Ok(self.cache.get(&root).copied().unwrap_or(root))
    }

    /// One reduction at the top of `t`
    fn step(&mut self, tm: &mut TermManager, t: TermId) -> Result<Option<TermId>> {
        let term = &tm[t];
        if term.kind != TermKind::Apply {
            return Ok(None);
        }
        let head = term.args[0];
        let args: SmallVec<[TermId; 4]> = term.args[1..].iter().copied().collect();
        match tm[head].kind {
            TermKind::Lambda => {
                let r = beta_reduce(tm, head, &args)?;
                if r.is_some() {
                    self.reductions += 1;
                }
                Ok(r)
            }
            TermKind::Ite if self.merge => {
                let (c, f, g) = {
                    let ite = &tm[head];
                    (ite.args[0], ite.args[1], ite.args[2])
                };
                let fa = tm.mk_apply(f, &args)?;
                let ga = tm.mk_apply(g, &args)?;
                self.merged += 1;
                Ok(Some(tm.mk_ite(c, fa, ga)?))
            }
            _ => Ok(None),
        }
    }
}

/// Merges nested lambda chains into single lambdas
#[derive(Debug, Default)]
pub(crate) struct LambdaMerger {
    cache: FxHashMap<TermId, TermId>,
    merged: u64,
}

impl LambdaMerger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inner lambdas reduced away
    pub(crate) fn merged(&self) -> u64 {
        self.merged
    }

    pub(crate) fn merge(&mut self, tm: &mut TermManager, root: TermId) -> Result<TermId> {
        for id in tm.post_order(&[root]) {
            if self.cache.contains_key(&id) {
                continue;
            }
            let args: SmallVec<[TermId; 4]> = tm[id]
                .args
                .iter()
                .map(|a| self.cache.get(a).copied().unwrap_or(*a))
                .collect();
            let mut result = tm.rebuild(id, &args)?;
            if tm[result].kind == TermKind::Lambda {
                result = self.merge_body(tm, result)?;
            }
            self.cache.insert(id, result);
        }
        Ok(self.cache.get(&root).copied().unwrap_or(root))
    }

    fn merge_body(&mut self, tm: &mut TermManager, lambda: TermId) -> Result<TermId> {
        let args: SmallVec<[TermId; 4]> = tm[lambda].args.iter().copied().collect();
        let Some((&body, params)) = args.split_last() else {
            return Ok(lambda);
        };
        if !tm.contains_kind(&[body], &[TermKind::Apply]) {
            return Ok(lambda);
        }
        let mut inner = BetaReducer::new(false);
        let reduced = inner.reduce(tm, body)?;
        if reduced == body {
            return Ok(lambda);
        }
        self.merged += inner.reductions();
        let mut merged: SmallVec<[TermId; 4]> = params.iter().copied().collect();
        merged.push(reduced);
        tm.mk_term(TermKind::Lambda, &merged, &[])
    }
}
