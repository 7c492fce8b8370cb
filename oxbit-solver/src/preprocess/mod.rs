//! Preprocessing of the roots of one check
//!
//! The pipeline works on [`Root`]s: a Boolean term together with the
//! assertions and assumptions it was derived from. Passes that merge
//! information from several roots (substitution of definitions, skeleton
//! propagation) union the origins of everything they used, so the failed
//! roots reported by an engine can be mapped back to an unsat core.
//!
//! Order of the passes, each gated by its option:
//!
//! 1. normalization and splitting of top-level conjunctions
//! 2. lambda extraction from store chains, merging of nested lambda chains,
//!    beta reduction and merging of applications into ite heads
//! 3. variable substitution and skeleton propagation (rewrite level 2)
//! 4. unconstrained-term optimization, ite elimination and slice
//!    elimination (rewrite level 3)
//! 5. a final normalization
//!
//! Array and function elimination happens inside the bit-blasting engine.

mod extract;
mod ite;
mod lambdas;
mod slices;
mod subst;
mod ucopt;

use crate::options::Options;
use oxbit_core::Result;
use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::rewrite::Rewriter;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;

/// Where a root came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// Index into the active assertions
    Assertion(usize),
    /// Index into the pending assumptions
    Assumption(usize),
}

/// Sorted set of origins
pub type Origins = SmallVec<[Origin; 2]>;

/// A Boolean formula handed to an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// The formula
    pub term: TermId,
    /// Assertions and assumptions it depends on; empty for definitions of
    /// fresh constants
    pub origins: Origins,
}

impl Root {
    /// Root derived from exactly one origin
    #[must_use]
    pub fn new(term: TermId, origin: Origin) -> Self {
        let mut origins = Origins::new();
        origins.push(origin);
        Self { term, origins }
    }

    /// Root without origins, used for definitions of fresh constants
    #[must_use]
    pub fn definition(term: TermId) -> Self {
        Self {
            term,
            origins: Origins::new(),
        }
    }

    /// Same origins, different formula
    #[must_use]
    pub fn with_term(&self, term: TermId) -> Self {
        Self {
            term,
            origins: self.origins.clone(),
        }
    }

    /// Add the origins of `other`
    pub fn merge_origins(&mut self, other: &[Origin]) {
        merge_into(&mut self.origins, other);
    }
}

pub(crate) fn merge_into(into: &mut Origins, other: &[Origin]) {
    for &o in other {
        if let Err(pos) = into.binary_search(&o) {
            into.insert(pos, o);
        }
    }
}

/// Counters of one preprocessing run
#[derive(Debug, Clone, Default)]
pub struct PreprocessStats {
    /// Roots entering the pipeline
    pub roots_in: usize,
    /// Roots leaving the pipeline
    pub roots_out: usize,
    /// Store chains replaced by lambdas
    pub extracted_lambdas: u64,
    /// Inner lambdas merged into their enclosing lambda
    pub merged_lambdas: u64,
    /// Applications reduced by beta reduction
    pub beta_reductions: u64,
    /// Applications pushed into ite heads
    pub merged_applications: u64,
    /// Constants replaced by their definition
    pub substitutions: u64,
    /// Literals propagated through the skeleton
    pub skeleton_literals: u64,
    /// Terms replaced by fresh constants because they are unconstrained
    pub unconstrained: u64,
    /// Boolean ites replaced by clauses
    pub ites: u64,
    /// Constants split at their extraction boundaries
    pub sliced: u64,
}

/// Runs the preprocessing passes
#[derive(Debug, Default)]
pub struct Preprocessor {
    stats: PreprocessStats,
}

impl Preprocessor {
    /// Fresh preprocessor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of the last run
    #[must_use]
    pub fn stats(&self) -> &PreprocessStats {
        &self.stats
    }

    /// Preprocess `roots`. A root that reduces to `false` is kept so the
    /// engine can report it; roots that reduce to `true` are dropped.
    ///
    /// # Errors
    ///
    /// Propagates term construction failures.
    pub fn run(
        &mut self,
        tm: &mut TermManager,
        rewriter: &mut Rewriter,
        options: &Options,
        roots: Vec<Root>,
    ) -> Result<Vec<Root>> {
        self.stats = PreprocessStats {
            roots_in: roots.len(),
            ..PreprocessStats::default()
        };
        let mut roots = normalize(tm, rewriter, roots)?;
        if options.extract_lambdas {
            let (next, n) = extract::extract_lambdas(tm, roots)?;
            self.stats.extracted_lambdas = n;
            roots = next;
        }
        if options.merge_lambdas {
            let mut merger = lambdas::LambdaMerger::new();
            roots = map_roots(roots, |t| merger.merge(tm, t))?;
            self.stats.merged_lambdas = merger.merged();
        }
        if options.beta_reduce {
            let mut beta = lambdas::BetaReducer::new(options.merge_lambdas);
            roots = map_roots(roots, |t| beta.reduce(tm, t))?;
            self.stats.beta_reductions = beta.reductions();
            self.stats.merged_applications = beta.merged();
            roots = normalize(tm, rewriter, roots)?;
        }
        if options.basic_preprocessing() && (options.var_subst || options.skeleton_preproc) {
            let defs = subst::collect_definitions(tm, &roots, options.var_subst, options.skeleton_preproc)?;
            self.stats.substitutions = defs.num_constants();
            self.stats.skeleton_literals = defs.num_literals();
            roots = defs.apply(tm, roots)?;
            roots = normalize(tm, rewriter, roots)?;
        }
        if options.full_preprocessing() {
            let quantified = roots
                .iter()
                .any(|r| crate::engine::has_quantifiers(tm, r.term));
            if options.ucopt && !quantified {
                let (next, n) = ucopt::eliminate_unconstrained(tm, roots)?;
                roots = normalize(tm, rewriter, next)?;
                self.stats.unconstrained = n;
            }
            if options.eliminate_ites {
                let (next, n) = ite::eliminate_ites(tm, roots)?;
                roots = normalize(tm, rewriter, next)?;
                self.stats.ites = n;
            }
            if options.eliminate_slices {
                let (next, n) = slices::eliminate_slices(tm, roots)?;
                roots = normalize(tm, rewriter, next)?;
                self.stats.sliced = n;
            }
        }
        if options.normalize {
            rewriter.clear_cache();
            roots = normalize(tm, rewriter, roots)?;
        }
        let roots = dedup(roots);
        self.stats.roots_out = roots.len();
        debug!(
            roots_in = self.stats.roots_in,
            roots_out = self.stats.roots_out,
            extracted_lambdas = self.stats.extracted_lambdas,
            substitutions = self.stats.substitutions,
            unconstrained = self.stats.unconstrained,
            "preprocessing finished"
        );
        Ok(roots)
    }
}

fn map_roots(roots: Vec<Root>, mut f: impl FnMut(TermId) -> Result<TermId>) -> Result<Vec<Root>> {
    roots
        .into_iter()
        .map(|r| {
            let t = f(r.term)?;
            Ok(r.with_term(t))
        })
        .collect()
}

/// Rewrite every root, split conjunctions and drop `true`
pub(crate) fn normalize(tm: &mut TermManager, rewriter: &mut Rewriter, roots: Vec<Root>) -> Result<Vec<Root>> {
    let mut out = Vec::with_capacity(roots.len());
    for root in roots {
        let t = rewriter.normalize(tm, root.term)?;
        let mut stack = vec![t];
        while let Some(t) = stack.pop() {
            let term = &tm[t];
            match term.kind {
                TermKind::And => stack.extend(term.args.iter().rev().copied()),
                _ if tm.bool_value(t) == Some(true) => {}
                _ => out.push(root.with_term(t)),
            }
        }
    }
    Ok(out)
}

/// Merge roots with the same formula
fn dedup(roots: Vec<Root>) -> Vec<Root> {
    let mut seen: FxHashSet<TermId> = FxHashSet::default();
    let mut out: Vec<Root> = Vec::with_capacity(roots.len());
    for root in roots {
        if seen.insert(root.term) {
            out.push(root);
        } else if let Some(prev) = out.iter_mut().find(|r| r.term == root.term)
            && prev.origins.len() > root.origins.len()
        {
            // the smaller provenance is enough to justify the formula
            prev.origins = root.origins;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tm: &mut TermManager, options: &Options, terms: &[TermId]) -> Vec<Root> {
        let roots = terms
            .iter()
            .enumerate()
            .map(|(i, &t)| Root::new(t, Origin::Assertion(i)))
            .collect();
        let mut rw = Rewriter::new(options.rewrite_level);
        Preprocessor::new().run(tm, &mut rw, options, roots).unwrap()
    }

    #[test]
    fn test_conjunctions_are_split() {
        let mut tm = TermManager::new();
        let b = tm.mk_bool_sort();
        let p = tm.mk_const(b, Some("p"));
        let q = tm.mk_const(b, Some("q"));
        let both = tm.mk_and(&[p, q]).unwrap();
        let t = tm.mk_true();
        let roots = run(&mut tm, &Options::minimal(), &[both, t]);
        let terms: Vec<_> = roots.iter().map(|r| r.term).collect();
        assert_eq!(terms, vec![p, q]);
        assert!(roots.iter().all(|r| r.origins.as_slice() == [Origin::Assertion(0)]));
    }

    #[test]
    fn test_definition_origins_flow_into_users() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let one = tm.mk_bv_one(s).unwrap();
        let def = tm.mk_eq(x, one).unwrap();
        let lt = tm.mk_term(TermKind::BvUlt, &[y, x], &[]).unwrap();
        let roots = run(&mut tm, &Options::default(), &[def, lt]);
        let user = roots
            .iter()
            .find(|r| r.origins.contains(&Origin::Assertion(1)))
            .unwrap();
        assert!(!tm.occurs(x, user.term));
        assert!(user.origins.contains(&Origin::Assertion(0)));
    }

    #[test]
    fn test_false_root_survives() {
        let mut tm = TermManager::new();
        let b = tm.mk_bool_sort();
        let p = tm.mk_const(b, Some("p"));
        let np = tm.mk_not(p).unwrap();
        let both = tm.mk_and(&[p, np]).unwrap();
        let roots = run(&mut tm, &Options::default(), &[both]);
        assert!(roots.iter().any(|r| tm.bool_value(r.term) == Some(false)));
    }

    #[test]
    fn test_merge_origins_sorted() {
        let mut tm = TermManager::new();
        let t = tm.mk_true();
        let mut r = Root::new(t, Origin::Assumption(1));
        r.merge_origins(&[Origin::Assertion(3), Origin::Assumption(1), Origin::Assertion(0)]);
        assert_eq!(
            r.origins.as_slice(),
            [Origin::Assertion(0), Origin::Assertion(3), Origin::Assumption(1)]
        );
    }

    #[test]
    fn test_store_chain_reads_become_range_checks() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let j = tm.mk_const(s, Some("j"));
        let seven = tm.mk_bv_value_u64(s, 7).unwrap();
        let mut chain = a;
        for k in 0..8 {
            let idx = tm.mk_bv_value_u64(s, 100 + k).unwrap();
            chain = tm.mk_store(chain, idx, seven).unwrap();
        }
        let read = tm.mk_select(chain, j).unwrap();
        let eq = tm.mk_eq(read, seven).unwrap();

        let mut options = Options::default();
        let mut pre = Preprocessor::new();
        let roots = vec![Root::new(eq, Origin::Assertion(0))];
        let mut rw = Rewriter::new(options.rewrite_level);
        let out = pre.run(&mut tm, &mut rw, &options, roots.clone()).unwrap();
        assert_eq!(pre.stats().extracted_lambdas, 1);
        assert!(!tm.contains_kind(&out.iter().map(|r| r.term).collect::<Vec<_>>(), &[TermKind::ArrayStore]));

        options.extract_lambdas = false;
        let mut pre = Preprocessor::new();
        let mut rw = Rewriter::new(options.rewrite_level);
        pre.run(&mut tm, &mut rw, &options, roots).unwrap();
        assert_eq!(pre.stats().extracted_lambdas, 0);
    }
}
