//! Fixpoint term rewriting
//!
//! The [`Rewriter`] normalizes terms bottom-up: children first, then the rule
//! families are tried at the node until none applies. A rule result is
//! normalized again, so every term handed back is a fixpoint and
//! `normalize(normalize(t)) == normalize(t)`.
//!
//! Rule families:
//! - [`BoolRules`]: connectives, `ite`, equality, sugar elimination
//! - [`BvRules`]: bit-vector identities, slices, comparison sugar
//! - [`FpRules`]: floating-point comparison and subtraction sugar
//! - [`ArrayRules`]: beta reduction, read-over-write, write-over-write
//!
//! Constant folding runs before every family.
//!
//! ## References
//!
//! - Brummayer, Biere. "Boolector: An Efficient SMT Solver for Bit-Vectors
//!   and Arrays" (TACAS 2009)

mod array;
mod boolean;
mod bv;
mod fp;

pub use self::array::{ArrayRules, beta_reduce};
pub use self::boolean::BoolRules;
pub use self::bv::BvRules;
pub use self::fp::FpRules;

use crate::ast::{TermId, TermKind, TermManager};
use crate::error::Result;
use crate::fold::fold;
use crate::value::Value;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

/// Outcome of applying a rule family at one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteResult {
    /// The node was replaced
    Changed(TermId),
    /// No rule applied
    Unchanged,
}

/// A family of local rewrite rules
pub trait RewriteRule {
    /// Name of the family, for statistics
    fn name(&self) -> &'static str;

    /// Try the family's rules at `id`, whose children are already normalized
    fn apply(&self, tm: &mut TermManager, id: TermId) -> Result<RewriteResult>;
}

/// Rewriting statistics
#[derive(Debug, Clone, Default)]
pub struct RewriteStats {
    /// Nodes visited
    pub visited: u64,
    /// Rule applications that changed a node
    pub rewrites: u64,
    /// Constant folds
    pub folds: u64,
    /// Cache hits
    pub cache_hits: u64,
}

/// Normalizing rewriter
pub struct Rewriter {
    level: u8,
    rules: Vec<Box<dyn RewriteRule>>,
    cache: FxHashMap<TermId, TermId>,
    stats: RewriteStats,
}

impl std::fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rewriter")
            .field("level", &self.level)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("cache", &self.cache.len())
            .finish()
    }
}

impl Rewriter {
    /// Rewriter at `level` (0 disables rewriting)
    #[must_use]
    pub fn new(level: u8) -> Self {
        Self {
            level,
            rules: vec![
                Box::new(BoolRules),
                Box::new(BvRules),
                Box::new(FpRules),
                Box::new(ArrayRules),
            ],
            cache: FxHashMap::default(),
            stats: RewriteStats::default(),
        }
    }

    /// Configured level
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Statistics
    #[must_use]
    pub fn stats(&self) -> &RewriteStats {
        &self.stats
    }

    /// Forget memoized results
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Normalize `root`
    pub fn normalize(&mut self, tm: &mut TermManager, root: TermId) -> Result<TermId> {
        if self.level == 0 {
            return Ok(root);
        }
        let mut stack: Vec<(TermId, bool)> = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if self.cache.contains_key(&id) {
                self.stats.cache_hits += 1;
                continue;
            }
            if !expanded {
                stack.push((id, true));
                for &a in tm[id].args.iter().rev() {
                    if !self.cache.contains_key(&a) {
                        stack.push((a, false));
                    }
                }
                continue;
            }
            self.stats.visited += 1;
            let args: SmallVec<[TermId; 4]> = tm[id]
                .args
                .iter()
                .map(|a| self.cache.get(a).copied().unwrap_or(*a))
                .collect();
            let rebuilt = tm.rebuild(id, &args)?;
            let result = match self.rewrite_node(tm, rebuilt)? {
                RewriteResult::Changed(next) if next != rebuilt => self.normalize(tm, next)?,
                _ => rebuilt,
            };
            self.cache.insert(id, result);
            self.cache.insert(rebuilt, result);
            self.cache.insert(result, result);
        }
        Ok(self.cache.get(&root).copied().unwrap_or(root))
    }

    /// Normalize several roots
    pub fn normalize_all(&mut self, tm: &mut TermManager, roots: &[TermId]) -> Result<Vec<TermId>> {
        roots.iter().map(|&r| self.normalize(tm, r)).collect()
    }

    fn rewrite_node(&mut self, tm: &mut TermManager, id: TermId) -> Result<RewriteResult> {
        if let Some(v) = fold_node(tm, id)? {
            self.stats.folds += 1;
            return Ok(RewriteResult::Changed(v));
        }
        for rule in &self.rules {
            if let RewriteResult::Changed(r) = rule.apply(tm, id)?
                && r != id
            {
                self.stats.rewrites += 1;
                trace!(rule = rule.name(), from = %id, to = %r, "rewrite");
                return Ok(RewriteResult::Changed(r));
            }
        }
        Ok(RewriteResult::Unchanged)
    }
}

/// Fold `id` if all its operands are values
fn fold_node(tm: &mut TermManager, id: TermId) -> Result<Option<TermId>> {
    let term = &tm[id];
    if term.args.is_empty() || term.kind == TermKind::Value {
        return Ok(None);
    }
    let mut values: SmallVec<[Value; 4]> = SmallVec::new();
    for &a in &term.args {
        match tm.value_of(a) {
            Some(v) => values.push(v.clone()),
            None => return Ok(None),
        }
    }
    match fold(term.kind, &term.indices, &values) {
        Some(v) => Ok(Some(tm.mk_value(v)?)),
        None => Ok(None),
    }
}

/// Shorthand for rule bodies: `kind(args)` with no indices
pub(crate) fn mk(tm: &mut TermManager, kind: TermKind, args: &[TermId]) -> Result<TermId> {
    tm.mk_term(kind, args, &[])
}

/// Changed result
pub(crate) fn changed(id: TermId) -> Result<RewriteResult> {
    Ok(RewriteResult::Changed(id))
}

/// Unchanged result
pub(crate) fn unchanged() -> Result<RewriteResult> {
    Ok(RewriteResult::Unchanged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_zero_is_identity() {
        let mut tm = TermManager::new();
        let t = tm.mk_true();
        let n = tm.mk_not(t).unwrap();
        let mut rw = Rewriter::new(0);
        assert_eq!(rw.normalize(&mut tm, n).unwrap(), n);
    }

    #[test]
    fn test_folding() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let a = tm.mk_bv_value_u64(bv8, 200).unwrap();
        let b = tm.mk_bv_value_u64(bv8, 100).unwrap();
        let s = tm.mk_term(TermKind::BvAdd, &[a, b], &[]).unwrap();
        let mut rw = Rewriter::new(1);
        let r = rw.normalize(&mut tm, s).unwrap();
        assert_eq!(tm.value_of(r).and_then(Value::as_bv).and_then(|v| v.to_u64()), Some(44));
        assert!(rw.stats().folds >= 1);
    }

    #[test]
    fn test_scenario_simplifies_to_constant() {
        // x + 1 = 0 and x = 255 is not decided by rewriting alone
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let one = tm.mk_bv_one(bv8).unwrap();
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let add = tm.mk_term(TermKind::BvAdd, &[x, one], &[]).unwrap();
        let eq = tm.mk_eq(add, zero).unwrap();
        let mut rw = Rewriter::new(3);
        let r = rw.normalize(&mut tm, eq).unwrap();
        assert!(!tm.is_value(r));
        assert_eq!(rw.normalize(&mut tm, r).unwrap(), r);
    }
}
