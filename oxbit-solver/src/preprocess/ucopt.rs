//! Unconstrained-term optimization
//!
//! A constant with a single occurrence can take any value, and so can some
//! of its parents: `x + t`, `x = t` or `extract(x)` range over their whole
//! sort when `x` does. Such terms are replaced by fresh constants, which
//! frees their own parents in turn. The result is equisatisfiable but the
//! models of the fresh constants say nothing about the original ones, which
//! is why the pass is incompatible with model production.

use super::Root;
use oxbit_core::Result;
use oxbit_core::ast::{SubstMap, TermId, TermKind, TermManager};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

pub(crate) fn eliminate_unconstrained(tm: &mut TermManager, roots: Vec<Root>) -> Result<(Vec<Root>, u64)> {
    let terms: Vec<TermId> = roots.iter().map(|r| r.term).collect();
    if tm.contains_kind(&terms, &[TermKind::Lambda]) {
        return Ok((roots, 0));
    }
    let order = tm.post_order(&terms);
    let mut occurrences: FxHashMap<TermId, u32> = FxHashMap::default();
    for &t in &terms {
        *occurrences.entry(t).or_default() += 1;
    }
    for &t in &order {
        for &a in &tm[t].args {
            *occurrences.entry(a).or_default() += 1;
        }
    }
    let once = |t: TermId| occurrences.get(&t).copied().unwrap_or(0) == 1;

    let mut unconstrained: FxHashSet<TermId> = FxHashSet::default();
    let mut replace: Vec<TermId> = Vec::new();
    for &t in &order {
        let term = &tm[t];
        let scalar = tm.sort(term.sort).is_bool() || tm.sort(term.sort).is_bv();
        if !scalar {
            continue;
        }
        if term.kind == TermKind::Const {
            if once(t) {
                unconstrained.insert(t);
            }
            continue;
        }
        let free = |a: &TermId| unconstrained.contains(a);
        let is_free = match term.kind {
            TermKind::Not | TermKind::BvNot | TermKind::BvNeg | TermKind::BvInc | TermKind::BvDec => {
                free(&term.args[0])
            }
            TermKind::BvExtract => free(&term.args[0]),
            TermKind::BvAdd | TermKind::BvSub | TermKind::BvXor | TermKind::BvXnor | TermKind::Xor | TermKind::Iff => {
                term.args.iter().any(free)
            }
            TermKind::Equal => term.args.len() == 2 && term.args.iter().any(free),
            TermKind::BvConcat => term.args.iter().all(free),
            TermKind::Ite => free(&term.args[1]) && free(&term.args[2]),
            _ => false,
        };
        if is_free {
            replace.push(t);
            if once(t) {
                unconstrained.insert(t);
            }
        }
    }
    if replace.is_empty() {
        return Ok((roots, 0));
    }
    let mut map = SubstMap::default();
    for &t in &replace {
        let sort = tm.sort_of(t);
        let fresh = tm.mk_fresh_const(sort, "uc");
        map.insert(t, fresh);
    }
    trace!(replaced = replace.len(), "unconstrained terms");
    let new_terms = tm.substitute_all(&terms, &map)?;
    let out = roots
        .iter()
        .zip(new_terms)
        .map(|(r, t)| r.with_term(t))
        .collect();
    Ok((out, replace.len() as u64))
}

#[cfg(test)]
mod tests {
    use super::super::Origin;
    use super::*;

    #[test]
    fn test_single_occurrence_frees_parents() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let k = tm.mk_bv_value_u64(s, 3).unwrap();
        let sum = tm.mk_term(TermKind::BvAdd, &[x, y], &[]).unwrap();
        let eq = tm.mk_eq(sum, k).unwrap();
        let lt = tm.mk_term(TermKind::BvUlt, &[y, k], &[]).unwrap();
        let roots = vec![Root::new(eq, Origin::Assertion(0)), Root::new(lt, Origin::Assertion(1))];
        let (out, n) = eliminate_unconstrained(&mut tm, roots).unwrap();
        assert_eq!(n, 2);
        // the equality itself became a fresh Boolean constant
        assert!(tm.is_const(out[0].term));
        assert_eq!(out[1].term, lt);
    }

    #[test]
    fn test_shared_constant_is_kept() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let k = tm.mk_bv_value_u64(s, 3).unwrap();
        let sum = tm.mk_term(TermKind::BvAdd, &[x, x], &[]).unwrap();
        let eq = tm.mk_eq(sum, k).unwrap();
        let roots = vec![Root::new(eq, Origin::Assertion(0))];
        let (out, n) = eliminate_unconstrained(&mut tm, roots).unwrap();
        assert_eq!(n, 0);
        assert_eq!(out[0].term, eq);
    }
}
