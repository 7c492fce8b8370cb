//! Lambda extraction from store chains
//!
//! A run of stores at consecutive indices `b + m, b + m + 1, ...` that all
//! write the same element is a memset; a run that writes
//! `select(src, b' + k + d)` at index `b + k` is a memcpy. Reads of such a
//! chain become applications of one lambda over the run:
//!
//! ```text
//! memset: lambda j. ite(j - (b + m) <u n, v, select(rest, j))
//! memcpy: lambda j. ite(j - (b + m) <u n, select(src, j - (b + m) + (b' + m + d)), select(rest, j))
//! ```
//!
//! Beta reduction then turns every read into one range check instead of a
//! comparison against each store index.

use super::Root;
use oxbit_core::Result;
use oxbit_core::ast::{SubstMap, TermId, TermKind, TermManager};
use oxbit_core::value::{BitVec, Value};
use rustc_hash::FxHashMap;

/// Shortest run worth a lambda
const MIN_RUN: usize = 2;

/// `base + offset`, with `base = None` for constant indices
#[derive(Debug, Clone, PartialEq, Eq)]
struct Offset {
    base: Option<TermId>,
    offset: BitVec,
}

fn split_offset(tm: &TermManager, t: TermId) -> Option<Offset> {
    if let Some(v) = tm.value_of(t).and_then(Value::as_bv) {
        return Some(Offset {
            base: None,
            offset: v.clone(),
        });
    }
    let width = tm.bv_width(t)?;
    let term = &tm[t];
    if term.kind == TermKind::BvAdd && term.args.len() == 2 {
        for (c, b) in [(term.args[0], term.args[1]), (term.args[1], term.args[0])] {
            if let Some(v) = tm.value_of(c).and_then(Value::as_bv) {
                return Some(Offset {
                    base: Some(b),
                    offset: v.clone(),
                });
            }
        }
    }
    Some(Offset {
        base: Some(t),
        offset: BitVec::zero(width),
    })
}

#[derive(Debug)]
struct Write {
    index: Offset,
    value: TermId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Memset,
    Memcpy,
}

/// Smallest offset when the offsets are pairwise distinct and contiguous
fn contiguous(offsets: &[&BitVec]) -> Option<BitVec> {
    let min = offsets.iter().copied().min_by(|a, b| a.value().cmp(b.value()))?.clone();
    let mut seen = vec![false; offsets.len()];
    for o in offsets {
        let k = o.sub(&min).to_u64()? as usize;
        if k >= seen.len() || seen[k] {
            return None;
        }
        seen[k] = true;
    }
    Some(min)
}

/// Source array, source base and distance of a memcpy value
fn copy_source(tm: &TermManager, w: &Write) -> Option<(TermId, Option<TermId>, BitVec)> {
    let term = &tm[w.value];
    if term.kind != TermKind::ArraySelect {
        return None;
    }
    let src = split_offset(tm, term.args[1])?;
    if src.offset.width() != w.index.offset.width() {
        return None;
    }
    Some((term.args[0], src.base, src.offset.sub(&w.index.offset)))
}

fn classify(tm: &TermManager, run: &[Write]) -> Option<Pattern> {
    let first = run.first()?;
    if run.iter().any(|w| w.index.base != first.index.base) {
        return None;
    }
    let offsets: Vec<&BitVec> = run.iter().map(|w| &w.index.offset).collect();
    contiguous(&offsets)?;
    if run.iter().all(|w| w.value == first.value) {
        return Some(Pattern::Memset);
    }
    let source = copy_source(tm, first)?;
    run.iter()
        .all(|w| copy_source(tm, w).as_ref() == Some(&source))
        .then_some(Pattern::Memcpy)
}

fn mk_offset(tm: &mut TermManager, base: Option<TermId>, offset: &BitVec) -> Result<TermId> {
    match base {
        None => tm.mk_value(Value::BitVec(offset.clone())),
        Some(b) if offset.is_zero() => Ok(b),
        Some(b) => {
            let k = tm.mk_value(Value::BitVec(offset.clone()))?;
            tm.mk_term(TermKind::BvAdd, &[b, k], &[])
        }
    }
}

/// Lambda for the longest extractable run at the top of `chain`
fn extract(tm: &mut TermManager, chain: TermId) -> Result<Option<TermId>> {
    let mut writes = Vec::new();
    let mut below = Vec::new();
    let mut cur = chain;
    while tm[cur].kind == TermKind::ArrayStore {
        let (a, i, v) = (tm[cur].args[0], tm[cur].args[1], tm[cur].args[2]);
        let Some(index) = split_offset(tm, i) else {
            break;
        };
        writes.push(Write { index, value: v });
        below.push(a);
        cur = a;
    }
    let Some((n, pattern)) = (MIN_RUN..=writes.len())
        .rev()
        .find_map(|n| classify(tm, &writes[..n]).map(|p| (n, p)))
    else {
        return Ok(None);
    };
    let run = &writes[..n];
    let rest = below[n - 1];
    let offsets: Vec<&BitVec> = run.iter().map(|w| &w.index.offset).collect();
    let Some(min) = contiguous(&offsets) else {
        return Ok(None);
    };
    let width = min.width();

    let index_sort = tm.sort_of(tm[chain].args[1]);
    let j = tm.mk_fresh_var(index_sort, "j")?;
    let start = mk_offset(tm, run[0].index.base, &min)?;
    let distance = tm.mk_term(TermKind::BvSub, &[j, start], &[])?;
    let covers_all = width < 64 && n as u64 == 1u64 << width;
    let inside = if covers_all {
        tm.mk_true()
    } else {
        let len = tm.mk_value(Value::BitVec(BitVec::from_u64(width, n as u64)))?;
        tm.mk_term(TermKind::BvUlt, &[distance, len], &[])?
    };
    let hit = match pattern {
        Pattern::Memset => run[0].value,
        Pattern::Memcpy => {
            let Some((src, src_base, delta)) = copy_source(tm, &run[0]) else {
                return Ok(None);
            };
            let src_start = mk_offset(tm, src_base, &min.add(&delta))?;
            let src_index = tm.mk_term(TermKind::BvAdd, &[distance, src_start], &[])?;
            tm.mk_select(src, src_index)?
        }
    };
    let miss = tm.mk_select(rest, j)?;
    let body = tm.mk_ite(inside, hit, miss)?;
    Ok(Some(tm.mk_term(TermKind::Lambda, &[j, body], &[])?))
}

/// Replace reads of memset and memcpy chains by lambda applications;
/// returns the number of extracted lambdas
pub(crate) fn extract_lambdas(tm: &mut TermManager, roots: Vec<Root>) -> Result<(Vec<Root>, u64)> {
    let terms: Vec<TermId> = roots.iter().map(|r| r.term).collect();
    let mut lambdas: FxHashMap<TermId, Option<TermId>> = FxHashMap::default();
    let mut map = SubstMap::default();
    for read in tm.collect_kind(&terms, TermKind::ArraySelect) {
        let (chain, index) = (tm[read].args[0], tm[read].args[1]);
        if tm[chain].kind != TermKind::ArrayStore {
            continue;
        }
        let lambda = match lambdas.get(&chain) {
            Some(&l) => l,
            None => {
                let l = extract(tm, chain)?;
                lambdas.insert(chain, l);
                l
            }
        };
        if let Some(f) = lambda {
            map.insert(read, tm.mk_apply(f, &[index])?);
        }
    }
    let extracted = lambdas.values().filter(|l| l.is_some()).count() as u64;
    if map.is_empty() {
        return Ok((roots, 0));
    }
    let new_terms = tm.substitute_all(&terms, &map)?;
    let out = roots.iter().zip(new_terms).map(|(r, t)| r.with_term(t)).collect();
    Ok((out, extracted))
}

#[cfg(test)]
mod tests {
    use super::super::Origin;
    use super::*;
    use oxbit_core::rewrite::{Rewriter, beta_reduce};
    use oxbit_core::sort::SortId;

    fn read_at(tm: &mut TermManager, s: SortId, array: TermId, k: u64) -> TermId {
        let kt = tm.mk_bv_value_u64(s, k).unwrap();
        tm.mk_select(array, kt).unwrap()
    }

    /// Body of the applied lambda at index `k`, normalized
    fn apply_at(tm: &mut TermManager, s: SortId, app: TermId, k: u64) -> TermId {
        let kt = tm.mk_bv_value_u64(s, k).unwrap();
        let f = tm[app].args[0];
        let body = beta_reduce(tm, f, &[kt]).unwrap().unwrap();
        Rewriter::new(3).normalize(tm, body).unwrap()
    }

    #[test]
    fn test_memset_at_symbolic_base() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(s, Some("i"));
        let zero = tm.mk_bv_zero(s).unwrap();
        let mut chain = a;
        for k in 0..4 {
            let off = tm.mk_bv_value_u64(s, k).unwrap();
            let idx = tm.mk_term(TermKind::BvAdd, &[i, off], &[]).unwrap();
            chain = tm.mk_store(chain, idx, zero).unwrap();
        }
        let j = tm.mk_const(s, Some("j"));
        let read = tm.mk_select(chain, j).unwrap();
        let eq = tm.mk_eq(read, zero).unwrap();
        let (out, n) = extract_lambdas(&mut tm, vec![Root::new(eq, Origin::Assertion(0))]).unwrap();
        assert_eq!(n, 1);
        let app = tm[out[0].term].args[0];
        assert_eq!(tm[app].kind, TermKind::Apply);
        assert_eq!(tm[tm[app].args[0]].kind, TermKind::Lambda);
        assert!(!tm.contains_kind(&[out[0].term], &[TermKind::ArrayStore]));
        assert_eq!(out[0].origins.as_slice(), [Origin::Assertion(0)]);
    }

    #[test]
    fn test_memcpy_reads_source() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let src = tm.mk_const(arr, Some("src"));
        let mut chain = a;
        // a[10 + k] = src[20 + k]
        for k in 0..3 {
            let v = read_at(&mut tm, s, src, 20 + k);
            let idx = tm.mk_bv_value_u64(s, 10 + k).unwrap();
            chain = tm.mk_store(chain, idx, v).unwrap();
        }
        let read = read_at(&mut tm, s, chain, 11);
        let five = tm.mk_bv_value_u64(s, 5).unwrap();
        let lt = tm.mk_term(TermKind::BvUlt, &[read, five], &[]).unwrap();
        let (out, n) = extract_lambdas(&mut tm, vec![Root::new(lt, Origin::Assertion(0))]).unwrap();
        assert_eq!(n, 1);
        let app = tm[out[0].term].args[0];
        assert_eq!(tm[app].kind, TermKind::Apply);

        // inside the run the lambda reads the source, outside the base array
        let hit = apply_at(&mut tm, s, app, 12);
        assert_eq!(hit, read_at(&mut tm, s, src, 22));
        let miss = apply_at(&mut tm, s, app, 13);
        assert_eq!(miss, read_at(&mut tm, s, a, 13));
    }

    #[test]
    fn test_unrelated_stores_stay() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(s, Some("i"));
        let one = tm.mk_bv_one(s).unwrap();
        let two = tm.mk_bv_value_u64(s, 2).unwrap();
        let five = tm.mk_bv_value_u64(s, 5).unwrap();
        let st = tm.mk_store(a, i, one).unwrap();
        let st = tm.mk_store(st, five, two).unwrap();
        let rd = read_at(&mut tm, s, st, 3);
        let eq = tm.mk_eq(rd, one).unwrap();
        let (out, n) = extract_lambdas(&mut tm, vec![Root::new(eq, Origin::Assertion(0))]).unwrap();
        assert_eq!(n, 0);
        assert_eq!(out[0].term, eq);
    }
}
