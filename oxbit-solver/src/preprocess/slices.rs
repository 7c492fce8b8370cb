//! Slice elimination
//!
//! A bit-vector constant that is only partly read through `extract` is cut
//! at every extraction boundary into fresh constants, and replaced by their
//! concatenation. Rewriting then turns each extraction into a concatenation
//! of slices. The equation between the constant and its slices is kept as a
//! root so models still assign the constant.

use super::Root;
use oxbit_core::Result;
use oxbit_core::ast::{SubstMap, TermId, TermKind, TermManager};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

pub(crate) fn eliminate_slices(tm: &mut TermManager, roots: Vec<Root>) -> Result<(Vec<Root>, u64)> {
    let terms: Vec<TermId> = roots.iter().map(|r| r.term).collect();
    let mut cuts: FxHashMap<TermId, BTreeSet<u32>> = FxHashMap::default();
    let mut order = Vec::new();
    for t in tm.collect_kind(&terms, TermKind::BvExtract) {
        let term = &tm[t];
        let x = term.args[0];
        if !tm.is_const(x) {
            continue;
        }
        let Some(width) = tm.bv_width(x) else { continue };
        let (hi, lo) = (term.indices[0], term.indices[1]);
        if lo == 0 && hi + 1 == width {
            continue;
        }
        let set = cuts.entry(x).or_insert_with(|| {
            order.push(x);
            BTreeSet::new()
        });
        set.insert(lo);
        set.insert(hi + 1);
    }
    if order.is_empty() {
        return Ok((roots, 0));
    }
    let mut map = SubstMap::default();
    for &x in &order {
        let Some(width) = tm.bv_width(x) else { continue };
        let mut bounds: Vec<u32> = cuts[&x].iter().copied().filter(|&c| c > 0 && c < width).collect();
        bounds.push(width);
        let mut pieces = Vec::with_capacity(bounds.len());
        let mut lo = 0;
        for &hi in &bounds {
            let s = tm.mk_bv_sort(hi - lo)?;
            pieces.push(tm.mk_fresh_const(s, "slice"));
            lo = hi;
        }
        // most significant slice first
        pieces.reverse();
        let whole = if pieces.len() == 1 {
            pieces[0]
        } else {
            tm.mk_term(TermKind::BvConcat, &pieces, &[])?
        };
        map.insert(x, whole);
    }
    let new_terms = tm.substitute_all(&terms, &map)?;
    let mut out: Vec<Root> = roots
        .iter()
        .zip(new_terms)
        .map(|(r, t)| r.with_term(t))
        .collect();
    for &x in &order {
        if let Some(&whole) = map.get(&x) {
            let eq = tm.mk_eq(x, whole)?;
            out.push(Root::definition(eq));
        }
    }
    Ok((out, map.len() as u64))
}
