//! Boolean ite elimination
//!
//! Every ground Boolean `ite c a b` becomes a fresh constant `v` defined by
//! the clauses `c & v -> a`, `c & a -> v`, `!c & v -> b` and `!c & b -> v`.

use super::Root;
use oxbit_core::Result;
use oxbit_core::ast::{SubstMap, TermId, TermKind, TermManager};

pub(crate) fn eliminate_ites(tm: &mut TermManager, roots: Vec<Root>) -> Result<(Vec<Root>, u64)> {
    let terms: Vec<TermId> = roots.iter().map(|r| r.term).collect();
    let ites: Vec<TermId> = tm
        .collect_kind(&terms, TermKind::Ite)
        .into_iter()
        .filter(|&t| tm.is_bool(t) && tm[t].is_ground())
        .collect();
    if ites.is_empty() {
        return Ok((roots, 0));
    }
    let b = tm.mk_bool_sort();
    let mut map = SubstMap::default();
    for &t in &ites {
        let v = tm.mk_fresh_const(b, "ite");
        map.insert(t, v);
    }
    let new_terms = tm.substitute_all(&terms, &map)?;
    let mut out: Vec<Root> = roots
        .iter()
        .zip(new_terms)
        .map(|(r, t)| r.with_term(t))
        .collect();
    for &t in &ites {
        let args = tm.children(t).to_vec();
        // children may contain further ites
        let parts = tm.substitute_all(&args, &map)?;
        let (c, a, e) = (parts[0], parts[1], parts[2]);
        let v = map[&t];
        let (nc, nv, na, ne) = (tm.mk_not(c)?, tm.mk_not(v)?, tm.mk_not(a)?, tm.mk_not(e)?);
        for clause in [[nc, nv, a], [nc, v, na], [c, nv, e], [c, v, ne]] {
            let or = tm.mk_or(&clause)?;
            out.push(Root::definition(or));
        }
    }
    Ok((out, ites.len() as u64))
}
