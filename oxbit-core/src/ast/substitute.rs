//! Memoized substitution
//!
//! One traversal per call; every visited node is rewritten at most once, so
//! shared substructure stays shared. Binders whose bound variable is a key
//! shadow that key in their body.

use super::manager::TermManager;
use super::term::TermId;
use crate::error::Result;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Substitution map from keys to replacements
pub type SubstMap = FxHashMap<TermId, TermId>;

impl TermManager {
    /// Replace every occurrence of a key of `map` in `term`
    pub fn substitute(&mut self, term: TermId, map: &SubstMap) -> Result<TermId> {
        let mut cache = FxHashMap::default();
        substitute_cached(self, term, map, &mut cache)
    }

    /// Substitute into several roots sharing one cache
    pub fn substitute_all(&mut self, terms: &[TermId], map: &SubstMap) -> Result<Vec<TermId>> {
        let mut cache = FxHashMap::default();
        terms
            .iter()
            .map(|&t| substitute_cached(self, t, map, &mut cache))
            .collect()
    }
}

fn substitute_cached(
    tm: &mut TermManager,
    root: TermId,
    map: &SubstMap,
    cache: &mut FxHashMap<TermId, TermId>,
) -> Result<TermId> {
    if map.is_empty() {
        return Ok(root);
    }
    let mut stack: Vec<(TermId, bool)> = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if cache.contains_key(&id) {
            continue;
        }
        if let Some(&r) = map.get(&id) {
            cache.insert(id, r);
            continue;
        }
        let term = &tm[id];
        if term.args.is_empty() {
            cache.insert(id, id);
            continue;
        }
        if term.kind.is_binder() && map.contains_key(&term.args[0]) {
            let (var, body) = (term.args[0], term.args[1]);
            let mut inner = map.clone();
            inner.remove(&var);
            let mut inner_cache = FxHashMap::default();
            let new_body = substitute_cached(tm, body, &inner, &mut inner_cache)?;
            let r = tm.rebuild(id, &[var, new_body])?;
            cache.insert(id, r);
            continue;
        }
        if !expanded {
            stack.push((id, true));
            for &a in term.args.iter().rev() {
                if !cache.contains_key(&a) {
                    stack.push((a, false));
                }
            }
            continue;
        }
        let args: SmallVec<[TermId; 4]> = term
            .args
            .iter()
            .map(|a| cache.get(a).copied().unwrap_or(*a))
            .collect();
        let r = tm.rebuild(id, &args)?;
        cache.insert(id, r);
    }
    Ok(cache.get(&root).copied().unwrap_or(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TermKind;

    #[test]
    fn test_substitute_shares_structure() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let y = tm.mk_const(bv8, Some("y"));
        let s = tm.mk_term(TermKind::BvAdd, &[x, x], &[]).unwrap();
        let t = tm.mk_term(TermKind::BvMul, &[s, s], &[]).unwrap();
        let mut map = SubstMap::default();
        map.insert(x, y);
        let r = tm.substitute(t, &map).unwrap();
        let ys = tm.mk_term(TermKind::BvAdd, &[y, y], &[]).unwrap();
        let expected = tm.mk_term(TermKind::BvMul, &[ys, ys], &[]).unwrap();
        assert_eq!(r, expected);
    }

    #[test]
    fn test_binder_shadows_key() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let v = tm.mk_var(bv8, Some("v")).unwrap();
        let c = tm.mk_const(bv8, Some("c"));
        let body = tm.mk_term(TermKind::BvAdd, &[v, c], &[]).unwrap();
        let lam = tm.mk_term(TermKind::Lambda, &[v, body], &[]).unwrap();
        let mut map = SubstMap::default();
        map.insert(v, c);
        assert_eq!(tm.substitute(lam, &map).unwrap(), lam);
        assert_eq!(tm.substitute(body, &map).unwrap(), tm.mk_term(TermKind::BvAdd, &[c, c], &[]).unwrap());
    }
}
