//! Variable substitution and skeleton propagation
//!
//! A root `x = t` with `x` an uninterpreted constant not occurring in `t`
//! defines `x`; every other root gets `t` in place of `x`. A root that is a
//! Boolean atom `a` (or `not a`) fixes `a` to true (false) in every other
//! root. Defining roots stay in the root set so models still assign the
//! defined constants.

use super::{Origins, Root, merge_into};
use oxbit_core::Result;
use oxbit_core::ast::{SubstMap, TermId, TermKind, TermManager};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Defines {
    Constant(TermId),
    Literal(TermId, bool),
}

/// Definitions found in one root set
#[derive(Debug, Default)]
pub(crate) struct Definitions {
    map: SubstMap,
    origins: FxHashMap<TermId, Origins>,
    by_root: FxHashMap<usize, Defines>,
    constants: u64,
    literals: u64,
}

impl Definitions {
    pub(crate) fn num_constants(&self) -> u64 {
        self.constants
    }

    pub(crate) fn num_literals(&self) -> u64 {
        self.literals
    }

    fn add_literal(&mut self, tm: &mut TermManager, i: usize, root: &Root, atom: TermId, phase: bool) {
        if self.map.contains_key(&atom) || tm.is_value(atom) {
            return;
        }
        let v = tm.mk_bool(phase);
        self.map.insert(atom, v);
        self.origins.insert(atom, root.origins.clone());
        self.by_root.insert(i, Defines::Literal(atom, phase));
        self.literals += 1;
    }

    fn add_constant(&mut self, tm: &mut TermManager, i: usize, root: &Root, x: TermId, t: TermId) -> Result<bool> {
        if self.map.contains_key(&x) {
            return Ok(false);
        }
        let mut origins = root.origins.clone();
        for c in tm.collect_consts(&[t]) {
            if let Some(o) = self.origins.get(&c) {
                merge_into(&mut origins, o);
            }
        }
        let value = tm.substitute(t, &self.map)?;
        if tm.occurs(x, value) {
            return Ok(false);
        }
        let single: SubstMap = std::iter::once((x, value)).collect();
        let users: Vec<TermId> = self
            .map
            .iter()
            .filter(|&(_, &v)| tm.occurs(x, v))
            .map(|(&k, _)| k)
            .collect();
        for k in users {
            let v = self.map[&k];
            let nv = tm.substitute(v, &single)?;
            self.map.insert(k, nv);
            if let Some(o) = self.origins.get_mut(&k) {
                merge_into(o, &origins);
            }
        }
        self.map.insert(x, value);
        self.origins.insert(x, origins);
        self.by_root.insert(i, Defines::Constant(x));
        self.constants += 1;
        Ok(true)
    }

    /// Substitute the definitions into every root
    pub(crate) fn apply(&self, tm: &mut TermManager, roots: Vec<Root>) -> Result<Vec<Root>> {
        if self.map.is_empty() {
            return Ok(roots);
        }
        let mut out = Vec::with_capacity(roots.len());
        for (i, root) in roots.into_iter().enumerate() {
            let (term, used) = match self.by_root.get(&i) {
                Some(&Defines::Constant(x)) => {
                    let eq = tm.mk_eq(x, self.map[&x])?;
                    (eq, vec![x])
                }
                Some(&Defines::Literal(atom, phase)) => {
                    let args = tm.children(atom).to_vec();
                    let new_args = tm.substitute_all(&args, &self.map)?;
                    let a = tm.rebuild(atom, &new_args)?;
                    let t = if phase { a } else { tm.mk_not(a)? };
                    (t, self.keys_in(tm, &args))
                }
                None => {
                    let t = tm.substitute(root.term, &self.map)?;
                    (t, self.keys_in(tm, &[root.term]))
                }
            };
            let mut next = root.with_term(term);
            for k in used {
                if let Some(o) = self.origins.get(&k) {
                    next.merge_origins(o);
                }
            }
            out.push(next);
        }
        Ok(out)
    }

    fn keys_in(&self, tm: &TermManager, roots: &[TermId]) -> Vec<TermId> {
        tm.post_order(roots)
            .into_iter()
            .filter(|t| self.map.contains_key(t))
            .collect()
    }
}

/// Find the definitions of `roots`
pub(crate) fn collect_definitions(
    tm: &mut TermManager,
    roots: &[Root],
    var_subst: bool,
    skeleton: bool,
) -> Result<Definitions> {
    let mut defs = Definitions::default();
    let mut candidates = Vec::new();
    if skeleton {
        for (i, root) in roots.iter().enumerate() {
            let t = &tm[root.term];
            if !t.is_ground() {
                continue;
            }
            match t.kind {
                TermKind::Not => {
                    let atom = t.args[0];
                    defs.add_literal(tm, i, root, atom, false);
                }
                TermKind::Equal if var_subst && definition(tm, root.term).is_some() => {}
                _ => defs.add_literal(tm, i, root, root.term, true),
            }
        }
    }
    if var_subst {
        for (i, root) in roots.iter().enumerate() {
            if defs.by_root.contains_key(&i) {
                continue;
            }
            if let Some((x, t)) = definition(tm, root.term) {
                candidates.push((i, x, t));
            }
        }
    }
    for (i, x, t) in candidates {
        // a rejected candidate stays an ordinary root
        defs.add_constant(tm, i, &roots[i], x, t)?;
    }
    Ok(defs)
}

/// `x = t` with `x` an uninterpreted constant not occurring in `t`
fn definition(tm: &TermManager, eq: TermId) -> Option<(TermId, TermId)> {
    let t = &tm[eq];
    if t.kind != TermKind::Equal || t.args.len() != 2 {
        return None;
    }
    let (a, b) = (t.args[0], t.args[1]);
    if tm.is_const(a) && !tm.occurs(a, b) {
        Some((a, b))
    } else if tm.is_const(b) && !tm.occurs(b, a) {
        Some((b, a))
    } else {
        None
    }
}
