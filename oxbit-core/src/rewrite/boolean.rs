//! Boolean rules

use super::{RewriteResult, RewriteRule, changed, mk, unchanged};
use crate::ast::{TermId, TermKind, TermManager};
use crate::error::Result;
use smallvec::SmallVec;

/// Connectives, `ite` and equality
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolRules;

impl RewriteRule for BoolRules {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn apply(&self, tm: &mut TermManager, id: TermId) -> Result<RewriteResult> {
        let term = tm[id].clone();
        let args = term.args.as_slice();
        match term.kind {
            TermKind::Not => {
                let inner = &tm[args[0]];
                if inner.kind == TermKind::Not {
                    return changed(inner.args[0]);
                }
                unchanged()
            }
            TermKind::Implies => {
                let na = tm.mk_not(args[0])?;
                changed(mk(tm, TermKind::Or, &[na, args[1]])?)
            }
            TermKind::Iff => changed(tm.mk_eq(args[0], args[1])?),
            TermKind::Xor => {
                let eq = tm.mk_eq(args[0], args[1])?;
                changed(tm.mk_not(eq)?)
            }
            TermKind::Distinct => {
                let mut diseqs = Vec::new();
                for i in 0..args.len() {
                    for j in i + 1..args.len() {
                        let eq = tm.mk_eq(args[i], args[j])?;
                        diseqs.push(tm.mk_not(eq)?);
                    }
                }
                changed(tm.mk_and(&diseqs)?)
            }
            TermKind::And => junction(tm, TermKind::And, args),
            TermKind::Or => junction(tm, TermKind::Or, args),
            TermKind::Ite => ite(tm, id, args[0], args[1], args[2]),
            TermKind::Equal => equal(tm, args[0], args[1]),
            _ => unchanged(),
        }
    }
}

/// Flatten, drop units, detect annihilators and complementary literals,
/// deduplicate and order operands
fn junction(tm: &mut TermManager, kind: TermKind, args: &[TermId]) -> Result<RewriteResult> {
    let unit = kind == TermKind::And;
    let mut flat: SmallVec<[TermId; 8]> = SmallVec::new();
    for &a in args {
        let t = &tm[a];
        if t.kind == kind {
            flat.extend(t.args.iter().copied());
        } else {
            flat.push(a);
        }
    }
    let mut out: SmallVec<[TermId; 8]> = SmallVec::new();
    for a in flat {
        match tm.bool_value(a) {
            Some(b) if b == unit => {}
            Some(_) => return changed(tm.mk_bool(!unit)),
            None => out.push(a),
        }
    }
    out.sort_unstable();
    out.dedup();
    for &a in &out {
        let t = &tm[a];
        if t.kind == TermKind::Not && out.binary_search(&t.args[0]).is_ok() {
            return changed(tm.mk_bool(!unit));
        }
    }
    match out.len() {
        0 => changed(tm.mk_bool(unit)),
        1 => changed(out[0]),
        _ if out.as_slice() != args => changed(mk(tm, kind, &out)?),
        _ => unchanged(),
    }
}

fn ite(tm: &mut TermManager, id: TermId, c: TermId, t: TermId, e: TermId) -> Result<RewriteResult> {
    if let Some(b) = tm.bool_value(c) {
        return changed(if b { t } else { e });
    }
    if t == e {
        return changed(t);
    }
    if tm[c].kind == TermKind::Not {
        let inner = tm[c].args[0];
        return changed(tm.mk_ite(inner, e, t)?);
    }
    if tm[t].kind == TermKind::Ite && tm[t].args[0] == c {
        let tt = tm[t].args[1];
        return changed(tm.mk_ite(c, tt, e)?);
    }
    if tm[e].kind == TermKind::Ite && tm[e].args[0] == c {
        let ee = tm[e].args[2];
        return changed(tm.mk_ite(c, t, ee)?);
    }
    if tm.is_bool(id) {
        match (tm.bool_value(t), tm.bool_value(e)) {
            (Some(true), Some(false)) => return changed(c),
            (Some(false), Some(true)) => return changed(tm.mk_not(c)?),
            (Some(true), None) => return changed(tm.mk_or(&[c, e])?),
            (Some(false), None) => {
                let nc = tm.mk_not(c)?;
                return changed(tm.mk_and(&[nc, e])?);
            }
            (None, Some(true)) => {
                let nc = tm.mk_not(c)?;
                return changed(tm.mk_or(&[nc, t])?);
            }
            (None, Some(false)) => return changed(tm.mk_and(&[c, t])?),
            _ => {}
        }
    }
    unchanged()
}

fn equal(tm: &mut TermManager, a: TermId, b: TermId) -> Result<RewriteResult> {
    if a == b {
        return changed(tm.mk_true());
    }
    if tm.is_value(a) && tm.is_value(b) {
        return changed(tm.mk_false());
    }
    if tm.is_bool(a) {
        for (x, y) in [(a, b), (b, a)] {
            match tm.bool_value(x) {
                Some(true) => return changed(y),
                Some(false) => return changed(tm.mk_not(y)?),
                None => {}
            }
        }
    }
    if a > b {
        return changed(tm.mk_eq(b, a)?);
    }
    unchanged()
}
