//! Bit-vector rules

use super::{RewriteResult, RewriteRule, changed, mk, unchanged};
use crate::ast::{TermId, TermKind, TermManager};
use crate::error::Result;
use crate::value::{BitVec, Value};

/// Bit-vector identities, slices and comparison sugar
#[derive(Debug, Clone, Copy, Default)]
pub struct BvRules;

fn bv_value(tm: &TermManager, id: TermId) -> Option<BitVec> {
    tm.value_of(id).and_then(Value::as_bv).cloned()
}

fn is_zero(tm: &TermManager, id: TermId) -> bool {
    bv_value(tm, id).is_some_and(|v| v.is_zero())
}

fn is_one(tm: &TermManager, id: TermId) -> bool {
    bv_value(tm, id).is_some_and(|v| v.is_one())
}

fn is_ones(tm: &TermManager, id: TermId) -> bool {
    bv_value(tm, id).is_some_and(|v| v.is_ones())
}

fn negation_of(tm: &TermManager, a: TermId, b: TermId) -> bool {
    let t = &tm[b];
    t.kind == TermKind::BvNeg && t.args[0] == a
}

impl RewriteRule for BvRules {
    fn name(&self) -> &'static str {
        "bv"
    }

    fn apply(&self, tm: &mut TermManager, id: TermId) -> Result<RewriteResult> {
        use TermKind as K;
        let term = tm[id].clone();
        let args = term.args.as_slice();
        let sort = term.sort;
        match term.kind {
            K::BvSub => {
                let n = mk(tm, K::BvNeg, &[args[1]])?;
                changed(mk(tm, K::BvAdd, &[args[0], n])?)
            }
            K::BvNand | K::BvNor | K::BvXnor => {
                let base = match term.kind {
                    K::BvNand => K::BvAnd,
                    K::BvNor => K::BvOr,
                    _ => K::BvXor,
                };
                let inner = mk(tm, base, args)?;
                changed(mk(tm, K::BvNot, &[inner])?)
            }
            K::BvInc => {
                let one = tm.mk_bv_one(sort)?;
                changed(mk(tm, K::BvAdd, &[args[0], one])?)
            }
            K::BvDec => {
                let ones = tm.mk_bv_ones(sort)?;
                changed(mk(tm, K::BvAdd, &[args[0], ones])?)
            }
            K::BvUgt => changed(mk(tm, K::BvUlt, &[args[1], args[0]])?),
            K::BvSgt => changed(mk(tm, K::BvSlt, &[args[1], args[0]])?),
            K::BvUge | K::BvSge | K::BvUle | K::BvSle => {
                let lt = if matches!(term.kind, K::BvUge | K::BvUle) { K::BvUlt } else { K::BvSlt };
                let (a, b) = if matches!(term.kind, K::BvUge | K::BvSge) {
                    (args[0], args[1])
                } else {
                    (args[1], args[0])
                };
                let strict = mk(tm, lt, &[a, b])?;
                changed(tm.mk_not(strict)?)
            }
            K::BvUlt | K::BvSlt => {
                if args[0] == args[1] || (term.kind == K::BvUlt && is_zero(tm, args[1])) {
                    return changed(tm.mk_false());
                }
                unchanged()
            }
            K::BvComp => {
                let eq = tm.mk_eq(args[0], args[1])?;
                let bv1 = tm.mk_bv_sort(1)?;
                let one = tm.mk_bv_one(bv1)?;
                let zero = tm.mk_bv_zero(bv1)?;
                changed(tm.mk_ite(eq, one, zero)?)
            }
            K::BvNot | K::BvNeg => {
                let inner = &tm[args[0]];
                if inner.kind == term.kind {
                    return changed(inner.args[0]);
                }
                unchanged()
            }
            K::BvAnd | K::BvOr | K::BvXor | K::BvAdd | K::BvMul => {
                let (a, b) = (args[0], args[1]);
                if a > b {
                    return changed(mk(tm, term.kind, &[b, a])?);
                }
                binary_identity(tm, term.kind, sort, a, b)
            }
            K::BvShl | K::BvShr | K::BvAshr => {
                if is_zero(tm, args[1]) {
                    return changed(args[0]);
                }
                unchanged()
            }
            K::BvRol | K::BvRor => {
                let Some(amount) = bv_value(tm, args[1]) else {
                    return unchanged();
                };
                let w = tm.bv_width(id).unwrap_or(1);
                let n = (amount.value() % num_bigint::BigUint::from(w))
                    .to_u64_digits()
                    .first()
                    .copied()
                    .unwrap_or(0) as u32;
                let kind = if term.kind == K::BvRol { K::BvRoli } else { K::BvRori };
                changed(tm.mk_term(kind, &[args[0]], &[n])?)
            }
            K::BvRoli | K::BvRori => {
                let w = tm.bv_width(id).unwrap_or(1);
                if term.indices[0] % w == 0 {
                    return changed(args[0]);
                }
                if term.indices[0] >= w {
                    return changed(tm.mk_term(term.kind, args, &[term.indices[0] % w])?);
                }
                unchanged()
            }
            K::BvZeroExtend | K::BvSignExtend => {
                if term.indices[0] == 0 {
                    return changed(args[0]);
                }
                unchanged()
            }
            K::BvRepeat => {
                if term.indices[0] == 1 {
                    return changed(args[0]);
                }
                unchanged()
            }
            K::BvExtract => extract(tm, args[0], term.indices[0], term.indices[1]),
            K::BvConcat => {
                let (hi, lo) = (&tm[args[0]], &tm[args[1]]);
                if hi.kind == K::BvExtract
                    && lo.kind == K::BvExtract
                    && hi.args[0] == lo.args[0]
                    && hi.indices[1] == lo.indices[0] + 1
                {
                    let (x, h, l) = (hi.args[0], hi.indices[0], lo.indices[1]);
                    return changed(tm.mk_term(K::BvExtract, &[x], &[h, l])?);
                }
                unchanged()
            }
            K::Equal if tm.bv_width(args[0]).is_some() => equal(tm, args[0], args[1]),
            _ => unchanged(),
        }
    }
}

fn binary_identity(
    tm: &mut TermManager,
    kind: TermKind,
    sort: crate::sort::SortId,
    a: TermId,
    b: TermId,
) -> Result<RewriteResult> {
    use TermKind as K;
    match kind {
        K::BvAnd => {
            if a == b || is_ones(tm, b) {
                return changed(a);
            }
            if is_ones(tm, a) {
                return changed(b);
            }
            if is_zero(tm, a) || is_zero(tm, b) {
                return changed(tm.mk_bv_zero(sort)?);
            }
        }
        K::BvOr => {
            if a == b || is_zero(tm, b) {
                return changed(a);
            }
            if is_zero(tm, a) {
                return changed(b);
            }
            if is_ones(tm, a) || is_ones(tm, b) {
                return changed(tm.mk_bv_ones(sort)?);
            }
        }
        K::BvXor => {
            if a == b {
                return changed(tm.mk_bv_zero(sort)?);
            }
            if is_zero(tm, a) {
                return changed(b);
            }
            if is_zero(tm, b) {
                return changed(a);
            }
        }
        K::BvAdd => {
            if is_zero(tm, a) {
                return changed(b);
            }
            if is_zero(tm, b) {
                return changed(a);
            }
            if negation_of(tm, a, b) || negation_of(tm, b, a) {
                return changed(tm.mk_bv_zero(sort)?);
            }
        }
        K::BvMul => {
            if is_zero(tm, a) || is_zero(tm, b) {
                return changed(tm.mk_bv_zero(sort)?);
            }
            if is_one(tm, a) {
                return changed(b);
            }
            if is_one(tm, b) {
                return changed(a);
            }
        }
        _ => {}
    }
    unchanged()
}

fn extract(tm: &mut TermManager, x: TermId, hi: u32, lo: u32) -> Result<RewriteResult> {
    use TermKind as K;
    let w = tm.bv_width(x).unwrap_or(0);
    if lo == 0 && hi + 1 == w {
        return changed(x);
    }
    let inner = tm[x].clone();
    match inner.kind {
        K::BvExtract => {
            let base = inner.indices[1];
            changed(tm.mk_term(K::BvExtract, &[inner.args[0]], &[hi + base, lo + base])?)
        }
        K::BvConcat => {
            let low_w = tm.bv_width(inner.args[1]).unwrap_or(0);
            if hi < low_w {
                return changed(tm.mk_term(K::BvExtract, &[inner.args[1]], &[hi, lo])?);
            }
            if lo >= low_w {
                return changed(tm.mk_term(K::BvExtract, &[inner.args[0]], &[hi - low_w, lo - low_w])?);
            }
            unchanged()
        }
        K::BvZeroExtend | K::BvSignExtend => {
            let base_w = tm.bv_width(inner.args[0]).unwrap_or(0);
            if hi < base_w {
                return changed(tm.mk_term(K::BvExtract, &[inner.args[0]], &[hi, lo])?);
            }
            unchanged()
        }
        K::BvNot => {
            let e = tm.mk_term(K::BvExtract, &[inner.args[0]], &[hi, lo])?;
            changed(mk(tm, K::BvNot, &[e])?)
        }
        _ => unchanged(),
    }
}

/// Solve simple equations against a value: `x + c = d`, `~x = d`, `-x = d`
fn equal(tm: &mut TermManager, a: TermId, b: TermId) -> Result<RewriteResult> {
    use TermKind as K;
    let (other, value) = match (bv_value(tm, a), bv_value(tm, b)) {
        (None, Some(v)) => (a, v),
        (Some(v), None) => (b, v),
        _ => return unchanged(),
    };
    let t = tm[other].clone();
    let (x, solved) = match t.kind {
        K::BvNot => (t.args[0], value.not()),
        K::BvNeg => (t.args[0], value.neg()),
        K::BvAdd => match (bv_value(tm, t.args[0]), bv_value(tm, t.args[1])) {
            (Some(c), None) => (t.args[1], value.sub(&c)),
            (None, Some(c)) => (t.args[0], value.sub(&c)),
            _ => return unchanged(),
        },
        _ => return unchanged(),
    };
    let v = tm.mk_value(Value::BitVec(solved))?;
    changed(tm.mk_eq(x, v)?)
}
