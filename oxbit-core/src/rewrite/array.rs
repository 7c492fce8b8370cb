//! Array and function rules

use super::{RewriteResult, RewriteRule, changed, unchanged};
use crate::ast::{SubstMap, TermId, TermKind, TermManager};
use crate::error::Result;

/// Beta reduction, application through `ite`, read-over-write and
/// write-over-write
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayRules;

impl RewriteRule for ArrayRules {
    fn name(&self) -> &'static str {
        "array"
    }

    fn apply(&self, tm: &mut TermManager, id: TermId) -> Result<RewriteResult> {
        use TermKind as K;
        let term = tm[id].clone();
        let args = term.args.as_slice();
        match term.kind {
            K::Apply => {
                let f = tm[args[0]].clone();
                match f.kind {
                    K::Lambda => match beta_reduce(tm, args[0], &args[1..])? {
                        Some(r) => changed(r),
                        None => unchanged(),
                    },
                    K::Ite => {
                        let (c, g, h) = (f.args[0], f.args[1], f.args[2]);
                        let then_app = tm.mk_apply(g, &args[1..])?;
                        let else_app = tm.mk_apply(h, &args[1..])?;
                        changed(tm.mk_ite(c, then_app, else_app)?)
                    }
                    _ => unchanged(),
                }
            }
            K::ArraySelect => {
                let (a, j) = (args[0], args[1]);
                let inner = tm[a].clone();
                match inner.kind {
                    K::ArrayStore => {
                        let (base, i, e) = (inner.args[0], inner.args[1], inner.args[2]);
                        if i == j {
                            return changed(e);
                        }
                        if tm.is_value(i) && tm.is_value(j) {
                            return changed(tm.mk_select(base, j)?);
                        }
                        unchanged()
                    }
                    K::ConstArray => changed(inner.args[0]),
                    K::Ite => {
                        let (c, x, y) = (inner.args[0], inner.args[1], inner.args[2]);
                        let sx = tm.mk_select(x, j)?;
                        let sy = tm.mk_select(y, j)?;
                        changed(tm.mk_ite(c, sx, sy)?)
                    }
                    _ => unchanged(),
                }
            }
            K::ArrayStore => {
                let inner = &tm[args[0]];
                if inner.kind == K::ArrayStore && inner.args[1] == args[1] {
                    let base = inner.args[0];
                    return changed(tm.mk_store(base, args[1], args[2])?);
                }
                unchanged()
            }
            _ => unchanged(),
        }
    }
}

/// Substitute the arguments of an application into the lambda body.
///
/// Returns `None` when `f` does not bind as many variables as there are
/// arguments.
pub fn beta_reduce(tm: &mut TermManager, f: TermId, args: &[TermId]) -> Result<Option<TermId>> {
    let mut map = SubstMap::default();
    let mut cur = f;
    for &a in args {
        let t = &tm[cur];
        if t.kind != TermKind::Lambda {
            return Ok(None);
        }
        map.insert(t.args[0], a);
        cur = t.args[1];
    }
    Ok(Some(tm.substitute(cur, &map)?))
}
