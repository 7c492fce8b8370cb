//! Floating-point rules

use super::{RewriteResult, RewriteRule, changed, mk, unchanged};
use crate::ast::{TermId, TermKind, TermManager};
use crate::error::Result;

/// Comparison and subtraction sugar, sign operations
#[derive(Debug, Clone, Copy, Default)]
pub struct FpRules;

impl RewriteRule for FpRules {
    fn name(&self) -> &'static str {
        "fp"
    }

    fn apply(&self, tm: &mut TermManager, id: TermId) -> Result<RewriteResult> {
        use TermKind as K;
        let term = tm[id].clone();
        let args = term.args.as_slice();
        match term.kind {
            K::FpSub => {
                let n = mk(tm, K::FpNeg, &[args[2]])?;
                changed(mk(tm, K::FpAdd, &[args[0], args[1], n])?)
            }
            K::FpGt => changed(mk(tm, K::FpLt, &[args[1], args[0]])?),
            K::FpGeq => changed(mk(tm, K::FpLeq, &[args[1], args[0]])?),
            K::FpNeg => {
                let inner = &tm[args[0]];
                if inner.kind == K::FpNeg {
                    return changed(inner.args[0]);
                }
                unchanged()
            }
            K::FpAbs => {
                let inner = &tm[args[0]];
                match inner.kind {
                    K::FpAbs => changed(args[0]),
                    K::FpNeg => {
                        let x = inner.args[0];
                        changed(mk(tm, K::FpAbs, &[x])?)
                    }
                    _ => unchanged(),
                }
            }
            K::FpEqual | K::FpMin | K::FpMax if args[0] == args[1] => {
                if term.kind == K::FpEqual {
                    let nan = mk(tm, K::FpIsNan, &[args[0]])?;
                    return changed(tm.mk_not(nan)?);
                }
                changed(args[0])
            }
            _ => unchanged(),
        }
    }
}
