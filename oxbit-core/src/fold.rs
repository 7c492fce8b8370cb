//! Constant folding over literal values
//!
//! [`fold`] evaluates one operator application on literal operands. It is
//! shared by the rewriter and by model evaluation, so both agree on the
//! semantics of every scalar operator.

use crate::ast::TermKind;
use crate::value::{BitVec, FpValue, RoundingMode, Value};

fn bv(v: &Value) -> Option<&BitVec> {
    v.as_bv()
}

fn fp(v: &Value) -> Option<&FpValue> {
    v.as_fp()
}

fn bit(b: bool) -> Value {
    Value::BitVec(BitVec::from_bool(b))
}

/// Evaluate `kind(args)[indices]` on literal operands.
///
/// Returns `None` for non-scalar kinds (arrays, functions, binders, leaves)
/// and for operands of the wrong shape.
#[must_use]
pub fn fold(kind: TermKind, indices: &[u32], args: &[Value]) -> Option<Value> {
    use TermKind as K;
    let b = |i: usize| args.get(i).and_then(Value::as_bool);
    let x = |i: usize| args.get(i).and_then(bv);
    let f = |i: usize| args.get(i).and_then(fp);
    let rm = |i: usize| args.get(i).and_then(Value::as_rm);

    let r = match kind {
        K::Not => Value::Bool(!b(0)?),
        K::And => {
            let mut acc = true;
            for i in 0..args.len() {
                acc &= b(i)?;
            }
            Value::Bool(acc)
        }
        K::Or => {
            let mut acc = false;
            for i in 0..args.len() {
                acc |= b(i)?;
            }
            Value::Bool(acc)
        }
        K::Xor => Value::Bool(b(0)? ^ b(1)?),
        K::Implies => Value::Bool(!b(0)? || b(1)?),
        K::Iff => Value::Bool(b(0)? == b(1)?),
        K::Ite => {
            if b(0)? {
                args.get(1)?.clone()
            } else {
                args.get(2)?.clone()
            }
        }
        K::Equal => Value::Bool(args.windows(2).all(|w| w[0] == w[1])),
        K::Distinct => {
            let mut distinct = true;
            for i in 0..args.len() {
                for j in i + 1..args.len() {
                    distinct &= args[i] != args[j];
                }
            }
            Value::Bool(distinct)
        }

        K::BvNot => Value::BitVec(x(0)?.not()),
        K::BvNeg => Value::BitVec(x(0)?.neg()),
        K::BvInc => Value::BitVec(x(0)?.inc()),
        K::BvDec => Value::BitVec(x(0)?.dec()),
        K::BvAnd => Value::BitVec(x(0)?.and(x(1)?)),
        K::BvOr => Value::BitVec(x(0)?.or(x(1)?)),
        K::BvXor => Value::BitVec(x(0)?.xor(x(1)?)),
        K::BvNand => Value::BitVec(x(0)?.and(x(1)?).not()),
        K::BvNor => Value::BitVec(x(0)?.or(x(1)?).not()),
        K::BvXnor => Value::BitVec(x(0)?.xor(x(1)?).not()),
        K::BvAdd => Value::BitVec(x(0)?.add(x(1)?)),
        K::BvSub => Value::BitVec(x(0)?.sub(x(1)?)),
        K::BvMul => Value::BitVec(x(0)?.mul(x(1)?)),
        K::BvUdiv => Value::BitVec(x(0)?.udiv(x(1)?)),
        K::BvUrem => Value::BitVec(x(0)?.urem(x(1)?)),
        K::BvSdiv => Value::BitVec(x(0)?.sdiv(x(1)?)),
        K::BvSrem => Value::BitVec(x(0)?.srem(x(1)?)),
        K::BvSmod => Value::BitVec(x(0)?.smod(x(1)?)),
        K::BvShl => Value::BitVec(x(0)?.shl(x(1)?)),
        K::BvShr => Value::BitVec(x(0)?.lshr(x(1)?)),
        K::BvAshr => Value::BitVec(x(0)?.ashr(x(1)?)),
        K::BvRol => Value::BitVec(x(0)?.rol(x(1)?)),
        K::BvRor => Value::BitVec(x(0)?.ror(x(1)?)),
        K::BvUlt => Value::Bool(x(0)?.ult(x(1)?)),
        K::BvUle => Value::Bool(x(0)?.ule(x(1)?)),
        K::BvUgt => Value::Bool(x(1)?.ult(x(0)?)),
        K::BvUge => Value::Bool(x(1)?.ule(x(0)?)),
        K::BvSlt => Value::Bool(x(0)?.slt(x(1)?)),
        K::BvSle => Value::Bool(x(0)?.sle(x(1)?)),
        K::BvSgt => Value::Bool(x(1)?.slt(x(0)?)),
        K::BvSge => Value::Bool(x(1)?.sle(x(0)?)),
        K::BvComp => bit(x(0)? == x(1)?),
        K::BvConcat => Value::BitVec(x(0)?.concat(x(1)?)),
        K::BvRedand => bit(x(0)?.redand()),
        K::BvRedor => bit(x(0)?.redor()),
        K::BvRedxor => bit(x(0)?.redxor()),
        K::BvUaddo => Value::Bool(x(0)?.uaddo(x(1)?)),
        K::BvSaddo => Value::Bool(x(0)?.saddo(x(1)?)),
        K::BvUsubo => Value::Bool(x(0)?.usubo(x(1)?)),
        K::BvSsubo => Value::Bool(x(0)?.ssubo(x(1)?)),
        K::BvUmulo => Value::Bool(x(0)?.umulo(x(1)?)),
        K::BvSmulo => Value::Bool(x(0)?.smulo(x(1)?)),
        K::BvSdivo => Value::Bool(x(0)?.sdivo(x(1)?)),
        K::BvExtract => Value::BitVec(x(0)?.extract(*indices.first()?, *indices.get(1)?)),
        K::BvZeroExtend => Value::BitVec(x(0)?.zero_extend(*indices.first()?)),
        K::BvSignExtend => Value::BitVec(x(0)?.sign_extend(*indices.first()?)),
        K::BvRepeat => Value::BitVec(x(0)?.repeat(*indices.first()?)),
        K::BvRoli => Value::BitVec(x(0)?.rotate_left(*indices.first()?)),
        K::BvRori => Value::BitVec(x(0)?.rotate_right(*indices.first()?)),

        K::FpAbs => Value::Fp(f(0)?.abs()),
        K::FpNeg => Value::Fp(f(0)?.neg()),
        K::FpAdd => Value::Fp(f(1)?.add(rm(0)?, f(2)?)),
        K::FpSub => Value::Fp(f(1)?.sub(rm(0)?, f(2)?)),
        K::FpMul => Value::Fp(f(1)?.mul(rm(0)?, f(2)?)),
        K::FpDiv => Value::Fp(f(1)?.div(rm(0)?, f(2)?)),
        K::FpFma => Value::Fp(f(1)?.fma(rm(0)?, f(2)?, f(3)?)),
        K::FpSqrt => Value::Fp(f(1)?.sqrt(rm(0)?)),
        K::FpRti => Value::Fp(f(1)?.round_to_integral(rm(0)?)),
        K::FpRem => Value::Fp(f(0)?.rem(f(1)?)),
        K::FpMin => Value::Fp(f(0)?.min(f(1)?)),
        K::FpMax => Value::Fp(f(0)?.max(f(1)?)),
        K::FpEqual => Value::Bool(f(0)?.fp_eq(f(1)?)),
        K::FpLt => Value::Bool(f(0)?.lt(f(1)?)),
        K::FpLeq => Value::Bool(f(0)?.leq(f(1)?)),
        K::FpGt => Value::Bool(f(1)?.lt(f(0)?)),
        K::FpGeq => Value::Bool(f(1)?.leq(f(0)?)),
        K::FpIsNormal => Value::Bool(f(0)?.is_normal()),
        K::FpIsSubnormal => Value::Bool(f(0)?.is_subnormal()),
        K::FpIsZero => Value::Bool(f(0)?.is_zero()),
        K::FpIsInf => Value::Bool(f(0)?.is_inf()),
        K::FpIsNan => Value::Bool(f(0)?.is_nan()),
        K::FpIsNeg => Value::Bool(f(0)?.is_negative()),
        K::FpIsPos => Value::Bool(f(0)?.is_positive()),
        K::FpFp => Value::Fp(FpValue::from_triple(x(0)?, x(1)?, x(2)?).ok()?),
        K::FpToFpFromBv => {
            let (eb, sb) = (*indices.first()?, *indices.get(1)?);
            Value::Fp(FpValue::from_bits(eb, sb, x(0)?.clone()))
        }
        K::FpToFpFromFp => {
            let (eb, sb) = (*indices.first()?, *indices.get(1)?);
            Value::Fp(f(1)?.convert(rm(0)?, eb, sb))
        }
        K::FpToFpFromSbv => {
            let (eb, sb) = (*indices.first()?, *indices.get(1)?);
            Value::Fp(FpValue::from_sbv(eb, sb, rm(0)?, x(1)?))
        }
        K::FpToFpFromUbv => {
            let (eb, sb) = (*indices.first()?, *indices.get(1)?);
            Value::Fp(FpValue::from_ubv(eb, sb, rm(0)?, x(1)?))
        }
        K::FpToSbv => Value::BitVec(f(1)?.to_sbv(rm(0)?, *indices.first()?)),
        K::FpToUbv => Value::BitVec(f(1)?.to_ubv(rm(0)?, *indices.first()?)),

        K::Const
        | K::Var
        | K::Value
        | K::ArraySelect
        | K::ArrayStore
        | K::ConstArray
        | K::Apply
        | K::Lambda
        | K::Forall
        | K::Exists => return None,
    };
    Some(r)
}

/// Default value of a scalar sort, used for unconstrained model entries
#[must_use]
pub fn default_value(kind: &crate::sort::SortKind) -> Option<Value> {
    use crate::sort::SortKind;
    match kind {
        SortKind::Bool => Some(Value::Bool(false)),
        SortKind::BitVec(w) => Some(Value::BitVec(BitVec::zero(*w))),
        SortKind::FloatingPoint { exp, sig } => Some(Value::Fp(FpValue::zero(*exp, *sig, false))),
        SortKind::RoundingMode => Some(Value::Rm(RoundingMode::Rne)),
        SortKind::Array { .. } | SortKind::Function { .. } => None,
    }
}

/// Rebuild a value of a scalar sort from little-endian bits
#[must_use]
pub fn value_from_bits(kind: &crate::sort::SortKind, bits: &[bool]) -> Option<Value> {
    use crate::sort::SortKind;
    match kind {
        SortKind::Bool => Some(Value::Bool(*bits.first()?)),
        SortKind::BitVec(_) => Some(Value::BitVec(BitVec::from_bits(bits))),
        SortKind::FloatingPoint { exp, sig } => {
            Some(Value::Fp(FpValue::from_bits(*exp, *sig, BitVec::from_bits(bits))))
        }
        SortKind::RoundingMode => {
            Some(Value::Rm(RoundingMode::from_code(BitVec::from_bits(bits).to_u64()?)))
        }
        SortKind::Array { .. } | SortKind::Function { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(w: u32, x: u64) -> Value {
        Value::BitVec(BitVec::from_u64(w, x))
    }

    #[test]
    fn test_fold_bv() {
        assert_eq!(fold(TermKind::BvAdd, &[], &[v(8, 255), v(8, 1)]), Some(v(8, 0)));
        assert_eq!(fold(TermKind::BvExtract, &[3, 0], &[v(8, 0xab)]), Some(v(4, 0xb)));
        assert_eq!(fold(TermKind::BvUgt, &[], &[v(8, 3), v(8, 2)]), Some(Value::Bool(true)));
        assert_eq!(fold(TermKind::BvRedor, &[], &[v(8, 0)]), Some(v(1, 0)));
    }

    #[test]
    fn test_fold_bool() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert_eq!(fold(TermKind::Implies, &[], &[f.clone(), f.clone()]), Some(t.clone()));
        assert_eq!(fold(TermKind::Distinct, &[], &[t.clone(), f.clone(), t.clone()]), Some(f.clone()));
        assert_eq!(fold(TermKind::Ite, &[], &[t, v(4, 1), v(4, 2)]), Some(v(4, 1)));
    }

    #[test]
    fn test_value_from_bits() {
        use crate::sort::SortKind;
        let bits = [true, false, true];
        assert_eq!(value_from_bits(&SortKind::BitVec(3), &bits), Some(v(3, 5)));
        assert_eq!(
            value_from_bits(&SortKind::RoundingMode, &[false, false, true]),
            Some(Value::Rm(RoundingMode::Rtz))
        );
    }
}
