//! Bit-blasting of scalar terms into an and-inverter graph
//!
//! Every Boolean, bit-vector, rounding-mode and floating-point term is mapped
//! to a little-endian vector of AIG edges: one bit for Booleans, the width
//! for bit-vectors, three bits (the mode code) for rounding modes and the
//! IEEE-754 interchange layout for floating-point numbers. NaN is always
//! represented by its canonical bit pattern, so equality of floating-point
//! terms is bitwise equality.
//!
//! Sign manipulation, comparisons, classification and the bit-level
//! constructors are encoded here; the rounding arithmetic lives in
//! [`super::float`].
//!
//! Arrays, functions, binders and quantifiers must be eliminated before a
//! term reaches the blaster.

use super::aig::{Aig, AigEdge};
use super::float::{self, FpFormat};
use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::sort::SortKind;
use oxbit_core::value::Value;
use oxbit_core::{OxbitError, Result};
use rustc_hash::FxHashMap;

/// Bits of one term, least significant first
pub type Bits = Vec<AigEdge>;

/// Counters of the blaster
#[derive(Debug, Clone, Default)]
pub struct BlastStats {
    /// Terms encoded
    pub terms: u64,
    /// Constants turned into inputs
    pub inputs: u64,
    /// Floating-point operators encoded as rounding circuits
    pub fp_circuits: u64,
}

/// Term-to-circuit translator with a per-term cache
#[derive(Debug, Default)]
pub struct Blaster {
    cache: FxHashMap<TermId, Bits>,
    inputs: Vec<(TermId, Bits)>,
    side: Vec<AigEdge>,
    stats: BlastStats,
}

impl Blaster {
    /// Empty blaster
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> &BlastStats {
        &self.stats
    }

    /// Cached bits of `t`
    #[must_use]
    pub fn bits(&self, t: TermId) -> Option<&[AigEdge]> {
        self.cache.get(&t).map(Vec::as_slice)
    }

    /// Constants seen so far with their input bits
    #[must_use]
    pub fn inputs(&self) -> &[(TermId, Bits)] {
        &self.inputs
    }

    /// Constraints on input bits created since the last call (NaN
    /// canonicity, rounding-mode range); they must hold permanently
    pub fn take_side_constraints(&mut self) -> Vec<AigEdge> {
        std::mem::take(&mut self.side)
    }

    /// Blast a Boolean term to a single edge
    ///
    /// # Errors
    ///
    /// See [`Blaster::blast`].
    pub fn blast_bool(&mut self, aig: &mut Aig, tm: &TermManager, t: TermId) -> Result<AigEdge> {
        if !tm.is_bool(t) {
            return Err(OxbitError::type_error(format!("{t} is not Boolean")));
        }
        let bits = self.blast(aig, tm, t)?;
        Ok(bits.first().copied().unwrap_or(AigEdge::FALSE))
    }

    /// Blast `root` and every uncached subterm
    ///
    /// # Errors
    ///
    /// Returns an unsupported-feature error when the term still contains
    /// arrays, functions, binders or free variables.
    pub fn blast(&mut self, aig: &mut Aig, tm: &TermManager, root: TermId) -> Result<Bits> {
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if self.cache.contains_key(&id) {
                continue;
            }
            if expanded {
                let bits = self.encode(aig, tm, id)?;
                self.stats.terms += 1;
                self.cache.insert(id, bits);
            } else {
                stack.push((id, true));
                for &c in tm[id].args.iter().rev() {
                    if !self.cache.contains_key(&c) {
                        stack.push((c, false));
                    }
                }
            }
        }
        self.cache
            .get(&root)
            .cloned()
            .ok_or_else(|| OxbitError::state(format!("{root} was not blasted")))
    }

    fn encode(&mut self, aig: &mut Aig, tm: &TermManager, id: TermId) -> Result<Bits> {
        use TermKind as K;
        let term = &tm[id];
        let sort = tm.sort_kind(id).clone();
        let mut args: Vec<Bits> = Vec::with_capacity(term.args.len());
        for a in &term.args {
            args.push(
                self.cache
                    .get(a)
                    .cloned()
                    .ok_or_else(|| OxbitError::state(format!("operand {a} was not blasted")))?,
            );
        }
        let idx = |i: usize| term.indices.get(i).copied().unwrap_or(0);
        let a = |i: usize| args[i].as_slice();
        let one = |e: AigEdge| vec![e];

        let bits = match term.kind {
            K::Value => {
                let v = term
                    .value
                    .as_ref()
                    .ok_or_else(|| OxbitError::state("value term without payload"))?;
                v.to_bits().into_iter().map(AigEdge::constant).collect()
            }
            K::Const => self.encode_input(aig, id, &sort)?,
            K::Var => {
                return Err(OxbitError::unsupported("free bound variable reached the bit-blaster"));
            }
            K::Not => one(!a(0)[0]),
            K::And => {
                let e = aig.and_all(args.iter().map(|b| b[0]));
                one(e)
            }
            K::Or => {
                let e = aig.or_all(args.iter().map(|b| b[0]));
                one(e)
            }
            K::Xor => one(aig.xor(a(0)[0], a(1)[0])),
            K::Implies => one(aig.implies(a(0)[0], a(1)[0])),
            K::Iff => one(aig.xnor(a(0)[0], a(1)[0])),
            K::Ite => encode_mux(aig, a(0)[0], a(1), a(2)),
            K::Equal => {
                let mut eqs = Vec::with_capacity(args.len());
                for w in args.windows(2) {
                    eqs.push(encode_eq(aig, &w[0], &w[1]));
                }
                one(aig.and_all(eqs))
            }
            K::Distinct => {
                let mut diff = Vec::new();
                for i in 0..args.len() {
                    for j in i + 1..args.len() {
                        diff.push(!encode_eq(aig, &args[i], &args[j]));
                    }
                }
                one(aig.and_all(diff))
            }

            K::BvNot => a(0).iter().map(|&x| !x).collect(),
            K::BvNeg => encode_neg(aig, a(0)),
            K::BvAnd => zip_with(aig, a(0), a(1), Aig::and),
            K::BvOr => zip_with(aig, a(0), a(1), Aig::or),
            K::BvXor => zip_with(aig, a(0), a(1), Aig::xor),
            K::BvNand => zip_with(aig, a(0), a(1), |g, x, y| !g.and(x, y)),
            K::BvNor => zip_with(aig, a(0), a(1), |g, x, y| !g.or(x, y)),
            K::BvXnor => zip_with(aig, a(0), a(1), Aig::xnor),
            K::BvAdd => encode_add(aig, a(0), a(1), AigEdge::FALSE).0,
            K::BvSub => encode_sub(aig, a(0), a(1)),
            K::BvMul => encode_mul(aig, a(0), a(1)),
            K::BvUdiv => encode_udivrem(aig, a(0), a(1)).0,
            K::BvUrem => encode_udivrem(aig, a(0), a(1)).1,
            K::BvSdiv => encode_sdiv(aig, a(0), a(1)),
            K::BvSrem => encode_srem(aig, a(0), a(1)),
            K::BvSmod => encode_smod(aig, a(0), a(1)),
            K::BvShl => encode_shift(aig, a(0), a(1), Shift::Left),
            K::BvShr => encode_shift(aig, a(0), a(1), Shift::Logical),
            K::BvAshr => encode_shift(aig, a(0), a(1), Shift::Arithmetic),
            K::BvRol => encode_rotate(aig, a(0), a(1), true),
            K::BvRor => encode_rotate(aig, a(0), a(1), false),
            K::BvRoli => rotate_const(a(0), idx(0), true),
            K::BvRori => rotate_const(a(0), idx(0), false),
            K::BvUlt => one(encode_ult(aig, a(0), a(1))),
            K::BvUle => one(!encode_ult(aig, a(1), a(0))),
            K::BvUgt => one(encode_ult(aig, a(1), a(0))),
            K::BvUge => one(!encode_ult(aig, a(0), a(1))),
            K::BvSlt => one(encode_slt(aig, a(0), a(1))),
            K::BvSle => one(!encode_slt(aig, a(1), a(0))),
            K::BvSgt => one(encode_slt(aig, a(1), a(0))),
            K::BvSge => one(!encode_slt(aig, a(0), a(1))),
            K::BvComp => one(encode_eq(aig, a(0), a(1))),
            K::BvConcat => {
                let mut bits = a(1).to_vec();
                bits.extend_from_slice(a(0));
                bits
            }
            K::BvExtract => a(0)[idx(1) as usize..=idx(0) as usize].to_vec(),
            K::BvZeroExtend => {
                let mut bits = a(0).to_vec();
                bits.extend(std::iter::repeat_n(AigEdge::FALSE, idx(0) as usize));
                bits
            }
            K::BvSignExtend => {
                let mut bits = a(0).to_vec();
                let msb = msb(a(0));
                bits.extend(std::iter::repeat_n(msb, idx(0) as usize));
                bits
            }
            K::BvRepeat => a(0).repeat(idx(0) as usize),
            K::BvRedand => one(aig.and_all(a(0).iter().copied())),
            K::BvRedor => one(aig.or_all(a(0).iter().copied())),
            K::BvRedxor => {
                let mut acc = AigEdge::FALSE;
                for &x in a(0) {
                    acc = aig.xor(acc, x);
                }
                one(acc)
            }
            K::BvInc => encode_add(aig, a(0), &zeros(a(0).len()), AigEdge::TRUE).0,
            K::BvDec => encode_add(aig, a(0), &ones(a(0).len()), AigEdge::FALSE).0,
            K::BvUaddo => one(encode_add(aig, a(0), a(1), AigEdge::FALSE).1),
            K::BvSaddo => {
                let sum = encode_add(aig, a(0), a(1), AigEdge::FALSE).0;
                let same = aig.xnor(msb(a(0)), msb(a(1)));
                let flipped = aig.xor(msb(&sum), msb(a(0)));
                one(aig.and(same, flipped))
            }
            K::BvUsubo => one(encode_ult(aig, a(0), a(1))),
            K::BvSsubo => {
                let diff = encode_sub(aig, a(0), a(1));
                let differ = aig.xor(msb(a(0)), msb(a(1)));
                let flipped = aig.xor(msb(&diff), msb(a(0)));
                one(aig.and(differ, flipped))
            }
            K::BvUmulo => {
                let w = a(0).len();
                let x = extend(a(0), w, AigEdge::FALSE);
                let y = extend(a(1), w, AigEdge::FALSE);
                let p = encode_mul(aig, &x, &y);
                one(aig.or_all(p[w..].iter().copied()))
            }
            K::BvSmulo => {
                let w = a(0).len();
                let x = extend(a(0), w, msb(a(0)));
                let y = extend(a(1), w, msb(a(1)));
                let p = encode_mul(aig, &x, &y);
                let sign = p[w - 1];
                let mut diff = Vec::with_capacity(w);
                for &bit in &p[w..] {
                    diff.push(aig.xor(bit, sign));
                }
                one(aig.or_all(diff))
            }
            K::BvSdivo => {
                let w = a(0).len();
                let mut min = zeros(w);
                min[w - 1] = AigEdge::TRUE;
                let is_min = encode_eq(aig, a(0), &min);
                let is_ones = encode_eq(aig, a(1), &ones(w));
                one(aig.and(is_min, is_ones))
            }

            K::FpAbs => {
                let mut bits = a(0).to_vec();
                if let Some(sign) = bits.last_mut() {
                    *sign = AigEdge::FALSE;
                }
                bits
            }
            K::FpNeg => float::negate(aig, fp_format(&sort)?, a(0)),
            K::FpIsNan | K::FpIsInf | K::FpIsZero | K::FpIsSubnormal | K::FpIsNormal | K::FpIsNeg
            | K::FpIsPos => {
                let FpFormat { eb, sb } = fp_format(tm.sort_kind(term.args[0]))?;
                one(fp_classify(aig, term.kind, a(0), eb, sb))
            }
            K::FpEqual => {
                let FpFormat { eb, sb } = fp_format(tm.sort_kind(term.args[0]))?;
                one(fp_eq(aig, a(0), a(1), eb, sb))
            }
            K::FpLt | K::FpGt => {
                let FpFormat { eb, sb } = fp_format(tm.sort_kind(term.args[0]))?;
                let (x, y) = if term.kind == K::FpLt { (a(0), a(1)) } else { (a(1), a(0)) };
                one(fp_lt(aig, x, y, eb, sb))
            }
            K::FpLeq | K::FpGeq => {
                let FpFormat { eb, sb } = fp_format(tm.sort_kind(term.args[0]))?;
                let (x, y) = if term.kind == K::FpLeq { (a(0), a(1)) } else { (a(1), a(0)) };
                let lt = fp_lt(aig, x, y, eb, sb);
                let eq = fp_eq(aig, x, y, eb, sb);
                one(aig.or(lt, eq))
            }
            K::FpFp => {
                let FpFormat { eb, sb } = fp_format(&sort)?;
                let mut raw = a(2).to_vec();
                raw.extend_from_slice(a(1));
                raw.extend_from_slice(a(0));
                fp_canonicalize(aig, &raw, eb, sb)
            }
            K::FpToFpFromBv => {
                let FpFormat { eb, sb } = fp_format(&sort)?;
                fp_canonicalize(aig, a(0), eb, sb)
            }
            K::FpAdd
            | K::FpSub
            | K::FpMul
            | K::FpDiv
            | K::FpFma
            | K::FpSqrt
            | K::FpRem
            | K::FpRti
            | K::FpMin
            | K::FpMax
            | K::FpToFpFromFp
            | K::FpToFpFromSbv
            | K::FpToFpFromUbv
            | K::FpToSbv
            | K::FpToUbv => {
                self.stats.fp_circuits += 1;
                encode_fp_arith(aig, tm, id, &args, &sort)?
            }

            K::ArraySelect
            | K::ArrayStore
            | K::ConstArray
            | K::Apply
            | K::Lambda
            | K::Forall
            | K::Exists => {
                return Err(OxbitError::unsupported(format!(
                    "'{}' must be eliminated before bit-blasting",
                    term.kind
                )));
            }
        };
        Ok(bits)
    }

    fn encode_input(&mut self, aig: &mut Aig, id: TermId, sort: &SortKind) -> Result<Bits> {
        let bits = match sort {
            SortKind::Bool => aig.inputs(1),
            SortKind::BitVec(w) => aig.inputs(*w),
            SortKind::RoundingMode => {
                let bits = aig.inputs(3);
                let bound = constant_bits(5, 3);
                let valid = encode_ult(aig, &bits, &bound);
                self.side.push(valid);
                bits
            }
            SortKind::FloatingPoint { exp, sig } => {
                let bits = aig.inputs(exp + sig);
                let nan = fp_is_nan(aig, &bits, *exp, *sig);
                let canon = fp_nan_bits(*exp, *sig);
                let is_canon = encode_eq(aig, &bits, &canon);
                let side = aig.implies(nan, is_canon);
                self.side.push(side);
                bits
            }
            SortKind::Array { .. } | SortKind::Function { .. } => {
                return Err(OxbitError::unsupported(
                    "array or function constant reached the bit-blaster",
                ));
            }
        };
        self.stats.inputs += 1;
        self.inputs.push((id, bits.clone()));
        Ok(bits)
    }
}

/// Number of bits used for a scalar sort
///
/// # Errors
///
/// Arrays and functions have no bit representation.
pub fn bit_width(sort: &SortKind) -> Result<u32> {
    match sort {
        SortKind::Bool => Ok(1),
        SortKind::BitVec(w) => Ok(*w),
        SortKind::RoundingMode => Ok(3),
        SortKind::FloatingPoint { exp, sig } => Ok(exp + sig),
        SortKind::Array { .. } | SortKind::Function { .. } => {
            Err(OxbitError::unsupported("sort has no bit representation"))
        }
    }
}

/// Decode a scalar value from concrete bits
#[must_use]
pub fn decode(sort: &SortKind, bits: &[bool]) -> Option<Value> {
    oxbit_core::fold::value_from_bits(sort, bits)
}

fn fp_format(sort: &SortKind) -> Result<FpFormat> {
    match sort {
        SortKind::FloatingPoint { exp, sig } => Ok(FpFormat::new(*exp, *sig)),
        _ => Err(OxbitError::type_error("expected a floating-point sort")),
    }
}

/// Rounding arithmetic and conversions; operands follow the term's
/// argument order, rounding mode first
fn encode_fp_arith(aig: &mut Aig, tm: &TermManager, id: TermId, args: &[Bits], sort: &SortKind) -> Result<Bits> {
    use TermKind as K;
    let term = &tm[id];
    let a = |i: usize| args[i].as_slice();
    let operand_format = |i: usize| fp_format(tm.sort_kind(term.args[i]));
    let width = term.indices.first().copied().unwrap_or(0);
    let bits = match term.kind {
        K::FpAdd => float::add(aig, fp_format(sort)?, a(0), a(1), a(2)),
        K::FpSub => float::sub(aig, fp_format(sort)?, a(0), a(1), a(2)),
        K::FpMul => float::mul(aig, fp_format(sort)?, a(0), a(1), a(2)),
        K::FpDiv => float::div(aig, fp_format(sort)?, a(0), a(1), a(2)),
        K::FpFma => float::fma(aig, fp_format(sort)?, a(0), a(1), a(2), a(3)),
        K::FpSqrt => float::sqrt(aig, fp_format(sort)?, a(0), a(1)),
        K::FpRti => float::round_to_integral(aig, fp_format(sort)?, a(0), a(1)),
        K::FpRem => float::rem(aig, fp_format(sort)?, a(0), a(1)),
        K::FpMin => float::min_max(aig, fp_format(sort)?, a(0), a(1), false),
        K::FpMax => float::min_max(aig, fp_format(sort)?, a(0), a(1), true),
        K::FpToFpFromFp => float::convert(aig, operand_format(1)?, fp_format(sort)?, a(0), a(1)),
        K::FpToFpFromSbv => float::from_bv(aig, fp_format(sort)?, a(0), a(1), true),
        K::FpToFpFromUbv => float::from_bv(aig, fp_format(sort)?, a(0), a(1), false),
        K::FpToSbv => float::to_bv(aig, operand_format(1)?, a(0), a(1), width, true),
        K::FpToUbv => float::to_bv(aig, operand_format(1)?, a(0), a(1), width, false),
        other => {
            return Err(OxbitError::unsupported(format!("'{other}' is not a rounding operator")));
        }
    };
    Ok(bits)
}

fn zeros(w: usize) -> Bits {
    vec![AigEdge::FALSE; w]
}

fn ones(w: usize) -> Bits {
    vec![AigEdge::TRUE; w]
}

fn msb(a: &[AigEdge]) -> AigEdge {
    a.last().copied().unwrap_or(AigEdge::FALSE)
}

pub(super) fn constant_bits(value: u64, w: u32) -> Bits {
    (0..w).map(|i| AigEdge::constant(i < 64 && value >> i & 1 == 1)).collect()
}

fn extend(a: &[AigEdge], n: usize, fill: AigEdge) -> Bits {
    let mut bits = a.to_vec();
    bits.extend(std::iter::repeat_n(fill, n));
    bits
}

fn zip_with(
    aig: &mut Aig,
    a: &[AigEdge],
    b: &[AigEdge],
    f: impl Fn(&mut Aig, AigEdge, AigEdge) -> AigEdge,
) -> Bits {
    a.iter().zip(b).map(|(&x, &y)| f(aig, x, y)).collect()
}

/// Bitwise multiplexer
pub fn encode_mux(aig: &mut Aig, c: AigEdge, t: &[AigEdge], e: &[AigEdge]) -> Bits {
    t.iter().zip(e).map(|(&x, &y)| aig.ite(c, x, y)).collect()
}

/// Bitwise equality
pub fn encode_eq(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> AigEdge {
    let mut eqs = Vec::with_capacity(a.len());
    for (&x, &y) in a.iter().zip(b) {
        eqs.push(aig.xnor(x, y));
    }
    aig.and_all(eqs)
}

/// Ripple-carry adder; returns the sum and the carry out
pub fn encode_add(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge], carry_in: AigEdge) -> (Bits, AigEdge) {
    let mut carry = carry_in;
    let mut sum = Vec::with_capacity(a.len());
    for (&x, &y) in a.iter().zip(b) {
        let p = aig.xor(x, y);
        sum.push(aig.xor(p, carry));
        let g = aig.and(x, y);
        let c = aig.and(p, carry);
        carry = aig.or(g, c);
    }
    (sum, carry)
}

pub(super) fn encode_sub(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> Bits {
    let nb: Bits = b.iter().map(|&x| !x).collect();
    encode_add(aig, a, &nb, AigEdge::TRUE).0
}

pub(super) fn encode_neg(aig: &mut Aig, a: &[AigEdge]) -> Bits {
    let na: Bits = a.iter().map(|&x| !x).collect();
    encode_add(aig, &na, &zeros(a.len()), AigEdge::TRUE).0
}

/// Unsigned less-than via the borrow of `a - b`
pub fn encode_ult(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> AigEdge {
    let nb: Bits = b.iter().map(|&x| !x).collect();
    !encode_add(aig, a, &nb, AigEdge::TRUE).1
}

pub(super) fn encode_slt(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> AigEdge {
    let flip = |v: &[AigEdge]| {
        let mut v = v.to_vec();
        if let Some(m) = v.last_mut() {
            *m = !*m;
        }
        v
    };
    encode_ult(aig, &flip(a), &flip(b))
}

/// Shift-and-add multiplier, truncated to the operand width
pub fn encode_mul(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> Bits {
    let w = a.len();
    let mut acc = zeros(w);
    for (i, &bi) in b.iter().enumerate() {
        if bi == AigEdge::FALSE {
            continue;
        }
        let mut partial = zeros(w);
        for j in 0..w - i {
            partial[i + j] = aig.and(a[j], bi);
        }
        // bits below i are unaffected by this partial product
        let (hi, _) = encode_add(aig, &acc[i..], &partial[i..], AigEdge::FALSE);
        acc.truncate(i);
        acc.extend(hi);
    }
    acc
}

/// Restoring division; division by zero yields all ones and the dividend
pub fn encode_udivrem(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> (Bits, Bits) {
    let w = a.len();
    let divisor = extend(b, 1, AigEdge::FALSE);
    let mut rem = zeros(w + 1);
    let mut quot = zeros(w);
    for i in (0..w).rev() {
        let mut shifted = Vec::with_capacity(w + 1);
        shifted.push(a[i]);
        shifted.extend_from_slice(&rem[..w]);
        let ge = !encode_ult(aig, &shifted, &divisor);
        let diff = encode_sub(aig, &shifted, &divisor);
        rem = encode_mux(aig, ge, &diff, &shifted);
        quot[i] = ge;
    }
    rem.truncate(w);
    (quot, rem)
}

fn encode_abs(aig: &mut Aig, a: &[AigEdge]) -> Bits {
    let neg = encode_neg(aig, a);
    encode_mux(aig, msb(a), &neg, a)
}

fn encode_sdiv(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> Bits {
    let (ua, ub) = (encode_abs(aig, a), encode_abs(aig, b));
    let (q, _) = encode_udivrem(aig, &ua, &ub);
    let nq = encode_neg(aig, &q);
    let differ = aig.xor(msb(a), msb(b));
    encode_mux(aig, differ, &nq, &q)
}

fn encode_srem(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> Bits {
    let (ua, ub) = (encode_abs(aig, a), encode_abs(aig, b));
    let (_, r) = encode_udivrem(aig, &ua, &ub);
    let nr = encode_neg(aig, &r);
    encode_mux(aig, msb(a), &nr, &r)
}

fn encode_smod(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge]) -> Bits {
    let (sa, sb) = (msb(a), msb(b));
    let (ua, ub) = (encode_abs(aig, a), encode_abs(aig, b));
    let (_, u) = encode_udivrem(aig, &ua, &ub);
    let nu = encode_neg(aig, &u);
    let u_is_zero = encode_eq(aig, &u, &zeros(u.len()));
    let neg_plus_b = encode_add(aig, &nu, b, AigEdge::FALSE).0;
    let plus_b = encode_add(aig, &u, b, AigEdge::FALSE).0;
    // sign cases: (+,+) u, (-,+) -u+b, (+,-) u+b, (-,-) -u
    let when_b_pos = encode_mux(aig, sa, &neg_plus_b, &u);
    let when_b_neg = encode_mux(aig, sa, &nu, &plus_b);
    let by_sign = encode_mux(aig, sb, &when_b_neg, &when_b_pos);
    encode_mux(aig, u_is_zero, &u, &by_sign)
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum Shift {
    Left,
    Logical,
    Arithmetic,
}

pub(super) fn encode_shift(aig: &mut Aig, a: &[AigEdge], s: &[AigEdge], dir: Shift) -> Bits {
    let w = a.len();
    let fill = if dir == Shift::Arithmetic { msb(a) } else { AigEdge::FALSE };
    let mut r = a.to_vec();
    let mut overflow = AigEdge::FALSE;
    for (k, &sk) in s.iter().enumerate() {
        let amount = 1usize.checked_shl(k as u32).filter(|&n| n < w);
        let Some(n) = amount else {
            overflow = aig.or(overflow, sk);
            continue;
        };
        let shifted: Bits = (0..w)
            .map(|i| match dir {
                Shift::Left => {
                    if i >= n {
                        r[i - n]
                    } else {
                        AigEdge::FALSE
                    }
                }
                Shift::Logical | Shift::Arithmetic => {
                    if i + n < w {
                        r[i + n]
                    } else {
                        fill
                    }
                }
            })
            .collect();
        r = encode_mux(aig, sk, &shifted, &r);
    }
    let saturated = vec![fill; w];
    encode_mux(aig, overflow, &saturated, &r)
}

fn rotate_const(a: &[AigEdge], n: u32, left: bool) -> Bits {
    let w = a.len();
    let n = n as usize % w;
    (0..w)
        .map(|i| if left { a[(i + w - n) % w] } else { a[(i + n) % w] })
        .collect()
}

fn encode_rotate(aig: &mut Aig, a: &[AigEdge], s: &[AigEdge], left: bool) -> Bits {
    let w = a.len();
    if w == 1 {
        return a.to_vec();
    }
    let width = constant_bits(w as u64, s.len() as u32);
    let (_, amount) = encode_udivrem(aig, s, &width);
    let mut r = a.to_vec();
    for (k, &bit) in amount.iter().enumerate() {
        let Some(n) = 1usize.checked_shl(k as u32).filter(|&n| n < w) else {
            break;
        };
        let rotated = rotate_const(&r, n as u32, left);
        r = encode_mux(aig, bit, &rotated, &r);
    }
    r
}

fn fp_fields(a: &[AigEdge], eb: u32, sb: u32) -> (&[AigEdge], &[AigEdge], AigEdge) {
    let m = (sb - 1) as usize;
    let e = eb as usize;
    (&a[..m], &a[m..m + e], a[m + e])
}

pub(super) fn fp_is_nan(aig: &mut Aig, a: &[AigEdge], eb: u32, sb: u32) -> AigEdge {
    let (sig, exp, _) = fp_fields(a, eb, sb);
    let exp_ones = aig.and_all(exp.iter().copied());
    let sig_nonzero = aig.or_all(sig.iter().copied());
    aig.and(exp_ones, sig_nonzero)
}

/// Bit pattern of the canonical NaN
#[must_use]
pub fn fp_nan_bits(eb: u32, sb: u32) -> Bits {
    let mut bits = zeros((eb + sb) as usize);
    bits[(sb - 2) as usize] = AigEdge::TRUE;
    for b in &mut bits[(sb - 1) as usize..(sb - 1 + eb) as usize] {
        *b = AigEdge::TRUE;
    }
    bits
}

fn fp_canonicalize(aig: &mut Aig, raw: &[AigEdge], eb: u32, sb: u32) -> Bits {
    let nan = fp_is_nan(aig, raw, eb, sb);
    encode_mux(aig, nan, &fp_nan_bits(eb, sb), raw)
}

fn fp_is_zero(aig: &mut Aig, a: &[AigEdge], eb: u32, sb: u32) -> AigEdge {
    let (sig, exp, _) = fp_fields(a, eb, sb);
    let body: Vec<AigEdge> = sig.iter().chain(exp).map(|&x| !x).collect();
    aig.and_all(body)
}

fn fp_classify(aig: &mut Aig, kind: TermKind, a: &[AigEdge], eb: u32, sb: u32) -> AigEdge {
    let (sig, exp, sign) = fp_fields(a, eb, sb);
    let exp_ones = aig.and_all(exp.iter().copied());
    let exp_zero = !aig.or_all(exp.iter().copied());
    let sig_zero = !aig.or_all(sig.iter().copied());
    let nan = aig.and(exp_ones, !sig_zero);
    match kind {
        TermKind::FpIsNan => nan,
        TermKind::FpIsInf => aig.and(exp_ones, sig_zero),
        TermKind::FpIsZero => aig.and(exp_zero, sig_zero),
        TermKind::FpIsSubnormal => aig.and(exp_zero, !sig_zero),
        TermKind::FpIsNormal => aig.and(!exp_zero, !exp_ones),
        TermKind::FpIsNeg => aig.and(!nan, sign),
        _ => aig.and(!nan, !sign),
    }
}

fn fp_eq(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge], eb: u32, sb: u32) -> AigEdge {
    let na = fp_is_nan(aig, a, eb, sb);
    let nb = fp_is_nan(aig, b, eb, sb);
    let same = encode_eq(aig, a, b);
    let za = fp_is_zero(aig, a, eb, sb);
    let zb = fp_is_zero(aig, b, eb, sb);
    let zeros = aig.and(za, zb);
    let eq = aig.or(same, zeros);
    let ordered = aig.and(!na, !nb);
    aig.and(ordered, eq)
}

pub(super) fn fp_lt(aig: &mut Aig, a: &[AigEdge], b: &[AigEdge], eb: u32, sb: u32) -> AigEdge {
    let n = a.len() - 1;
    let (sa, sb_) = (a[n], b[n]);
    let na = fp_is_nan(aig, a, eb, sb);
    let nb = fp_is_nan(aig, b, eb, sb);
    let za = fp_is_zero(aig, a, eb, sb);
    let zb = fp_is_zero(aig, b, eb, sb);
    let mag_lt = encode_ult(aig, &a[..n], &b[..n]);
    let mag_gt = encode_ult(aig, &b[..n], &a[..n]);
    let neg_pos = aig.and(sa, !sb_);
    let both_pos = aig.and(!sa, !sb_);
    let pos_case = aig.and(both_pos, mag_lt);
    let both_neg = aig.and(sa, sb_);
    let neg_case = aig.and(both_neg, mag_gt);
    let cases = aig.or_all([neg_pos, pos_case, neg_case]);
    let both_zero = aig.and(za, zb);
    let ordered = aig.and_all([!na, !nb, !both_zero]);
    aig.and(ordered, cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aig::edge_value;
    use oxbit_core::fold::fold;
    use oxbit_core::value::{BitVec, RoundingMode};

    fn eval_bits(aig: &Aig, bits: &[AigEdge]) -> u64 {
        let values = aig.simulate(|_| false);
        bits.iter()
            .enumerate()
            .map(|(i, &e)| u64::from(edge_value(&values, e)) << i)
            .sum()
    }

    fn check_binary(kind: TermKind, x: u64, y: u64) {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(6).unwrap();
        let a = tm.mk_bv_value_u64(s, x).unwrap();
        let b = tm.mk_bv_value_u64(s, y).unwrap();
        let t = tm.mk_term(kind, &[a, b], &[]).unwrap();
        let mut aig = Aig::new();
        let mut blaster = Blaster::new();
        let bits = blaster.blast(&mut aig, &tm, t).unwrap();
        let va = Value::BitVec(BitVec::from_u64(6, x));
        let vb = Value::BitVec(BitVec::from_u64(6, y));
        let expected = fold(kind, &[], &[va, vb]).unwrap();
        let expected: u64 = expected
            .to_bits()
            .iter()
            .enumerate()
            .map(|(i, &b)| u64::from(b) << i)
            .sum();
        assert_eq!(eval_bits(&aig, &bits), expected, "{kind} {x} {y}");
    }

    #[test]
    fn test_arithmetic_circuits_match_folding() {
        let kinds = [
            TermKind::BvAdd,
            TermKind::BvSub,
            TermKind::BvMul,
            TermKind::BvUdiv,
            TermKind::BvUrem,
            TermKind::BvSdiv,
            TermKind::BvSrem,
            TermKind::BvSmod,
            TermKind::BvShl,
            TermKind::BvShr,
            TermKind::BvAshr,
            TermKind::BvRol,
            TermKind::BvRor,
            TermKind::BvUlt,
            TermKind::BvSle,
            TermKind::BvSaddo,
            TermKind::BvSmulo,
            TermKind::BvUmulo,
            TermKind::BvSdivo,
        ];
        let samples = [0u64, 1, 5, 31, 32, 33, 63, 17, 40];
        for kind in kinds {
            for &x in &samples {
                for &y in &samples {
                    check_binary(kind, x, y);
                }
            }
        }
    }

    #[test]
    fn test_fp_arithmetic_on_values_matches_folding() {
        let mut tm = TermManager::new();
        let f16 = tm.mk_fp_sort(5, 11).unwrap();
        let x = tm.mk_fp_value_from_real(f16, RoundingMode::Rne, "1.5").unwrap();
        let y = tm.mk_fp_value_from_real(f16, RoundingMode::Rne, "-0.3").unwrap();
        let z = tm.mk_fp_value_from_real(f16, RoundingMode::Rne, "1000.25").unwrap();
        let rm = tm.mk_rm_value(RoundingMode::Rtp);
        let terms = [
            tm.mk_term(TermKind::FpAdd, &[rm, x, y], &[]).unwrap(),
            tm.mk_term(TermKind::FpSub, &[rm, y, z], &[]).unwrap(),
            tm.mk_term(TermKind::FpMul, &[rm, z, z], &[]).unwrap(),
            tm.mk_term(TermKind::FpDiv, &[rm, x, y], &[]).unwrap(),
            tm.mk_term(TermKind::FpFma, &[rm, x, y, z], &[]).unwrap(),
            tm.mk_term(TermKind::FpSqrt, &[rm, z], &[]).unwrap(),
            tm.mk_term(TermKind::FpRem, &[z, y], &[]).unwrap(),
            tm.mk_term(TermKind::FpRti, &[rm, y], &[]).unwrap(),
            tm.mk_term(TermKind::FpMin, &[x, y], &[]).unwrap(),
            tm.mk_term(TermKind::FpToFpFromFp, &[rm, z], &[8, 24]).unwrap(),
            tm.mk_term(TermKind::FpToSbv, &[rm, z], &[12]).unwrap(),
            tm.mk_term(TermKind::FpToUbv, &[rm, x], &[4]).unwrap(),
        ];
        let mut aig = Aig::new();
        let mut blaster = Blaster::new();
        for t in terms {
            let bits = blaster.blast(&mut aig, &tm, t).unwrap();
            assert!(bits.iter().all(|e| e.is_const()), "{t} did not fold");
            let raw: Vec<bool> = bits.iter().map(|&e| e == AigEdge::TRUE).collect();
            let args: Vec<Value> = tm[t].args.iter().map(|&a| tm.value_of(a).cloned().unwrap()).collect();
            let expected = fold(tm[t].kind, &tm[t].indices, &args).unwrap();
            assert_eq!(decode(tm.sort_kind(t), &raw), Some(expected), "{}", tm[t].kind);
        }
        assert_eq!(blaster.stats().fp_circuits, 12);
    }

    #[test]
    fn test_fp_const_side_constraint() {
        let mut tm = TermManager::new();
        let s = tm.mk_fp_sort(3, 3).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let mut aig = Aig::new();
        let mut blaster = Blaster::new();
        let bits = blaster.blast(&mut aig, &tm, x).unwrap();
        assert_eq!(bits.len(), 6);
        assert_eq!(blaster.take_side_constraints().len(), 1);
        assert!(blaster.take_side_constraints().is_empty());
    }

    #[test]
    fn test_arrays_rejected() {
        let mut tm = TermManager::new();
        let bv = tm.mk_bv_sort(4).unwrap();
        let arr = tm.mk_array_sort(bv, bv).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(bv, Some("i"));
        let r = tm.mk_select(a, i).unwrap();
        let mut aig = Aig::new();
        let err = Blaster::new().blast(&mut aig, &tm, r).unwrap_err();
        assert!(matches!(err, OxbitError::Unsupported(_)));
    }
}
