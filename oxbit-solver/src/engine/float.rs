//! Floating-point circuits
//!
//! Operands are unpacked into class flags, a sign, a signed unbiased
//! exponent and a significand with the hidden bit made explicit. Subnormal
//! operands are normalized while unpacking, so every finite nonzero operand
//! has its most significant significand bit set. Arithmetic runs on this
//! form and funnels into [`round`], which shifts into the subnormal range,
//! rounds under the rounding-mode bits, handles overflow and packs the
//! result back into the interchange layout.
//!
//! The circuits agree bit for bit with the rational kernel in
//! `oxbit_core::value::fp`, including the canonical NaN and the signs of
//! zero results.
//!
//! ## References
//!
//! - IEEE Std 754-2019, clauses 4 and 5
//! - M. Brain, et al. "Building Better Bit-Blasting for Floating-Point
//!   Problems", TACAS 2019

use super::aig::{Aig, AigEdge};
use super::blast::{
    Bits, Shift, constant_bits, encode_add, encode_eq, encode_mul, encode_mux, encode_neg, encode_shift,
    encode_slt, encode_sub, encode_ult, fp_is_nan, fp_lt, fp_nan_bits,
};

/// Exponent and significand widths of a floating-point sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpFormat {
    /// Exponent width
    pub eb: u32,
    /// Significand width including the hidden bit
    pub sb: u32,
}

fn bit_len(x: u32) -> u32 {
    u32::BITS - x.leading_zeros()
}

impl FpFormat {
    /// Format with the given widths
    #[must_use]
    pub fn new(eb: u32, sb: u32) -> Self {
        Self { eb, sb }
    }

    fn bias(self) -> i64 {
        (1i64 << (self.eb - 1)) - 1
    }

    fn emin(self) -> i64 {
        1 - self.bias()
    }

    fn precision(self) -> usize {
        self.sb as usize
    }

    /// Width of signed exponents in circuits over this format; `extra` is
    /// the width of an integer operand, if any
    fn exp_width(self, extra: u32) -> usize {
        (self.eb.max(bit_len(self.sb)).max(bit_len(extra)) + 5) as usize
    }

    fn nan(self) -> Bits {
        fp_nan_bits(self.eb, self.sb)
    }

    fn pack(self, sign: AigEdge, exp: AigEdge, frac: AigEdge) -> Bits {
        let mut bits = vec![frac; (self.sb - 1) as usize];
        bits.extend(std::iter::repeat_n(exp, self.eb as usize));
        bits.push(sign);
        bits
    }

    fn inf(self, sign: AigEdge) -> Bits {
        self.pack(sign, AigEdge::TRUE, AigEdge::FALSE)
    }

    fn zero(self, sign: AigEdge) -> Bits {
        self.pack(sign, AigEdge::FALSE, AigEdge::FALSE)
    }

    fn max_finite(self, sign: AigEdge) -> Bits {
        let mut bits = self.pack(sign, AigEdge::TRUE, AigEdge::TRUE);
        bits[(self.sb - 1) as usize] = AigEdge::FALSE;
        bits
    }
}

/// Decoded rounding-mode bits
#[derive(Debug, Clone, Copy)]
pub struct RoundingBits {
    rne: AigEdge,
    rna: AigEdge,
    rtp: AigEdge,
    rtn: AigEdge,
}

impl RoundingBits {
    /// Decode the three-bit mode code
    pub fn decode(aig: &mut Aig, rm: &[AigEdge]) -> Self {
        let mut is = |code: u64| encode_eq(aig, rm, &constant_bits(code, 3));
        Self {
            rne: is(0),
            rna: is(1),
            rtp: is(2),
            rtn: is(3),
        }
    }

    /// Round to nearest, ties to even
    #[must_use]
    pub fn nearest_even() -> Self {
        Self {
            rne: AigEdge::TRUE,
            rna: AigEdge::FALSE,
            rtp: AigEdge::FALSE,
            rtn: AigEdge::FALSE,
        }
    }

    /// Does a magnitude with the given low bits round away from zero
    fn round_up(self, aig: &mut Aig, sign: AigEdge, lsb: AigEdge, guard: AigEdge, sticky: AigEdge) -> AigEdge {
        let inexact = aig.or(guard, sticky);
        let odd_or_above = aig.or(sticky, lsb);
        let even = aig.and(guard, odd_or_above);
        let rne = aig.and(self.rne, even);
        let rna = aig.and(self.rna, guard);
        let toward_pos = aig.and(self.rtp, !sign);
        let rtp = aig.and(toward_pos, inexact);
        let toward_neg = aig.and(self.rtn, sign);
        let rtn = aig.and(toward_neg, inexact);
        aig.or_all([rne, rna, rtp, rtn])
    }

    /// Does an overflow saturate to infinity rather than the largest
    /// finite number
    fn overflows_to_inf(self, aig: &mut Aig, sign: AigEdge) -> AigEdge {
        let rtp = aig.and(self.rtp, !sign);
        let rtn = aig.and(self.rtn, sign);
        aig.or_all([self.rne, self.rna, rtp, rtn])
    }
}

/// `(-1)^sign * sig * 2^(exp - len(sig) + 1)`; `sticky` stands for nonzero
/// bits below the significand
#[derive(Debug, Clone)]
struct Unrounded {
    sign: AigEdge,
    exp: Bits,
    sig: Bits,
    sticky: AigEdge,
}

#[derive(Debug, Clone)]
struct Unpacked {
    nan: AigEdge,
    inf: AigEdge,
    zero: AigEdge,
    value: Unrounded,
}

fn signed_const(v: i64, w: usize) -> Bits {
    (0..w)
        .map(|i| AigEdge::constant(if i < 63 { v >> i & 1 == 1 } else { v < 0 }))
        .collect()
}

fn zext(a: &[AigEdge], w: usize) -> Bits {
    let mut bits = a.to_vec();
    bits.resize(w, AigEdge::FALSE);
    bits
}

fn inc(aig: &mut Aig, a: &[AigEdge]) -> Bits {
    encode_add(aig, a, &zext(&[], a.len()), AigEdge::TRUE).0
}

fn dec(aig: &mut Aig, a: &[AigEdge]) -> Bits {
    let ones = vec![AigEdge::TRUE; a.len()];
    encode_add(aig, a, &ones, AigEdge::FALSE).0
}

fn any(aig: &mut Aig, a: &[AigEdge]) -> AigEdge {
    aig.or_all(a.iter().copied())
}

/// One position towards the most significant end, shifting in zero
fn shl1(a: &[AigEdge]) -> Bits {
    let mut bits = Vec::with_capacity(a.len());
    bits.push(AigEdge::FALSE);
    bits.extend_from_slice(&a[..a.len() - 1]);
    bits
}

/// Priority selection: the first case whose condition holds, else `default`
fn select(aig: &mut Aig, cases: Vec<(AigEdge, Bits)>, default: Bits) -> Bits {
    let mut r = default;
    for (c, v) in cases.into_iter().rev() {
        r = encode_mux(aig, c, &v, &r);
    }
    r
}

/// Logical right shift by a variable amount; the second result is set
/// when a one was shifted out
fn shift_right_sticky(aig: &mut Aig, a: &[AigEdge], amount: &[AigEdge]) -> (Bits, AigEdge) {
    let w = a.len();
    let mut r = a.to_vec();
    let mut sticky = AigEdge::FALSE;
    let mut overflow = AigEdge::FALSE;
    for (k, &bit) in amount.iter().enumerate() {
        let Some(n) = 1usize.checked_shl(k as u32).filter(|&n| n < w) else {
            overflow = aig.or(overflow, bit);
            continue;
        };
        let lost = any(aig, &r[..n]);
        let lost = aig.and(bit, lost);
        sticky = aig.or(sticky, lost);
        let shifted: Bits = (0..w)
            .map(|i| if i + n < w { r[i + n] } else { AigEdge::FALSE })
            .collect();
        r = encode_mux(aig, bit, &shifted, &r);
    }
    let rest = any(aig, &r);
    let flushed = aig.and(overflow, rest);
    sticky = aig.or(sticky, flushed);
    let r = encode_mux(aig, overflow, &zext(&[], w), &r);
    (r, sticky)
}

/// Shift left until the most significant bit is set; returns the shifted
/// bits and the shift amount as a `count_width`-bit number. A zero input
/// yields unspecified results.
fn normalize(aig: &mut Aig, a: &[AigEdge], count_width: usize) -> (Bits, Bits) {
    let w = a.len();
    let mut r = a.to_vec();
    let mut count = zext(&[], count_width);
    let stages = usize::BITS - (w.max(1) - 1).leading_zeros();
    for j in (0..stages as usize).rev() {
        let n = 1usize << j;
        let high = any(aig, &r[w - n..]);
        let top_zero = !high;
        let shifted: Bits = (0..w).map(|i| if i >= n { r[i - n] } else { AigEdge::FALSE }).collect();
        r = encode_mux(aig, top_zero, &shifted, &r);
        if j < count_width {
            count[j] = top_zero;
        }
    }
    (r, count)
}

fn unpack(aig: &mut Aig, fmt: FpFormat, x: &[AigEdge], ew: usize) -> Unpacked {
    let m = (fmt.sb - 1) as usize;
    let e = fmt.eb as usize;
    let (frac, field, sign) = (&x[..m], &x[m..m + e], x[m + e]);
    let exp_ones = aig.and_all(field.iter().copied());
    let exp_nonzero = any(aig, field);
    let frac_nonzero = any(aig, frac);
    let nan = aig.and(exp_ones, frac_nonzero);
    let inf = aig.and(exp_ones, !frac_nonzero);
    let zero = aig.and(!exp_nonzero, !frac_nonzero);
    let subnormal = aig.and(!exp_nonzero, frac_nonzero);

    let mut normal_sig = frac.to_vec();
    normal_sig.push(AigEdge::TRUE);
    let normal_exp = encode_sub(aig, &zext(field, ew), &signed_const(fmt.bias(), ew));

    let (sub_sig, lz) = normalize(aig, &zext(frac, m + 1), ew);
    let sub_exp = encode_sub(aig, &signed_const(fmt.emin(), ew), &lz);

    let sig = encode_mux(aig, subnormal, &sub_sig, &normal_sig);
    let exp = encode_mux(aig, subnormal, &sub_exp, &normal_exp);
    Unpacked {
        nan,
        inf,
        zero,
        value: Unrounded {
            sign,
            exp,
            sig,
            sticky: AigEdge::FALSE,
        },
    }
}

/// Round a nonzero normalized value into `fmt`
fn round(aig: &mut Aig, fmt: FpFormat, rm: RoundingBits, v: &Unrounded) -> Bits {
    let p = fmt.precision();
    let ew = v.exp.len();
    let mut sig = v.sig.clone();
    if sig.len() < p + 2 {
        let mut padded = zext(&[], p + 2 - sig.len());
        padded.extend(sig);
        sig = padded;
    }
    let w = sig.len();

    // below the normal range the significand moves right until the
    // exponent reaches emin
    let emin = signed_const(fmt.emin(), ew);
    let below = encode_slt(aig, &v.exp, &emin);
    let distance = encode_sub(aig, &emin, &v.exp);
    let distance = encode_mux(aig, below, &distance, &zext(&[], ew));
    let (shifted, lost) = shift_right_sticky(aig, &sig, &distance);
    let exp = encode_mux(aig, below, &emin, &v.exp);

    let kept = &shifted[w - p..];
    let guard = shifted[w - p - 1];
    let low = any(aig, &shifted[..w - p - 1]);
    let sticky = aig.or_all([low, v.sticky, lost]);
    let up = rm.round_up(aig, v.sign, kept[0], guard, sticky);
    let (rounded, carry) = encode_add(aig, kept, &zext(&[], p), up);

    let mut hidden_only = zext(&[], p);
    hidden_only[p - 1] = AigEdge::TRUE;
    let sig = encode_mux(aig, carry, &hidden_only, &rounded);
    let bumped = inc(aig, &exp);
    let exp = encode_mux(aig, carry, &bumped, &exp);

    let overflow = encode_slt(aig, &signed_const(fmt.bias(), ew), &exp);
    let biased = encode_add(aig, &exp, &signed_const(fmt.bias(), ew), AigEdge::FALSE).0;
    let field = encode_mux(aig, sig[p - 1], &biased[..fmt.eb as usize], &zext(&[], fmt.eb as usize));
    let mut packed = sig[..p - 1].to_vec();
    packed.extend(field);
    packed.push(v.sign);

    let to_inf = rm.overflows_to_inf(aig, v.sign);
    let saturated = encode_mux(aig, to_inf, &fmt.inf(v.sign), &fmt.max_finite(v.sign));
    encode_mux(aig, overflow, &saturated, &packed)
}

/// Exact sum of two nonzero normalized values with significands of equal
/// width. The first result is set when the sum is exactly zero; otherwise
/// the second is the normalized sum, with the bits shifted out of the
/// smaller operand folded into its lowest bit.
fn add_exact(aig: &mut Aig, a: &Unrounded, b: &Unrounded) -> (AigEdge, Unrounded) {
    let ew = a.exp.len();
    let exp_lt = encode_slt(aig, &a.exp, &b.exp);
    let exp_eq = encode_eq(aig, &a.exp, &b.exp);
    let sig_lt = encode_ult(aig, &a.sig, &b.sig);
    let tie_lt = aig.and(exp_eq, sig_lt);
    let swap = aig.or(exp_lt, tie_lt);

    let sign = aig.ite(swap, b.sign, a.sign);
    let small_sign = aig.ite(swap, a.sign, b.sign);
    let large_exp = encode_mux(aig, swap, &b.exp, &a.exp);
    let small_exp = encode_mux(aig, swap, &a.exp, &b.exp);
    let large_sig = encode_mux(aig, swap, &b.sig, &a.sig);
    let small_sig = encode_mux(aig, swap, &a.sig, &b.sig);

    // three bits below the significands and a carry bit above
    let widen = |sig: &[AigEdge]| {
        let mut bits = vec![AigEdge::FALSE; 3];
        bits.extend_from_slice(sig);
        bits.push(AigEdge::FALSE);
        bits
    };
    let diff = encode_sub(aig, &large_exp, &small_exp);
    let (mut aligned, lost) = shift_right_sticky(aig, &widen(&small_sig), &diff);
    aligned[0] = aig.or(aligned[0], lost);
    let large = widen(&large_sig);

    let subtract = aig.xor(sign, small_sign);
    let difference = encode_sub(aig, &large, &aligned);
    let sum = encode_add(aig, &large, &aligned, AigEdge::FALSE).0;
    let r = encode_mux(aig, subtract, &difference, &sum);
    let zero = !any(aig, &r);
    let (sig, lz) = normalize(aig, &r, ew);
    let top = inc(aig, &large_exp);
    let exp = encode_sub(aig, &top, &lz);
    (
        zero,
        Unrounded {
            sign,
            exp,
            sig,
            sticky: AigEdge::FALSE,
        },
    )
}

/// Full product of two normalized values, renormalized
fn multiply_exact(aig: &mut Aig, a: &Unrounded, b: &Unrounded, sign: AigEdge) -> Unrounded {
    let w = a.sig.len() + b.sig.len();
    let product = encode_mul(aig, &zext(&a.sig, w), &zext(&b.sig, w));
    let sum = encode_add(aig, &a.exp, &b.exp, AigEdge::FALSE).0;
    let exp = inc(aig, &sum);
    let top = product[w - 1];
    let sig = encode_mux(aig, top, &product, &shl1(&product));
    let lowered = dec(aig, &exp);
    let exp = encode_mux(aig, top, &exp, &lowered);
    Unrounded {
        sign,
        exp,
        sig,
        sticky: AigEdge::FALSE,
    }
}

/// `x + y`
pub fn add(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], x: &[AigEdge], y: &[AigEdge]) -> Bits {
    let ew = fmt.exp_width(0);
    let rm = RoundingBits::decode(aig, rm);
    let ux = unpack(aig, fmt, x, ew);
    let uy = unpack(aig, fmt, y, ew);

    let (cancelled, sum) = add_exact(aig, &ux.value, &uy.value);
    let rounded = round(aig, fmt, rm, &sum);
    let rounded = encode_mux(aig, cancelled, &fmt.zero(rm.rtn), &rounded);

    let same_sign = aig.xnor(ux.value.sign, uy.value.sign);
    let zero_sign = aig.ite(same_sign, ux.value.sign, rm.rtn);
    let both_inf = aig.and(ux.inf, uy.inf);
    let inf_minus_inf = aig.and(both_inf, !same_sign);
    let nan = aig.or_all([ux.nan, uy.nan, inf_minus_inf]);
    let both_zero = aig.and(ux.zero, uy.zero);
    select(
        aig,
        vec![
            (nan, fmt.nan()),
            (ux.inf, x.to_vec()),
            (uy.inf, y.to_vec()),
            (both_zero, fmt.zero(zero_sign)),
            (ux.zero, y.to_vec()),
            (uy.zero, x.to_vec()),
        ],
        rounded,
    )
}

/// `x - y`
pub fn sub(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], x: &[AigEdge], y: &[AigEdge]) -> Bits {
    let ny = negate(aig, fmt, y);
    add(aig, fmt, rm, x, &ny)
}

/// Sign flip that keeps NaN canonical
pub fn negate(aig: &mut Aig, fmt: FpFormat, x: &[AigEdge]) -> Bits {
    let nan = fp_is_nan(aig, x, fmt.eb, fmt.sb);
    let mut bits = x.to_vec();
    if let Some(sign) = bits.last_mut() {
        *sign = aig.and(!*sign, !nan);
    }
    bits
}

/// `x * y`
pub fn mul(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], x: &[AigEdge], y: &[AigEdge]) -> Bits {
    let ew = fmt.exp_width(0);
    let rm = RoundingBits::decode(aig, rm);
    let ux = unpack(aig, fmt, x, ew);
    let uy = unpack(aig, fmt, y, ew);
    let sign = aig.xor(ux.value.sign, uy.value.sign);
    let product = multiply_exact(aig, &ux.value, &uy.value, sign);
    let rounded = round(aig, fmt, rm, &product);

    let inf_zero = aig.and(ux.inf, uy.zero);
    let zero_inf = aig.and(ux.zero, uy.inf);
    let nan = aig.or_all([ux.nan, uy.nan, inf_zero, zero_inf]);
    let inf = aig.or(ux.inf, uy.inf);
    let zero = aig.or(ux.zero, uy.zero);
    select(
        aig,
        vec![(nan, fmt.nan()), (inf, fmt.inf(sign)), (zero, fmt.zero(sign))],
        rounded,
    )
}

/// `x / y`
pub fn div(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], x: &[AigEdge], y: &[AigEdge]) -> Bits {
    let ew = fmt.exp_width(0);
    let p = fmt.precision();
    let rm = RoundingBits::decode(aig, rm);
    let ux = unpack(aig, fmt, x, ew);
    let uy = unpack(aig, fmt, y, ew);
    let sign = aig.xor(ux.value.sign, uy.value.sign);

    // restoring division: the dividend is below twice the divisor, so the
    // first quotient bit has weight one
    let w = p + 2;
    let divisor = zext(&uy.value.sig, w);
    let mut rem = zext(&ux.value.sig, w);
    let mut quot = zext(&[], p + 3);
    for i in (0..p + 3).rev() {
        let ge = !encode_ult(aig, &rem, &divisor);
        let diff = encode_sub(aig, &rem, &divisor);
        rem = encode_mux(aig, ge, &diff, &rem);
        quot[i] = ge;
        rem = shl1(&rem);
    }
    let sticky = any(aig, &rem);
    let exp = encode_sub(aig, &ux.value.exp, &uy.value.exp);
    let top = quot[p + 2];
    let sig = encode_mux(aig, top, &quot, &shl1(&quot));
    let lowered = dec(aig, &exp);
    let exp = encode_mux(aig, top, &exp, &lowered);
    let rounded = round(aig, fmt, rm, &Unrounded { sign, exp, sig, sticky });

    let both_inf = aig.and(ux.inf, uy.inf);
    let both_zero = aig.and(ux.zero, uy.zero);
    let nan = aig.or_all([ux.nan, uy.nan, both_inf, both_zero]);
    let inf = aig.or(ux.inf, uy.zero);
    let zero = aig.or(ux.zero, uy.inf);
    select(
        aig,
        vec![(nan, fmt.nan()), (inf, fmt.inf(sign)), (zero, fmt.zero(sign))],
        rounded,
    )
}

/// `a * b + c` with a single rounding
pub fn fma(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], a: &[AigEdge], b: &[AigEdge], c: &[AigEdge]) -> Bits {
    let ew = fmt.exp_width(0);
    let p = fmt.precision();
    let rm = RoundingBits::decode(aig, rm);
    let ua = unpack(aig, fmt, a, ew);
    let ub = unpack(aig, fmt, b, ew);
    let uc = unpack(aig, fmt, c, ew);
    let product_sign = aig.xor(ua.value.sign, ub.value.sign);
    let product = multiply_exact(aig, &ua.value, &ub.value, product_sign);

    // the addend is widened to the width of the exact product
    let mut addend = uc.value.clone();
    let mut wide = zext(&[], p);
    wide.extend_from_slice(&uc.value.sig);
    addend.sig = wide;
    let (cancelled, sum) = add_exact(aig, &product, &addend);
    let rounded_sum = round(aig, fmt, rm, &sum);
    let rounded_sum = encode_mux(aig, cancelled, &fmt.zero(rm.rtn), &rounded_sum);
    let rounded_product = round(aig, fmt, rm, &product);

    let product_zero = aig.or(ua.zero, ub.zero);
    let product_inf = aig.or(ua.inf, ub.inf);
    let same_sign = aig.xnor(product_sign, uc.value.sign);
    let zero_sign = aig.ite(same_sign, product_sign, rm.rtn);
    let inf_zero = aig.and(ua.inf, ub.zero);
    let zero_inf = aig.and(ua.zero, ub.inf);
    let opposite_infs = aig.and_all([product_inf, uc.inf, !same_sign]);
    let nan = aig.or_all([ua.nan, ub.nan, uc.nan, inf_zero, zero_inf, opposite_infs]);
    let both_zero = aig.and(product_zero, uc.zero);
    select(
        aig,
        vec![
            (nan, fmt.nan()),
            (product_inf, fmt.inf(product_sign)),
            (uc.inf, c.to_vec()),
            (both_zero, fmt.zero(zero_sign)),
            (product_zero, c.to_vec()),
            (uc.zero, rounded_product),
        ],
        rounded_sum,
    )
}

/// Integer square root of a radicand of even width `2n`; returns the `n`
/// root bits and whether the remainder is nonzero
fn isqrt(aig: &mut Aig, m: &[AigEdge]) -> (Bits, AigEdge) {
    let n = m.len() / 2;
    let mut rem = zext(&[], n + 2);
    let mut root = zext(&[], n);
    for i in (0..n).rev() {
        let mut next = vec![m[2 * i], m[2 * i + 1]];
        next.extend_from_slice(&rem[..n]);
        rem = next;
        let mut trial = vec![AigEdge::TRUE, AigEdge::FALSE];
        trial.extend_from_slice(&root);
        let ge = !encode_ult(aig, &rem, &trial);
        let diff = encode_sub(aig, &rem, &trial);
        rem = encode_mux(aig, ge, &diff, &rem);
        let mut shifted = vec![ge];
        shifted.extend_from_slice(&root[..n - 1]);
        root = shifted;
    }
    let sticky = any(aig, &rem);
    (root, sticky)
}

/// Square root
pub fn sqrt(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], x: &[AigEdge]) -> Bits {
    let ew = fmt.exp_width(0);
    let p = fmt.precision();
    let rm = RoundingBits::decode(aig, rm);
    let ux = unpack(aig, fmt, x, ew);

    // radicand sig * 2^t with t = p + 3 + (exp mod 2), so that the
    // remaining power of two is even and the root has p + 2 bits
    let odd = ux.value.exp[0];
    let mut radicand = zext(&[], p + 3);
    radicand.extend_from_slice(&ux.value.sig);
    radicand.push(AigEdge::FALSE);
    let radicand = encode_mux(aig, odd, &shl1(&radicand), &radicand);
    let (root, sticky) = isqrt(aig, &radicand);

    let mut t = signed_const((p + 3) as i64, ew);
    t = encode_add(aig, &t, &zext(&[odd], ew), AigEdge::FALSE).0;
    let scaled = encode_add(aig, &ux.value.exp, &signed_const(1 - p as i64, ew), AigEdge::FALSE).0;
    let twice_k = encode_sub(aig, &scaled, &t);
    let mut k = twice_k[1..].to_vec();
    k.push(twice_k[ew - 1]);
    let exp = encode_add(aig, &k, &signed_const((p + 1) as i64, ew), AigEdge::FALSE).0;
    let rounded = round(
        aig,
        fmt,
        rm,
        &Unrounded {
            sign: AigEdge::FALSE,
            exp,
            sig: root,
            sticky,
        },
    );

    let negative = aig.and(ux.value.sign, !ux.zero);
    let nan = aig.or(ux.nan, negative);
    let unchanged = aig.or(ux.zero, ux.inf);
    select(aig, vec![(nan, fmt.nan()), (unchanged, x.to_vec())], rounded)
}

/// IEEE remainder `x - y * n` with `n` the integer nearest to `x / y`,
/// ties to even
pub fn rem(aig: &mut Aig, fmt: FpFormat, x: &[AigEdge], y: &[AigEdge]) -> Bits {
    let ew = fmt.exp_width(0);
    let p = fmt.precision();
    let ux = unpack(aig, fmt, x, ew);
    let uy = unpack(aig, fmt, y, ew);
    let d = encode_sub(aig, &ux.value.exp, &uy.value.exp);
    // |x| < |y| / 2, so n = 0
    let tiny = encode_slt(aig, &d, &signed_const(-1, ew));

    // long division over the exponent difference, in units of half an ulp
    // of y: d + 1 reduce-and-double steps followed by a final reduction
    let w = p + 2;
    let steps = (2 * fmt.bias()) as usize + p - 1;
    let count = inc(aig, &d);
    let modulus = shl1(&zext(&uy.value.sig, w));
    let mut r = zext(&ux.value.sig, w);
    for i in 0..steps {
        let active = encode_slt(aig, &signed_const(i as i64, ew), &count);
        let ge = !encode_ult(aig, &r, &modulus);
        let diff = encode_sub(aig, &r, &modulus);
        let reduced = encode_mux(aig, ge, &diff, &r);
        r = encode_mux(aig, active, &shl1(&reduced), &r);
    }
    let odd = !encode_ult(aig, &r, &modulus);
    let diff = encode_sub(aig, &r, &modulus);
    let r = encode_mux(aig, odd, &diff, &r);

    let half = zext(&uy.value.sig, w);
    let above = encode_ult(aig, &half, &r);
    let tie = encode_eq(aig, &r, &half);
    let tie_odd = aig.and(tie, odd);
    let up = aig.or(above, tie_odd);
    let complement = encode_sub(aig, &modulus, &r);
    let magnitude = encode_mux(aig, up, &complement, &r);
    let zero = !any(aig, &magnitude);
    let (sig, lz) = normalize(aig, &magnitude, ew);
    let top = inc(aig, &uy.value.exp);
    let exp = encode_sub(aig, &top, &lz);
    let sign = aig.xor(ux.value.sign, up);
    let exact = round(
        aig,
        fmt,
        RoundingBits::nearest_even(),
        &Unrounded {
            sign,
            exp,
            sig,
            sticky: AigEdge::FALSE,
        },
    );
    let exact = encode_mux(aig, zero, &fmt.zero(ux.value.sign), &exact);

    let nan = aig.or_all([ux.nan, uy.nan, ux.inf, uy.zero]);
    let unchanged = aig.or_all([uy.inf, ux.zero, tiny]);
    select(aig, vec![(nan, fmt.nan()), (unchanged, x.to_vec())], exact)
}

/// Magnitude of `sig >> amount` rounded to an integer; one bit wider than
/// `sig`
fn round_shifted(aig: &mut Aig, rm: RoundingBits, sign: AigEdge, sig: &[AigEdge], amount: &[AigEdge]) -> Bits {
    let mut fixed = vec![AigEdge::FALSE; 2];
    fixed.extend_from_slice(sig);
    let (shifted, lost) = shift_right_sticky(aig, &fixed, amount);
    let int = &shifted[2..];
    let sticky = aig.or(shifted[0], lost);
    let up = rm.round_up(aig, sign, int[0], shifted[1], sticky);
    let w = int.len() + 1;
    encode_add(aig, &zext(int, w), &zext(&[], w), up).0
}

/// Round to an integral value
pub fn round_to_integral(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], x: &[AigEdge]) -> Bits {
    let ew = fmt.exp_width(0);
    let p = fmt.precision();
    let rm = RoundingBits::decode(aig, rm);
    let ux = unpack(aig, fmt, x, ew);
    let amount = encode_sub(aig, &signed_const(p as i64 - 1, ew), &ux.value.exp);
    let integral = !encode_slt(aig, &zext(&[], ew), &amount);
    let int = round_shifted(aig, rm, ux.value.sign, &ux.value.sig, &amount);
    let zero = !any(aig, &int);
    let (sig, lz) = normalize(aig, &int, ew);
    let exp = encode_sub(aig, &signed_const(p as i64, ew), &lz);
    let packed = round(
        aig,
        fmt,
        RoundingBits::nearest_even(),
        &Unrounded {
            sign: ux.value.sign,
            exp,
            sig,
            sticky: AigEdge::FALSE,
        },
    );
    let packed = encode_mux(aig, zero, &fmt.zero(ux.value.sign), &packed);
    let unchanged = aig.or_all([ux.nan, ux.inf, ux.zero, integral]);
    encode_mux(aig, unchanged, x, &packed)
}

/// Minimum (`max == false`) or maximum; a NaN operand yields the other
/// operand and zeros of opposite sign order `-0` below `+0`
pub fn min_max(aig: &mut Aig, fmt: FpFormat, x: &[AigEdge], y: &[AigEdge], max: bool) -> Bits {
    let ew = fmt.exp_width(0);
    let ux = unpack(aig, fmt, x, ew);
    let uy = unpack(aig, fmt, y, ew);
    let (pick_y, zero_sign) = if max {
        (
            fp_lt(aig, x, y, fmt.eb, fmt.sb),
            aig.and(ux.value.sign, uy.value.sign),
        )
    } else {
        (
            fp_lt(aig, y, x, fmt.eb, fmt.sb),
            aig.or(ux.value.sign, uy.value.sign),
        )
    };
    let both_zero = aig.and(ux.zero, uy.zero);
    let ordered = encode_mux(aig, pick_y, y, x);
    select(
        aig,
        vec![
            (ux.nan, y.to_vec()),
            (uy.nan, x.to_vec()),
            (both_zero, fmt.zero(zero_sign)),
        ],
        ordered,
    )
}

/// Conversion between formats
pub fn convert(aig: &mut Aig, from: FpFormat, to: FpFormat, rm: &[AigEdge], x: &[AigEdge]) -> Bits {
    let ew = from.exp_width(0).max(to.exp_width(0));
    let rm = RoundingBits::decode(aig, rm);
    let ux = unpack(aig, from, x, ew);
    let rounded = round(aig, to, rm, &ux.value);
    select(
        aig,
        vec![
            (ux.nan, to.nan()),
            (ux.inf, to.inf(ux.value.sign)),
            (ux.zero, to.zero(ux.value.sign)),
        ],
        rounded,
    )
}

/// Conversion from a signed or unsigned bit-vector; zero maps to `+0`
pub fn from_bv(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], bv: &[AigEdge], signed: bool) -> Bits {
    let w = bv.len();
    let ew = fmt.exp_width(w as u32);
    let rm = RoundingBits::decode(aig, rm);
    let sign = if signed { bv[w - 1] } else { AigEdge::FALSE };
    let negated = encode_neg(aig, bv);
    let magnitude = encode_mux(aig, sign, &negated, bv);
    let zero = !any(aig, &magnitude);
    let (sig, lz) = normalize(aig, &magnitude, ew);
    let exp = encode_sub(aig, &signed_const(w as i64 - 1, ew), &lz);
    let rounded = round(
        aig,
        fmt,
        rm,
        &Unrounded {
            sign,
            exp,
            sig,
            sticky: AigEdge::FALSE,
        },
    );
    encode_mux(aig, zero, &fmt.zero(AigEdge::FALSE), &rounded)
}

/// Conversion to a `width`-bit signed or unsigned bit-vector; NaN,
/// infinities and out-of-range values map to zero
pub fn to_bv(aig: &mut Aig, fmt: FpFormat, rm: &[AigEdge], x: &[AigEdge], width: u32, signed: bool) -> Bits {
    let w = width as usize;
    let p = fmt.precision();
    let ew = fmt.exp_width(width + fmt.sb);
    let rm = RoundingBits::decode(aig, rm);
    let ux = unpack(aig, fmt, x, ew);
    let m = w.max(p) + 2;

    let amount = encode_sub(aig, &signed_const(p as i64 - 1, ew), &ux.value.exp);
    let fractional = encode_slt(aig, &zext(&[], ew), &amount);
    let rounded = round_shifted(aig, rm, ux.value.sign, &ux.value.sig, &amount);
    let left = encode_sub(aig, &ux.value.exp, &signed_const(p as i64 - 1, ew));
    let scaled = encode_shift(aig, &zext(&ux.value.sig, m), &left, Shift::Left);
    let int = encode_mux(aig, fractional, &zext(&rounded, m), &scaled);
    // beyond 2^(width + 1) no format fits; this also bounds the shift above
    let huge = encode_slt(aig, &signed_const(i64::from(width), ew), &ux.value.exp);

    let (fits, value) = if signed {
        let mut limit = zext(&[], m);
        limit[w - 1] = AigEdge::TRUE;
        let within_neg = !encode_ult(aig, &limit, &int);
        let within_pos = encode_ult(aig, &int, &limit);
        let fits = aig.ite(ux.value.sign, within_neg, within_pos);
        let negated = encode_neg(aig, &int);
        let value = encode_mux(aig, ux.value.sign, &negated, &int);
        (fits, value[..w].to_vec())
    } else {
        let nonzero = any(aig, &int);
        let negative = aig.and(ux.value.sign, nonzero);
        let high = any(aig, &int[w..]);
        (aig.and(!negative, !high), int[..w].to_vec())
    };
    let invalid = aig.or_all([ux.nan, ux.inf, ux.zero, huge]);
    let ok = aig.and(fits, !invalid);
    encode_mux(aig, ok, &value, &zext(&[], w))
}
