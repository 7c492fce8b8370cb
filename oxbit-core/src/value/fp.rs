//! IEEE-754 floating-point kernel
//!
//! Values use the interchange layout `sign | exponent | trailing significand`
//! for an arbitrary format `(eb, sb)` where `sb` counts the hidden bit.
//! Every operation is computed exactly over rationals and rounded once, so
//! results are bit-exact for all five rounding modes.
//!
//! There is a single NaN: sign 0, all-ones exponent and the most significant
//! trailing significand bit set. Any NaN bit pattern is canonicalized on
//! construction.
//!
//! ## References
//!
//! - IEEE Std 754-2019, clauses 4 (rounding) and 5 (operations)
//! - SMT-LIB FloatingPoint theory, version 2.6

use super::RoundingMode;
use super::bitvec::BitVec;
use crate::error::{OxbitError, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

/// A floating-point literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FpValue {
    eb: u32,
    sb: u32,
    bits: BitVec,
}

fn pow2(k: i64) -> BigRational {
    if k >= 0 {
        BigRational::from_integer(BigInt::one() << k as usize)
    } else {
        BigRational::new(BigInt::one(), BigInt::one() << (-k) as usize)
    }
}

fn half() -> BigRational {
    BigRational::new(BigInt::one(), BigInt::from(2))
}

/// `e` such that `2^e <= q < 2^(e+1)`, for positive `q`
fn floor_log2(q: &BigRational) -> i64 {
    let n = q.numer().magnitude().bits() as i64;
    let d = q.denom().magnitude().bits() as i64;
    let e = n - d;
    if *q < pow2(e) { e - 1 } else { e }
}

/// Round a rational to an integer under `rm`
#[must_use]
pub fn round_to_int(q: &BigRational, rm: RoundingMode) -> BigInt {
    let fl = q.floor();
    let frac = q - &fl;
    let fl = fl.to_integer();
    if frac.is_zero() {
        return fl;
    }
    let h = half();
    let up = match rm {
        RoundingMode::Rne => frac > h || (frac == h && fl.is_odd()),
        RoundingMode::Rna => frac > h || (frac == h && q.is_positive()),
        RoundingMode::Rtp => true,
        RoundingMode::Rtn => false,
        RoundingMode::Rtz => q.is_negative(),
    };
    if up { fl + BigInt::one() } else { fl }
}

/// Parse a decimal string (`[-+]digits[.digits][e[-+]digits]`) into a
/// rational. Returns the rational and whether a minus sign was present.
pub fn parse_decimal(s: &str) -> Result<(BigRational, bool)> {
    let bad = || OxbitError::value(format!("invalid decimal literal '{s}'"));
    let s = s.trim();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => {
            let e: i64 = body[pos + 1..].parse().map_err(|_| bad())?;
            (&body[..pos], e)
        }
        None => (body, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(bad());
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let digits = format!("{int_part}{frac_part}");
    let num = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(bad)?;
    let scale = exponent - frac_part.len() as i64;
    let ten = BigInt::from(10);
    let mut q = BigRational::from_integer(num);
    if scale >= 0 {
        q *= BigRational::from_integer(num_traits::pow(ten, scale as usize));
    } else {
        q /= BigRational::from_integer(num_traits::pow(ten, (-scale) as usize));
    }
    if negative {
        q = -q;
    }
    Ok((q, negative))
}

impl FpValue {
    fn bias(eb: u32) -> i64 {
        (1i64 << (eb - 1)) - 1
    }

    fn emin(eb: u32) -> i64 {
        1 - Self::bias(eb)
    }

    fn max_exp_field(eb: u32) -> u64 {
        (1u64 << eb) - 1
    }

    fn encode(eb: u32, sb: u32, sign: bool, exp: u64, trailing: BigUint) -> Self {
        let value = (BigUint::from(u64::from(sign)) << (eb + sb - 1) as usize)
            | (BigUint::from(exp) << (sb - 1) as usize)
            | trailing;
        Self { eb, sb, bits: BitVec::new(eb + sb, value) }
    }

    /// Reinterpret a bit pattern of width `eb + sb`; NaNs are canonicalized
    #[must_use]
    pub fn from_bits(eb: u32, sb: u32, bits: BitVec) -> Self {
        debug_assert_eq!(bits.width(), eb + sb);
        let v = Self { eb, sb, bits };
        if v.is_nan() { Self::nan(eb, sb) } else { v }
    }

    /// Build from sign, exponent and trailing significand bit-vectors
    pub fn from_triple(sign: &BitVec, exp: &BitVec, sig: &BitVec) -> Result<Self> {
        if sign.width() != 1 {
            return Err(OxbitError::value("floating-point sign must be a 1-bit value"));
        }
        if exp.width() < 2 || sig.width() < 1 {
            return Err(OxbitError::value("invalid floating-point exponent/significand widths"));
        }
        let eb = exp.width();
        let sb = sig.width() + 1;
        Ok(Self::from_bits(eb, sb, sign.concat(exp).concat(sig)))
    }

    /// The canonical NaN
    #[must_use]
    pub fn nan(eb: u32, sb: u32) -> Self {
        Self::encode(eb, sb, false, Self::max_exp_field(eb), BigUint::one() << (sb - 2) as usize)
    }

    /// Signed zero
    #[must_use]
    pub fn zero(eb: u32, sb: u32, negative: bool) -> Self {
        Self::encode(eb, sb, negative, 0, BigUint::zero())
    }

    /// Signed infinity
    #[must_use]
    pub fn inf(eb: u32, sb: u32, negative: bool) -> Self {
        Self::encode(eb, sb, negative, Self::max_exp_field(eb), BigUint::zero())
    }

    /// Largest finite magnitude with the given sign
    #[must_use]
    pub fn max_finite(eb: u32, sb: u32, negative: bool) -> Self {
        Self::encode(
            eb,
            sb,
            negative,
            Self::max_exp_field(eb) - 1,
            (BigUint::one() << (sb - 1) as usize) - BigUint::one(),
        )
    }

    /// Exponent width
    #[must_use]
    pub fn eb(&self) -> u32 {
        self.eb
    }

    /// Significand width including the hidden bit
    #[must_use]
    pub fn sb(&self) -> u32 {
        self.sb
    }

    /// Underlying bit pattern
    #[must_use]
    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    /// Sign bit
    #[must_use]
    pub fn sign(&self) -> bool {
        self.bits.msb()
    }

    /// Biased exponent field
    #[must_use]
    pub fn exponent_field(&self) -> BitVec {
        self.bits.extract(self.eb + self.sb - 2, self.sb - 1)
    }

    /// Trailing significand field
    #[must_use]
    pub fn significand_field(&self) -> BitVec {
        self.bits.extract(self.sb - 2, 0)
    }

    fn exp_u64(&self) -> u64 {
        self.exponent_field().to_u64().unwrap_or(0)
    }

    /// NaN test
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.exp_u64() == Self::max_exp_field(self.eb) && !self.significand_field().is_zero()
    }

    /// Infinity test
    #[must_use]
    pub fn is_inf(&self) -> bool {
        self.exp_u64() == Self::max_exp_field(self.eb) && self.significand_field().is_zero()
    }

    /// Zero test (either sign)
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.exp_u64() == 0 && self.significand_field().is_zero()
    }

    /// Subnormal test
    #[must_use]
    pub fn is_subnormal(&self) -> bool {
        self.exp_u64() == 0 && !self.significand_field().is_zero()
    }

    /// Normal test
    #[must_use]
    pub fn is_normal(&self) -> bool {
        let e = self.exp_u64();
        e != 0 && e != Self::max_exp_field(self.eb)
    }

    /// Negative test (false for NaN)
    #[must_use]
    pub fn is_negative(&self) -> bool {
        !self.is_nan() && self.sign()
    }

    /// Positive test (false for NaN)
    #[must_use]
    pub fn is_positive(&self) -> bool {
        !self.is_nan() && !self.sign()
    }

    /// Exact value of a finite number
    #[must_use]
    pub fn to_rational(&self) -> Option<BigRational> {
        if self.is_nan() || self.is_inf() {
            return None;
        }
        let e = self.exp_u64() as i64;
        let t = BigInt::from(self.significand_field().value().clone());
        let p = i64::from(self.sb) - 1;
        let (m, scale) = if e == 0 {
            (t, Self::emin(self.eb) - p)
        } else {
            ((BigInt::one() << p as usize) + t, e - Self::bias(self.eb) - p)
        };
        let q = BigRational::from_integer(m) * pow2(scale);
        Some(if self.sign() { -q } else { q })
    }

    /// Round the magnitude `mag` with sign `negative` into format `(eb, sb)`
    #[must_use]
    pub fn round(eb: u32, sb: u32, rm: RoundingMode, negative: bool, mag: &BigRational) -> Self {
        if mag.is_zero() {
            return Self::zero(eb, sb, negative);
        }
        let emin = Self::emin(eb);
        let emax = Self::bias(eb);
        let p = i64::from(sb) - 1;
        let mut e = floor_log2(mag).max(emin);
        let scaled = mag * pow2(p - e);
        let fl = scaled.floor();
        let frac = &scaled - &fl;
        let mut m = fl.to_integer().magnitude().clone();
        let h = half();
        let up = !frac.is_zero()
            && match rm {
                RoundingMode::Rne => frac > h || (frac == h && m.is_odd()),
                RoundingMode::Rna => frac >= h,
                RoundingMode::Rtp => !negative,
                RoundingMode::Rtn => negative,
                RoundingMode::Rtz => false,
            };
        if up {
            m += BigUint::one();
        }
        if m == BigUint::one() << sb as usize {
            m >>= 1usize;
            e += 1;
        }
        if m.is_zero() {
            return Self::zero(eb, sb, negative);
        }
        if e > emax {
            return match rm {
                RoundingMode::Rne | RoundingMode::Rna => Self::inf(eb, sb, negative),
                RoundingMode::Rtz => Self::max_finite(eb, sb, negative),
                RoundingMode::Rtp if negative => Self::max_finite(eb, sb, true),
                RoundingMode::Rtp => Self::inf(eb, sb, false),
                RoundingMode::Rtn if negative => Self::inf(eb, sb, true),
                RoundingMode::Rtn => Self::max_finite(eb, sb, false),
            };
        }
        let hidden = BigUint::one() << p as usize;
        if m >= hidden {
            Self::encode(eb, sb, negative, (e + Self::bias(eb)) as u64, m - hidden)
        } else {
            Self::encode(eb, sb, negative, 0, m)
        }
    }

    /// Round a signed rational; zero maps to `+0`
    #[must_use]
    pub fn from_rational(eb: u32, sb: u32, rm: RoundingMode, q: &BigRational) -> Self {
        Self::round(eb, sb, rm, q.is_negative(), &q.abs())
    }

    /// Round a decimal string such as `"0.1"` or `"-1.5e3"`
    pub fn from_real_str(eb: u32, sb: u32, rm: RoundingMode, s: &str) -> Result<Self> {
        let (q, negative) = parse_decimal(s)?;
        Ok(Self::round(eb, sb, rm, negative, &q.abs()))
    }

    /// Round the quotient of two decimal strings
    pub fn from_rational_str(eb: u32, sb: u32, rm: RoundingMode, num: &str, den: &str) -> Result<Self> {
        let (n, _) = parse_decimal(num)?;
        let (d, _) = parse_decimal(den)?;
        if d.is_zero() {
            return Err(OxbitError::value("denominator must not be zero"));
        }
        Ok(Self::from_rational(eb, sb, rm, &(n / d)))
    }

    fn same_format(&self, other: &Self) -> bool {
        self.eb == other.eb && self.sb == other.sb
    }

    /// Negation (NaN stays canonical)
    #[must_use]
    pub fn neg(&self) -> Self {
        if self.is_nan() {
            return self.clone();
        }
        let flipped = self.bits.xor(&BitVec::one(1).concat(&BitVec::zero(self.eb + self.sb - 1)));
        Self { eb: self.eb, sb: self.sb, bits: flipped }
    }

    /// Absolute value
    #[must_use]
    pub fn abs(&self) -> Self {
        if self.sign() && !self.is_nan() { self.neg() } else { self.clone() }
    }

    fn exact_sum(&self, rm: RoundingMode, a_sign: bool, a: BigRational, other: &Self) -> Self {
        let (eb, sb) = (self.eb, self.sb);
        let b = other.to_rational().unwrap_or_else(BigRational::zero);
        let a_zero = a.is_zero();
        let sum = a + b;
        if sum.is_zero() {
            let negative = if a_zero && other.is_zero() && a_sign == other.sign() {
                a_sign
            } else {
                rm == RoundingMode::Rtn
            };
            return Self::zero(eb, sb, negative);
        }
        Self::from_rational(eb, sb, rm, &sum)
    }

    /// Addition
    #[must_use]
    pub fn add(&self, rm: RoundingMode, other: &Self) -> Self {
        debug_assert!(self.same_format(other));
        let (eb, sb) = (self.eb, self.sb);
        if self.is_nan() || other.is_nan() {
            return Self::nan(eb, sb);
        }
        match (self.is_inf(), other.is_inf()) {
            (true, true) if self.sign() != other.sign() => return Self::nan(eb, sb),
            (true, _) => return self.clone(),
            (false, true) => return other.clone(),
            _ => {}
        }
        let a = self.to_rational().unwrap_or_else(BigRational::zero);
        self.exact_sum(rm, self.sign(), a, other)
    }

    /// Subtraction
    #[must_use]
    pub fn sub(&self, rm: RoundingMode, other: &Self) -> Self {
        self.add(rm, &other.neg())
    }

    /// Multiplication
    #[must_use]
    pub fn mul(&self, rm: RoundingMode, other: &Self) -> Self {
        debug_assert!(self.same_format(other));
        let (eb, sb) = (self.eb, self.sb);
        let negative = self.sign() ^ other.sign();
        if self.is_nan() || other.is_nan() {
            return Self::nan(eb, sb);
        }
        if (self.is_inf() && other.is_zero()) || (self.is_zero() && other.is_inf()) {
            return Self::nan(eb, sb);
        }
        if self.is_inf() || other.is_inf() {
            return Self::inf(eb, sb, negative);
        }
        let (Some(a), Some(b)) = (self.to_rational(), other.to_rational()) else {
            return Self::nan(eb, sb);
        };
        Self::round(eb, sb, rm, negative, &(a * b).abs())
    }

    /// Division
    #[must_use]
    pub fn div(&self, rm: RoundingMode, other: &Self) -> Self {
        debug_assert!(self.same_format(other));
        let (eb, sb) = (self.eb, self.sb);
        let negative = self.sign() ^ other.sign();
        if self.is_nan() || other.is_nan() {
            return Self::nan(eb, sb);
        }
        if (self.is_inf() && other.is_inf()) || (self.is_zero() && other.is_zero()) {
            return Self::nan(eb, sb);
        }
        if self.is_inf() || other.is_zero() {
            return Self::inf(eb, sb, negative);
        }
        if other.is_inf() || self.is_zero() {
            return Self::zero(eb, sb, negative);
        }
        let (Some(a), Some(b)) = (self.to_rational(), other.to_rational()) else {
            return Self::nan(eb, sb);
        };
        Self::round(eb, sb, rm, negative, &(a / b).abs())
    }

    /// Fused multiply-add `self * b + c` with a single rounding
    #[must_use]
    pub fn fma(&self, rm: RoundingMode, b: &Self, c: &Self) -> Self {
        let (eb, sb) = (self.eb, self.sb);
        if self.is_nan() || b.is_nan() || c.is_nan() {
            return Self::nan(eb, sb);
        }
        if (self.is_inf() && b.is_zero()) || (self.is_zero() && b.is_inf()) {
            return Self::nan(eb, sb);
        }
        let product_sign = self.sign() ^ b.sign();
        if self.is_inf() || b.is_inf() {
            if c.is_inf() && c.sign() != product_sign {
                return Self::nan(eb, sb);
            }
            return Self::inf(eb, sb, product_sign);
        }
        if c.is_inf() {
            return c.clone();
        }
        let (Some(x), Some(y)) = (self.to_rational(), b.to_rational()) else {
            return Self::nan(eb, sb);
        };
        self.exact_sum(rm, product_sign, x * y, c)
    }

    /// Square root
    #[must_use]
    pub fn sqrt(&self, rm: RoundingMode) -> Self {
        let (eb, sb) = (self.eb, self.sb);
        if self.is_nan() || (self.sign() && !self.is_zero()) {
            return Self::nan(eb, sb);
        }
        if self.is_zero() || self.is_inf() {
            return self.clone();
        }
        let Some(q) = self.to_rational() else {
            return Self::nan(eb, sb);
        };
        // Work at a precision finer than half the smallest ulp; an inexact
        // root is replaced by the midpoint of its enclosing interval.
        let k = i64::from(sb) - Self::emin(eb) + 2;
        let scaled = &q * pow2(2 * k);
        let floor = scaled.floor().to_integer().magnitude().clone();
        let root = floor.sqrt();
        let exact = scaled.is_integer() && &root * &root == floor;
        let approx = if exact {
            BigRational::from_integer(BigInt::from(root)) * pow2(-k)
        } else {
            let twice = (BigInt::from(root) << 1usize) + BigInt::one();
            BigRational::from_integer(twice) * pow2(-k - 1)
        };
        Self::round(eb, sb, rm, false, &approx)
    }

    /// IEEE remainder `self - other * n` with `n` the nearest integer (ties
    /// to even) to `self / other`
    #[must_use]
    pub fn rem(&self, other: &Self) -> Self {
        let (eb, sb) = (self.eb, self.sb);
        if self.is_nan() || other.is_nan() || self.is_inf() || other.is_zero() {
            return Self::nan(eb, sb);
        }
        if other.is_inf() || self.is_zero() {
            return self.clone();
        }
        let (Some(a), Some(b)) = (self.to_rational(), other.to_rational()) else {
            return Self::nan(eb, sb);
        };
        let n = round_to_int(&(&a / &b), RoundingMode::Rne);
        let r = a - b * BigRational::from_integer(n);
        if r.is_zero() {
            return Self::zero(eb, sb, self.sign());
        }
        Self::from_rational(eb, sb, RoundingMode::Rne, &r)
    }

    /// Round to an integral value
    #[must_use]
    pub fn round_to_integral(&self, rm: RoundingMode) -> Self {
        let (eb, sb) = (self.eb, self.sb);
        if self.is_nan() || self.is_inf() || self.is_zero() {
            return self.clone();
        }
        let Some(q) = self.to_rational() else {
            return Self::nan(eb, sb);
        };
        let r = round_to_int(&q, rm);
        if r.is_zero() {
            return Self::zero(eb, sb, self.sign());
        }
        Self::from_rational(eb, sb, RoundingMode::Rne, &BigRational::from_integer(r))
    }

    /// Ordering in the IEEE sense: `None` when either side is NaN; zeros
    /// compare equal
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        let rank = |v: &Self| -> i8 {
            if v.is_inf() {
                if v.sign() { -1 } else { 1 }
            } else {
                0
            }
        };
        match (rank(self), rank(other)) {
            (0, 0) => {
                let a = self.to_rational().unwrap_or_else(BigRational::zero);
                let b = other.to_rational().unwrap_or_else(BigRational::zero);
                Some(a.cmp(&b))
            }
            (x, y) => Some(x.cmp(&y)),
        }
    }

    /// IEEE equality
    #[must_use]
    pub fn fp_eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Less-than
    #[must_use]
    pub fn lt(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Less)
    }

    /// Less-or-equal
    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        matches!(self.compare(other), Some(Ordering::Less | Ordering::Equal))
    }

    /// Minimum; `min(-0, +0) = -0`
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        if self.is_nan() {
            return other.clone();
        }
        if other.is_nan() {
            return self.clone();
        }
        if self.is_zero() && other.is_zero() {
            return Self::zero(self.eb, self.sb, self.sign() || other.sign());
        }
        if other.lt(self) { other.clone() } else { self.clone() }
    }

    /// Maximum; `max(-0, +0) = +0`
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        if self.is_nan() {
            return other.clone();
        }
        if other.is_nan() {
            return self.clone();
        }
        if self.is_zero() && other.is_zero() {
            return Self::zero(self.eb, self.sb, self.sign() && other.sign());
        }
        if self.lt(other) { other.clone() } else { self.clone() }
    }

    /// Convert to another format
    #[must_use]
    pub fn convert(&self, rm: RoundingMode, eb: u32, sb: u32) -> Self {
        if self.is_nan() {
            return Self::nan(eb, sb);
        }
        if self.is_inf() {
            return Self::inf(eb, sb, self.sign());
        }
        if self.is_zero() {
            return Self::zero(eb, sb, self.sign());
        }
        match self.to_rational() {
            Some(q) => Self::round(eb, sb, rm, self.sign(), &q.abs()),
            None => Self::nan(eb, sb),
        }
    }

    /// Convert a signed bit-vector
    #[must_use]
    pub fn from_sbv(eb: u32, sb: u32, rm: RoundingMode, bv: &BitVec) -> Self {
        Self::from_rational(eb, sb, rm, &BigRational::from_integer(bv.to_signed()))
    }

    /// Convert an unsigned bit-vector
    #[must_use]
    pub fn from_ubv(eb: u32, sb: u32, rm: RoundingMode, bv: &BitVec) -> Self {
        Self::from_rational(eb, sb, rm, &BigRational::from_integer(BigInt::from(bv.value().clone())))
    }

    /// Convert to a signed bit-vector; NaN, infinities and out-of-range
    /// values map to zero
    #[must_use]
    pub fn to_sbv(&self, rm: RoundingMode, width: u32) -> BitVec {
        let Some(q) = self.to_rational() else {
            return BitVec::zero(width);
        };
        let r = round_to_int(&q, rm);
        let half = BigInt::one() << (width - 1) as usize;
        if r >= half || r < -half {
            return BitVec::zero(width);
        }
        BitVec::from_bigint(width, &r)
    }

    /// Convert to an unsigned bit-vector; NaN, infinities and out-of-range
    /// values map to zero
    #[must_use]
    pub fn to_ubv(&self, rm: RoundingMode, width: u32) -> BitVec {
        let Some(q) = self.to_rational() else {
            return BitVec::zero(width);
        };
        let r = round_to_int(&q, rm);
        if r.sign() == Sign::Minus || r.magnitude().bits() > u64::from(width) {
            return BitVec::zero(width);
        }
        BitVec::new(width, r.magnitude().clone())
    }

    /// `f64` approximation, for diagnostics
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        if self.is_nan() {
            return f64::NAN;
        }
        if self.is_inf() {
            return if self.sign() { f64::NEG_INFINITY } else { f64::INFINITY };
        }
        let v = self.to_rational().and_then(|q| q.to_f64()).unwrap_or(0.0);
        if self.is_zero() && self.sign() { -0.0 } else { v }
    }
}

impl fmt::Display for FpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(fp {} {} {})",
            BitVec::from_bool(self.sign()),
            self.exponent_field(),
            self.significand_field()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32v(x: f32) -> FpValue {
        FpValue::from_bits(8, 24, BitVec::from_u64(32, u64::from(x.to_bits())))
    }

    fn as_f32(v: &FpValue) -> f32 {
        f32::from_bits(v.bits().to_u64().unwrap_or(0) as u32)
    }

    #[test]
    fn test_decimal_rounding_matches_native() {
        let v = FpValue::from_real_str(8, 24, RoundingMode::Rne, "0.1").unwrap();
        assert_eq!(as_f32(&v), 0.1f32);
        let v = FpValue::from_real_str(11, 53, RoundingMode::Rne, "0.1").unwrap();
        assert_eq!(v.bits().to_u64(), Some(0.1f64.to_bits()));
    }

    #[test]
    fn test_directed_rounding() {
        let up = FpValue::from_real_str(8, 24, RoundingMode::Rtp, "0.1").unwrap();
        let down = FpValue::from_real_str(8, 24, RoundingMode::Rtn, "0.1").unwrap();
        assert!(down.lt(&up));
        assert_eq!(as_f32(&up), 0.1f32);
        assert_eq!(down.bits().to_u64(), Some(0x3DCC_CCCC));
    }

    #[test]
    fn test_arith_matches_native() {
        let pairs = [(1.5f32, 2.25f32), (0.1, 0.2), (-3.0, 7.0), (1e30, 1e30), (1e-40, 3.0)];
        for (a, b) in pairs {
            let (x, y) = (f32v(a), f32v(b));
            assert_eq!(as_f32(&x.add(RoundingMode::Rne, &y)), a + b);
            assert_eq!(as_f32(&x.sub(RoundingMode::Rne, &y)), a - b);
            assert_eq!(as_f32(&x.mul(RoundingMode::Rne, &y)), a * b);
            assert_eq!(as_f32(&x.div(RoundingMode::Rne, &y)), a / b);
        }
        assert_eq!(as_f32(&f32v(2.0).sqrt(RoundingMode::Rne)), 2.0f32.sqrt());
        assert_eq!(as_f32(&f32v(1e-40).sqrt(RoundingMode::Rne)), 1e-40f32.sqrt());
    }

    #[test]
    fn test_special_values() {
        let nan = FpValue::nan(8, 24);
        assert!(nan.is_nan());
        assert!(as_f32(&nan).is_nan());
        let inf = FpValue::inf(8, 24, false);
        assert!(inf.sub(RoundingMode::Rne, &inf).is_nan());
        let pz = FpValue::zero(8, 24, false);
        let nz = FpValue::zero(8, 24, true);
        assert!(pz.fp_eq(&nz));
        assert_ne!(pz, nz);
        assert!(!pz.add(RoundingMode::Rne, &nz).sign());
        assert!(pz.add(RoundingMode::Rtn, &nz).sign());
        assert!(f32v(1.0).div(RoundingMode::Rne, &nz).is_inf());
    }

    #[test]
    fn test_overflow_modes() {
        let max = FpValue::max_finite(8, 24, false);
        assert!(max.add(RoundingMode::Rne, &max).is_inf());
        assert_eq!(max.add(RoundingMode::Rtz, &max), max);
    }

    #[test]
    fn test_rem_and_round() {
        assert_eq!(as_f32(&f32v(5.0).rem(&f32v(3.0))), -1.0);
        assert_eq!(as_f32(&f32v(2.5).round_to_integral(RoundingMode::Rne)), 2.0);
        assert_eq!(as_f32(&f32v(2.5).round_to_integral(RoundingMode::Rna)), 3.0);
        assert_eq!(as_f32(&f32v(-2.5).round_to_integral(RoundingMode::Rtp)), -2.0);
    }

    #[test]
    fn test_conversions() {
        let v = f32v(-3.75);
        assert_eq!(v.to_sbv(RoundingMode::Rtz, 8).to_signed(), BigInt::from(-3));
        assert_eq!(v.to_sbv(RoundingMode::Rne, 8).to_signed(), BigInt::from(-4));
        let back = FpValue::from_sbv(8, 24, RoundingMode::Rne, &BitVec::from_u64(8, 0xfd));
        assert_eq!(as_f32(&back), -3.0);
        let d = f32v(0.1).convert(RoundingMode::Rne, 11, 53);
        assert_eq!(d.bits().to_u64(), Some(f64::from(0.1f32).to_bits()));
    }

    #[test]
    fn test_parse_decimal() {
        assert!(parse_decimal("1.5e3").is_ok());
        assert!(parse_decimal(".5").is_ok());
        assert!(parse_decimal("abc").unwrap_err().is_value_error());
        assert!(parse_decimal("").is_err());
    }
}
