//! Arbitrary-width bit-vector values
//!
//! Values are stored as an unsigned magnitude reduced modulo `2^width`.
//! Signed operations reinterpret the magnitude in two's complement.
//! Division and remainder by zero follow SMT-LIB: `bvudiv x 0 = ~0`,
//! `bvurem x 0 = x`, and the signed variants are defined in terms of them.

use crate::error::{OxbitError, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};
use std::fmt;

/// A bit-vector literal of fixed width
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitVec {
    width: u32,
    value: BigUint,
}

fn modulus(width: u32) -> BigUint {
    BigUint::one() << width as usize
}

fn ones_of(width: u32) -> BigUint {
    modulus(width) - BigUint::one()
}

impl BitVec {
    /// Build a bit-vector, reducing `value` modulo `2^width`
    #[must_use]
    pub fn new(width: u32, value: BigUint) -> Self {
        debug_assert!(width > 0);
        let value = if value.bits() > u64::from(width) {
            value & ones_of(width)
        } else {
            value
        };
        Self { width, value }
    }

    /// Build from a `u64`, truncating to `width` bits
    #[must_use]
    pub fn from_u64(width: u32, value: u64) -> Self {
        Self::new(width, BigUint::from(value))
    }

    /// Build from a signed integer in two's complement
    #[must_use]
    pub fn from_bigint(width: u32, value: &BigInt) -> Self {
        let m = BigInt::from(modulus(width));
        let mut r = value % &m;
        if r.sign() == Sign::Minus {
            r += &m;
        }
        Self::new(width, r.magnitude().clone())
    }

    /// Build from a single bit
    #[must_use]
    pub fn from_bool(b: bool) -> Self {
        Self::from_u64(1, u64::from(b))
    }

    /// Parse a literal string in base 2, 10 or 16.
    ///
    /// Binary and hexadecimal strings must fit the width exactly as an
    /// unsigned number. Decimal strings may carry a leading `-` and must fit
    /// either the unsigned or the signed range of the width.
    pub fn from_str_radix(width: u32, s: &str, base: u32) -> Result<Self> {
        if width == 0 {
            return Err(OxbitError::value("bit-vector width must be > 0"));
        }
        if s.is_empty() {
            return Err(OxbitError::value("empty bit-vector literal"));
        }
        match base {
            2 | 16 => {
                let value = BigUint::parse_bytes(s.as_bytes(), base).ok_or_else(|| {
                    OxbitError::value(format!("invalid base-{base} literal '{s}'"))
                })?;
                if value.bits() > u64::from(width) {
                    return Err(OxbitError::value(format!(
                        "literal '{s}' does not fit into {width} bits"
                    )));
                }
                Ok(Self::new(width, value))
            }
            10 => {
                let value = BigInt::parse_bytes(s.as_bytes(), 10)
                    .ok_or_else(|| OxbitError::value(format!("invalid decimal literal '{s}'")))?;
                let m = BigInt::from(modulus(width));
                let min_signed = -(BigInt::from(modulus(width - 1)));
                if value >= m || value < min_signed {
                    return Err(OxbitError::value(format!(
                        "literal '{s}' does not fit into {width} bits"
                    )));
                }
                Ok(Self::from_bigint(width, &value))
            }
            _ => Err(OxbitError::value(format!("unsupported base {base}"))),
        }
    }

    /// All-zero value
    #[must_use]
    pub fn zero(width: u32) -> Self {
        Self::new(width, BigUint::zero())
    }

    /// The value one
    #[must_use]
    pub fn one(width: u32) -> Self {
        Self::new(width, BigUint::one())
    }

    /// All-ones value
    #[must_use]
    pub fn ones(width: u32) -> Self {
        Self { width, value: ones_of(width) }
    }

    /// Smallest signed value (`100...0`)
    #[must_use]
    pub fn min_signed(width: u32) -> Self {
        Self { width, value: modulus(width - 1) }
    }

    /// Largest signed value (`011...1`)
    #[must_use]
    pub fn max_signed(width: u32) -> Self {
        Self { width, value: modulus(width - 1) - BigUint::one() }
    }

    /// Width in bits
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Unsigned magnitude
    #[must_use]
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Value as `u64` if it fits
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// Two's complement interpretation
    #[must_use]
    pub fn to_signed(&self) -> BigInt {
        if self.msb() {
            BigInt::from(self.value.clone()) - BigInt::from(modulus(self.width))
        } else {
            BigInt::from(self.value.clone())
        }
    }

    /// Bit at position `i` (0 = least significant)
    #[must_use]
    pub fn bit(&self, i: u32) -> bool {
        i < self.width && self.value.bit(u64::from(i))
    }

    /// Most significant bit
    #[must_use]
    pub fn msb(&self) -> bool {
        self.bit(self.width - 1)
    }

    /// Build from little-endian bits
    #[must_use]
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut value = BigUint::zero();
        for (i, &b) in bits.iter().enumerate() {
            if b {
                value.set_bit(i as u64, true);
            }
        }
        Self::new(bits.len().max(1) as u32, value)
    }

    /// Little-endian bits
    #[must_use]
    pub fn to_bits(&self) -> Vec<bool> {
        (0..self.width).map(|i| self.bit(i)).collect()
    }

    /// Is this zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Is this one
    #[must_use]
    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    /// Is this all ones
    #[must_use]
    pub fn is_ones(&self) -> bool {
        self.value == ones_of(self.width)
    }

    /// Is this the smallest signed value
    #[must_use]
    pub fn is_min_signed(&self) -> bool {
        self.value == modulus(self.width - 1)
    }

    /// Is this the largest signed value
    #[must_use]
    pub fn is_max_signed(&self) -> bool {
        self.value == modulus(self.width - 1) - BigUint::one()
    }

    // --- bitwise ---------------------------------------------------------

    /// Bitwise not
    #[must_use]
    pub fn not(&self) -> Self {
        Self { width: self.width, value: ones_of(self.width) ^ &self.value }
    }

    /// Bitwise and
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        Self { width: self.width, value: &self.value & &other.value }
    }

    /// Bitwise or
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Self { width: self.width, value: &self.value | &other.value }
    }

    /// Bitwise xor
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        Self { width: self.width, value: &self.value ^ &other.value }
    }

    // --- arithmetic ------------------------------------------------------

    /// Two's complement negation
    #[must_use]
    pub fn neg(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        Self::new(self.width, modulus(self.width) - &self.value)
    }

    /// Modular addition
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.width, &self.value + &other.value)
    }

    /// Modular subtraction
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Modular multiplication
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        Self::new(self.width, &self.value * &other.value)
    }

    /// Unsigned division (`x / 0 = ~0`)
    #[must_use]
    pub fn udiv(&self, other: &Self) -> Self {
        if other.is_zero() {
            return Self::ones(self.width);
        }
        Self::new(self.width, &self.value / &other.value)
    }

    /// Unsigned remainder (`x % 0 = x`)
    #[must_use]
    pub fn urem(&self, other: &Self) -> Self {
        if other.is_zero() {
            return self.clone();
        }
        Self::new(self.width, &self.value % &other.value)
    }

    /// Signed division, truncating
    #[must_use]
    pub fn sdiv(&self, other: &Self) -> Self {
        match (self.msb(), other.msb()) {
            (false, false) => self.udiv(other),
            (true, false) => self.neg().udiv(other).neg(),
            (false, true) => self.udiv(&other.neg()).neg(),
            (true, true) => self.neg().udiv(&other.neg()),
        }
    }

    /// Signed remainder, sign follows the dividend
    #[must_use]
    pub fn srem(&self, other: &Self) -> Self {
        match (self.msb(), other.msb()) {
            (false, false) => self.urem(other),
            (true, false) => self.neg().urem(other).neg(),
            (false, true) => self.urem(&other.neg()),
            (true, true) => self.neg().urem(&other.neg()).neg(),
        }
    }

    /// Signed modulus, sign follows the divisor
    #[must_use]
    pub fn smod(&self, other: &Self) -> Self {
        let abs_s = if self.msb() { self.neg() } else { self.clone() };
        let abs_t = if other.msb() { other.neg() } else { other.clone() };
        let u = abs_s.urem(&abs_t);
        if u.is_zero() {
            return u;
        }
        match (self.msb(), other.msb()) {
            (false, false) => u,
            (true, false) => u.neg().add(other),
            (false, true) => u.add(other),
            (true, true) => u.neg(),
        }
    }

    /// Increment
    #[must_use]
    pub fn inc(&self) -> Self {
        self.add(&Self::one(self.width))
    }

    /// Decrement
    #[must_use]
    pub fn dec(&self) -> Self {
        self.sub(&Self::one(self.width))
    }

    // --- shifts ----------------------------------------------------------

    fn shift_amount(&self, other: &Self) -> Option<u32> {
        other.value.to_u32().filter(|&n| n < self.width)
    }

    /// Logical shift left
    #[must_use]
    pub fn shl(&self, other: &Self) -> Self {
        match self.shift_amount(other) {
            Some(n) => self.shl_const(n),
            None => Self::zero(self.width),
        }
    }

    /// Logical shift left by a constant
    #[must_use]
    pub fn shl_const(&self, n: u32) -> Self {
        Self::new(self.width, &self.value << n as usize)
    }

    /// Logical shift right
    #[must_use]
    pub fn lshr(&self, other: &Self) -> Self {
        match self.shift_amount(other) {
            Some(n) => self.lshr_const(n),
            None => Self::zero(self.width),
        }
    }

    /// Logical shift right by a constant
    #[must_use]
    pub fn lshr_const(&self, n: u32) -> Self {
        Self::new(self.width, &self.value >> n as usize)
    }

    /// Arithmetic shift right
    #[must_use]
    pub fn ashr(&self, other: &Self) -> Self {
        let n = self.shift_amount(other).unwrap_or(self.width);
        if !self.msb() {
            return if n >= self.width { Self::zero(self.width) } else { self.lshr_const(n) };
        }
        if n >= self.width {
            return Self::ones(self.width);
        }
        self.not().lshr_const(n).not()
    }

    /// Rotate left by a constant
    #[must_use]
    pub fn rotate_left(&self, n: u32) -> Self {
        let n = n % self.width;
        if n == 0 {
            return self.clone();
        }
        self.shl_const(n).or(&self.lshr_const(self.width - n))
    }

    /// Rotate right by a constant
    #[must_use]
    pub fn rotate_right(&self, n: u32) -> Self {
        let n = n % self.width;
        self.rotate_left((self.width - n) % self.width)
    }

    /// Rotate left by a bit-vector amount (taken modulo the width)
    #[must_use]
    pub fn rol(&self, other: &Self) -> Self {
        let n = (&other.value % BigUint::from(self.width)).to_u32().unwrap_or(0);
        self.rotate_left(n)
    }

    /// Rotate right by a bit-vector amount (taken modulo the width)
    #[must_use]
    pub fn ror(&self, other: &Self) -> Self {
        let n = (&other.value % BigUint::from(self.width)).to_u32().unwrap_or(0);
        self.rotate_right(n)
    }

    // --- structure -------------------------------------------------------

    /// Concatenation, `self` forms the high part
    #[must_use]
    pub fn concat(&self, low: &Self) -> Self {
        Self::new(
            self.width + low.width,
            (&self.value << low.width as usize) | &low.value,
        )
    }

    /// Bits `hi` down to `lo` inclusive
    #[must_use]
    pub fn extract(&self, hi: u32, lo: u32) -> Self {
        debug_assert!(hi >= lo && hi < self.width);
        Self::new(hi - lo + 1, &self.value >> lo as usize)
    }

    /// Zero extension by `n` bits
    #[must_use]
    pub fn zero_extend(&self, n: u32) -> Self {
        Self { width: self.width + n, value: self.value.clone() }
    }

    /// Sign extension by `n` bits
    #[must_use]
    pub fn sign_extend(&self, n: u32) -> Self {
        if !self.msb() || n == 0 {
            return self.zero_extend(n);
        }
        Self::ones(n).concat(self)
    }

    /// `n`-fold repetition
    #[must_use]
    pub fn repeat(&self, n: u32) -> Self {
        let mut r = self.clone();
        for _ in 1..n {
            r = r.concat(self);
        }
        r
    }

    // --- predicates ------------------------------------------------------

    /// Unsigned less-than
    #[must_use]
    pub fn ult(&self, other: &Self) -> bool {
        self.value < other.value
    }

    /// Unsigned less-or-equal
    #[must_use]
    pub fn ule(&self, other: &Self) -> bool {
        self.value <= other.value
    }

    /// Signed less-than
    #[must_use]
    pub fn slt(&self, other: &Self) -> bool {
        self.to_signed() < other.to_signed()
    }

    /// Signed less-or-equal
    #[must_use]
    pub fn sle(&self, other: &Self) -> bool {
        self.to_signed() <= other.to_signed()
    }

    /// And-reduction
    #[must_use]
    pub fn redand(&self) -> bool {
        self.is_ones()
    }

    /// Or-reduction
    #[must_use]
    pub fn redor(&self) -> bool {
        !self.is_zero()
    }

    /// Xor-reduction
    #[must_use]
    pub fn redxor(&self) -> bool {
        self.value.count_ones() % 2 == 1
    }

    fn signed_fits(&self, v: &BigInt) -> bool {
        let half = BigInt::from(modulus(self.width - 1));
        *v >= -half.clone() && *v < half
    }

    /// Unsigned addition overflow
    #[must_use]
    pub fn uaddo(&self, other: &Self) -> bool {
        (&self.value + &other.value) >= modulus(self.width)
    }

    /// Signed addition overflow
    #[must_use]
    pub fn saddo(&self, other: &Self) -> bool {
        !self.signed_fits(&(self.to_signed() + other.to_signed()))
    }

    /// Unsigned subtraction overflow
    #[must_use]
    pub fn usubo(&self, other: &Self) -> bool {
        self.value < other.value
    }

    /// Signed subtraction overflow
    #[must_use]
    pub fn ssubo(&self, other: &Self) -> bool {
        !self.signed_fits(&(self.to_signed() - other.to_signed()))
    }

    /// Unsigned multiplication overflow
    #[must_use]
    pub fn umulo(&self, other: &Self) -> bool {
        (&self.value * &other.value) >= modulus(self.width)
    }

    /// Signed multiplication overflow
    #[must_use]
    pub fn smulo(&self, other: &Self) -> bool {
        !self.signed_fits(&(self.to_signed() * other.to_signed()))
    }

    /// Signed division overflow
    #[must_use]
    pub fn sdivo(&self, other: &Self) -> bool {
        self.is_min_signed() && other.is_ones()
    }

    /// Binary digits, most significant first
    #[must_use]
    pub fn to_binary_string(&self) -> String {
        (0..self.width)
            .rev()
            .map(|i| if self.bit(i) { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Display for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#b{}", self.to_binary_string())
    }
}
