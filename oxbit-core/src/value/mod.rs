//! Literal values carried by value terms
//!
//! A [`Value`] is the payload of a value term and the domain of constant
//! folding. Bit-vectors have arbitrary width, floating-point numbers use the
//! exact kernel in [`fp`].

pub mod bitvec;
pub mod fp;

pub use bitvec::BitVec;
pub use fp::FpValue;

use std::fmt;

/// IEEE-754 rounding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RoundingMode {
    /// Round to nearest, ties to even
    #[default]
    Rne,
    /// Round to nearest, ties away from zero
    Rna,
    /// Round toward positive infinity
    Rtp,
    /// Round toward negative infinity
    Rtn,
    /// Round toward zero
    Rtz,
}

impl RoundingMode {
    /// All rounding modes in encoding order
    pub const ALL: [RoundingMode; 5] = [
        RoundingMode::Rne,
        RoundingMode::Rna,
        RoundingMode::Rtp,
        RoundingMode::Rtn,
        RoundingMode::Rtz,
    ];

    /// Numeric encoding used by the bit-level engines
    #[must_use]
    pub fn code(self) -> u64 {
        match self {
            RoundingMode::Rne => 0,
            RoundingMode::Rna => 1,
            RoundingMode::Rtp => 2,
            RoundingMode::Rtn => 3,
            RoundingMode::Rtz => 4,
        }
    }

    /// Decode a numeric encoding; out-of-range codes map to RNE
    #[must_use]
    pub fn from_code(code: u64) -> Self {
        Self::ALL.get(code as usize).copied().unwrap_or_default()
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundingMode::Rne => "RNE",
            RoundingMode::Rna => "RNA",
            RoundingMode::Rtp => "RTP",
            RoundingMode::Rtn => "RTN",
            RoundingMode::Rtz => "RTZ",
        };
        f.write_str(s)
    }
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Bit-vector
    BitVec(BitVec),
    /// Floating-point
    Fp(FpValue),
    /// Rounding mode
    Rm(RoundingMode),
}

impl Value {
    /// Boolean payload
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Bit-vector payload
    #[must_use]
    pub fn as_bv(&self) -> Option<&BitVec> {
        match self {
            Value::BitVec(bv) => Some(bv),
            _ => None,
        }
    }

    /// Floating-point payload
    #[must_use]
    pub fn as_fp(&self) -> Option<&FpValue> {
        match self {
            Value::Fp(fp) => Some(fp),
            _ => None,
        }
    }

    /// Rounding-mode payload
    #[must_use]
    pub fn as_rm(&self) -> Option<RoundingMode> {
        match self {
            Value::Rm(rm) => Some(*rm),
            _ => None,
        }
    }

    /// Flatten into little-endian bits (Bool as one bit, RM as three)
    #[must_use]
    pub fn to_bits(&self) -> Vec<bool> {
        match self {
            Value::Bool(b) => vec![*b],
            Value::BitVec(bv) => bv.to_bits(),
            Value::Fp(fp) => fp.bits().to_bits(),
            Value::Rm(rm) => BitVec::from_u64(3, rm.code()).to_bits(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::BitVec(bv) => write!(f, "{bv}"),
            Value::Fp(fp) => write!(f, "{fp}"),
            Value::Rm(rm) => write!(f, "{rm}"),
        }
    }
}
