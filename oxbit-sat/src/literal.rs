//! Variables, literals and three-valued assignments

use std::fmt;
use std::ops::Not;

/// A Boolean variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    /// Variable with the given index
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Index of this variable
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw id
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A literal (signed Boolean variable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit(u32);

impl Lit {
    /// Positive literal of `var`
    #[must_use]
    pub const fn pos(var: Var) -> Self {
        Self(var.0 << 1)
    }

    /// Negative literal of `var`
    #[must_use]
    pub const fn neg(var: Var) -> Self {
        Self((var.0 << 1) | 1)
    }

    /// Literal of `var` that is true when the variable has value `value`
    #[must_use]
    pub const fn new(var: Var, value: bool) -> Self {
        if value { Self::pos(var) } else { Self::neg(var) }
    }

    /// DIMACS literal (non-zero, 1-based)
    #[must_use]
    pub fn from_dimacs(lit: i32) -> Self {
        let var = Var(lit.unsigned_abs() - 1);
        if lit > 0 { Self::pos(var) } else { Self::neg(var) }
    }

    /// Variable of this literal
    #[must_use]
    pub const fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    /// Is this a positive literal
    #[must_use]
    pub const fn is_pos(self) -> bool {
        self.0 & 1 == 0
    }

    /// Is this a negative literal
    #[must_use]
    pub const fn is_neg(self) -> bool {
        self.0 & 1 == 1
    }

    /// Dense index, suitable for per-literal tables
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pos() {
            write!(f, "{}", self.var().0 + 1)
        } else {
            write!(f, "-{}", self.var().0 + 1)
        }
    }
}

/// Three-valued truth value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LBool {
    /// Assigned true
    True,
    /// Assigned false
    False,
    /// Unassigned
    #[default]
    Undef,
}

impl LBool {
    /// Is this `True`
    #[must_use]
    pub fn is_true(self) -> bool {
        self == LBool::True
    }

    /// Is this `False`
    #[must_use]
    pub fn is_false(self) -> bool {
        self == LBool::False
    }

    /// Is this `Undef`
    #[must_use]
    pub fn is_undef(self) -> bool {
        self == LBool::Undef
    }

    /// Value as seen through a literal of the given polarity
    #[must_use]
    pub fn under(self, lit: Lit) -> LBool {
        if lit.is_neg() { !self } else { self }
    }
}

impl From<bool> for LBool {
    fn from(b: bool) -> Self {
        if b { LBool::True } else { LBool::False }
    }
}

impl Not for LBool {
    type Output = LBool;

    fn not(self) -> LBool {
        match self {
            LBool::True => LBool::False,
            LBool::False => LBool::True,
            LBool::Undef => LBool::Undef,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_encoding() {
        let v = Var::new(5);
        assert_eq!(Lit::pos(v).var(), v);
        assert!(Lit::neg(v).is_neg());
        assert_eq!(!Lit::pos(v), Lit::neg(v));
        assert_eq!(Lit::from_dimacs(-6), Lit::neg(v));
        assert_eq!(Lit::neg(v).to_string(), "-6");
    }

    #[test]
    fn test_lbool() {
        assert_eq!(LBool::True.under(Lit::neg(Var::new(0))), LBool::False);
        assert_eq!(!LBool::Undef, LBool::Undef);
        assert!(LBool::from(true).is_true());
    }
}
