//! Operator kinds

use std::fmt;

/// Operator tag of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum TermKind {
    // leaves
    /// Uninterpreted constant (zero-arity symbol)
    Const,
    /// Bound variable
    Var,
    /// Literal value
    Value,

    // Boolean
    Not,
    And,
    Or,
    Xor,
    Implies,
    Iff,
    Ite,
    Equal,
    Distinct,

    // bit-vectors
    BvNot,
    BvNeg,
    BvAnd,
    BvOr,
    BvXor,
    BvNand,
    BvNor,
    BvXnor,
    BvAdd,
    BvSub,
    BvMul,
    BvUdiv,
    BvUrem,
    BvSdiv,
    BvSrem,
    BvSmod,
    BvShl,
    BvShr,
    BvAshr,
    BvRol,
    BvRor,
    BvUlt,
    BvUle,
    BvUgt,
    BvUge,
    BvSlt,
    BvSle,
    BvSgt,
    BvSge,
    BvComp,
    BvConcat,
    BvRedand,
    BvRedor,
    BvRedxor,
    BvInc,
    BvDec,
    BvUaddo,
    BvSaddo,
    BvUsubo,
    BvSsubo,
    BvUmulo,
    BvSmulo,
    BvSdivo,
    /// Indices `[hi, lo]`
    BvExtract,
    /// Index `[n]`
    BvZeroExtend,
    /// Index `[n]`
    BvSignExtend,
    /// Index `[n]`
    BvRepeat,
    /// Index `[n]`
    BvRoli,
    /// Index `[n]`
    BvRori,

    // floating-point
    FpAbs,
    FpNeg,
    FpAdd,
    FpSub,
    FpMul,
    FpDiv,
    FpFma,
    FpSqrt,
    FpRem,
    FpRti,
    FpMin,
    FpMax,
    FpEqual,
    FpLt,
    FpLeq,
    FpGt,
    FpGeq,
    FpIsNormal,
    FpIsSubnormal,
    FpIsZero,
    FpIsInf,
    FpIsNan,
    FpIsNeg,
    FpIsPos,
    /// `fp` from sign, exponent and trailing significand bit-vectors
    FpFp,
    /// Indices `[eb, sb]`
    FpToFpFromBv,
    /// Indices `[eb, sb]`
    FpToFpFromFp,
    /// Indices `[eb, sb]`
    FpToFpFromSbv,
    /// Indices `[eb, sb]`
    FpToFpFromUbv,
    /// Index `[width]`
    FpToSbv,
    /// Index `[width]`
    FpToUbv,

    // arrays
    ArraySelect,
    ArrayStore,
    ConstArray,

    // functions
    Apply,
    Lambda,

    // quantifiers
    Forall,
    Exists,
}

impl TermKind {
    /// Number of integer indices the kind carries
    #[must_use]
    pub fn num_indices(self) -> usize {
        use TermKind::*;
        match self {
            BvExtract | FpToFpFromBv | FpToFpFromFp | FpToFpFromSbv | FpToFpFromUbv => 2,
            BvZeroExtend | BvSignExtend | BvRepeat | BvRoli | BvRori | FpToSbv | FpToUbv => 1,
            _ => 0,
        }
    }

    /// Argument count bounds `(min, max)`; `None` for unbounded
    #[must_use]
    pub fn arity(self) -> (usize, Option<usize>) {
        use TermKind::*;
        match self {
            Const | Var | Value => (0, Some(0)),
            Not | BvNot | BvNeg | BvRedand | BvRedor | BvRedxor | BvInc | BvDec | BvExtract
            | BvZeroExtend | BvSignExtend | BvRepeat | BvRoli | BvRori | FpAbs | FpNeg
            | FpIsNormal | FpIsSubnormal | FpIsZero | FpIsInf | FpIsNan | FpIsNeg | FpIsPos
            | FpToFpFromBv | ConstArray => (1, Some(1)),
            And | Or | Xor | Implies | Equal | Distinct | BvAnd | BvOr | BvXor | BvAdd | BvMul
            | BvConcat | FpEqual | FpLt | FpLeq | FpGt | FpGeq => (2, None),
            Iff | BvNand | BvNor | BvXnor | BvSub | BvUdiv | BvUrem | BvSdiv | BvSrem | BvSmod
            | BvShl | BvShr | BvAshr | BvRol | BvRor | BvUlt | BvUle | BvUgt | BvUge | BvSlt
            | BvSle | BvSgt | BvSge | BvComp | BvUaddo | BvSaddo | BvUsubo | BvSsubo | BvUmulo
            | BvSmulo | BvSdivo | FpSqrt | FpRem | FpRti | FpMin | FpMax | FpToFpFromFp
            | FpToFpFromSbv | FpToFpFromUbv | FpToSbv | FpToUbv | ArraySelect => (2, Some(2)),
            Ite | FpAdd | FpSub | FpMul | FpDiv | FpFp | ArrayStore => (3, Some(3)),
            FpFma => (4, Some(4)),
            Apply | Lambda | Forall | Exists => (2, None),
        }
    }

    /// Binder kinds bind their first child
    #[must_use]
    pub fn is_binder(self) -> bool {
        matches!(self, TermKind::Lambda | TermKind::Forall | TermKind::Exists)
    }

    /// Quantifier kinds
    #[must_use]
    pub fn is_quantifier(self) -> bool {
        matches!(self, TermKind::Forall | TermKind::Exists)
    }

    /// Kinds whose operands may be reordered
    #[must_use]
    pub fn is_commutative(self) -> bool {
        use TermKind::*;
        matches!(
            self,
            And | Or | Xor | Iff | Equal | BvAnd | BvOr | BvXor | BvNand | BvNor | BvXnor
                | BvAdd | BvMul | BvComp | FpEqual
        )
    }

    /// Floating-point kinds whose first operand is a rounding mode
    #[must_use]
    pub fn has_rounding_mode(self) -> bool {
        use TermKind::*;
        matches!(
            self,
            FpAdd | FpSub | FpMul | FpDiv | FpFma | FpSqrt | FpRti | FpToFpFromFp
                | FpToFpFromSbv | FpToFpFromUbv | FpToSbv | FpToUbv
        )
    }

    /// SMT-LIB2 operator name
    #[must_use]
    pub fn smt2_name(self) -> &'static str {
        use TermKind::*;
        match self {
            Const => "const",
            Var => "var",
            Value => "value",
            Not => "not",
            And => "and",
            Or => "or",
            Xor => "xor",
            Implies => "=>",
            Iff => "=",
            Ite => "ite",
            Equal => "=",
            Distinct => "distinct",
            BvNot => "bvnot",
            BvNeg => "bvneg",
            BvAnd => "bvand",
            BvOr => "bvor",
            BvXor => "bvxor",
            BvNand => "bvnand",
            BvNor => "bvnor",
            BvXnor => "bvxnor",
            BvAdd => "bvadd",
            BvSub => "bvsub",
            BvMul => "bvmul",
            BvUdiv => "bvudiv",
            BvUrem => "bvurem",
            BvSdiv => "bvsdiv",
            BvSrem => "bvsrem",
            BvSmod => "bvsmod",
            BvShl => "bvshl",
            BvShr => "bvlshr",
            BvAshr => "bvashr",
            BvRol => "bvrol",
            BvRor => "bvror",
            BvUlt => "bvult",
            BvUle => "bvule",
            BvUgt => "bvugt",
            BvUge => "bvuge",
            BvSlt => "bvslt",
            BvSle => "bvsle",
            BvSgt => "bvsgt",
            BvSge => "bvsge",
            BvComp => "bvcomp",
            BvConcat => "concat",
            BvRedand => "bvredand",
            BvRedor => "bvredor",
            BvRedxor => "bvredxor",
            BvInc => "bvinc",
            BvDec => "bvdec",
            BvUaddo => "bvuaddo",
            BvSaddo => "bvsaddo",
            BvUsubo => "bvusubo",
            BvSsubo => "bvssubo",
            BvUmulo => "bvumulo",
            BvSmulo => "bvsmulo",
            BvSdivo => "bvsdivo",
            BvExtract => "extract",
            BvZeroExtend => "zero_extend",
            BvSignExtend => "sign_extend",
            BvRepeat => "repeat",
            BvRoli => "rotate_left",
            BvRori => "rotate_right",
            FpAbs => "fp.abs",
            FpNeg => "fp.neg",
            FpAdd => "fp.add",
            FpSub => "fp.sub",
            FpMul => "fp.mul",
            FpDiv => "fp.div",
            FpFma => "fp.fma",
            FpSqrt => "fp.sqrt",
            FpRem => "fp.rem",
            FpRti => "fp.roundToIntegral",
            FpMin => "fp.min",
            FpMax => "fp.max",
            FpEqual => "fp.eq",
            FpLt => "fp.lt",
            FpLeq => "fp.leq",
            FpGt => "fp.gt",
            FpGeq => "fp.geq",
            FpIsNormal => "fp.isNormal",
            FpIsSubnormal => "fp.isSubnormal",
            FpIsZero => "fp.isZero",
            FpIsInf => "fp.isInfinite",
            FpIsNan => "fp.isNaN",
            FpIsNeg => "fp.isNegative",
            FpIsPos => "fp.isPositive",
            FpFp => "fp",
            FpToFpFromBv | FpToFpFromFp | FpToFpFromSbv => "to_fp",
            FpToFpFromUbv => "to_fp_unsigned",
            FpToSbv => "fp.to_sbv",
            FpToUbv => "fp.to_ubv",
            ArraySelect => "select",
            ArrayStore => "store",
            ConstArray => "const",
            Apply => "apply",
            Lambda => "lambda",
            Forall => "forall",
            Exists => "exists",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.smt2_name())
    }
}
