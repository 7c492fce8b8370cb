//! Property-based tests for the rewriter
//!
//! - Idempotence of normalization on random bit-vector formulas
//! - Normalization preserves the value under every assignment

use oxbit_core::ast::{SubstMap, TermId, TermKind, TermManager};
use oxbit_core::rewrite::Rewriter;
use proptest::prelude::*;

const UNARY: [TermKind; 5] = [
    TermKind::BvNot,
    TermKind::BvNeg,
    TermKind::BvInc,
    TermKind::BvDec,
    TermKind::BvRedor,
];

const BINARY: [TermKind; 14] = [
    TermKind::BvAdd,
    TermKind::BvSub,
    TermKind::BvMul,
    TermKind::BvAnd,
    TermKind::BvOr,
    TermKind::BvXor,
    TermKind::BvNand,
    TermKind::BvXnor,
    TermKind::BvUdiv,
    TermKind::BvUrem,
    TermKind::BvShl,
    TermKind::BvShr,
    TermKind::BvSdiv,
    TermKind::BvRol,
];

const COMPARE: [TermKind; 8] = [
    TermKind::Equal,
    TermKind::BvUlt,
    TermKind::BvUle,
    TermKind::BvUgt,
    TermKind::BvSge,
    TermKind::BvSlt,
    TermKind::BvUaddo,
    TermKind::Distinct,
];

#[derive(Debug, Clone)]
enum Expr {
    Const(usize),
    Val(u8),
    Un(usize, Box<Expr>),
    Bin(usize, Box<Expr>, Box<Expr>),
    Slice(u32, Box<Expr>),
    Ite(Box<Atom>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
struct Atom(usize, Expr, Expr);

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![(0usize..3).prop_map(Expr::Const), any::<u8>().prop_map(Expr::Val)];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (0..UNARY.len(), inner.clone()).prop_map(|(k, e)| Expr::Un(k, Box::new(e))),
            (0..BINARY.len(), inner.clone(), inner.clone())
                .prop_map(|(k, a, b)| Expr::Bin(k, Box::new(a), Box::new(b))),
            (0u32..8, inner.clone()).prop_map(|(lo, e)| Expr::Slice(lo, Box::new(e))),
            (0..COMPARE.len(), inner.clone(), inner.clone(), inner.clone(), inner).prop_map(
                |(k, a, b, t, e)| Expr::Ite(Box::new(Atom(k, a, b)), Box::new(t), Box::new(e))
            ),
        ]
    })
}

fn formula_strategy() -> impl Strategy<Value = (Vec<Atom>, bool)> {
    let atom = (0..COMPARE.len(), expr_strategy(), expr_strategy()).prop_map(|(k, a, b)| Atom(k, a, b));
    (prop::collection::vec(atom, 1..4), any::<bool>())
}

struct Builder {
    tm: TermManager,
    consts: [TermId; 3],
}

impl Builder {
    fn new() -> Self {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let consts = [
            tm.mk_const(s, Some("x")),
            tm.mk_const(s, Some("y")),
            tm.mk_const(s, Some("z")),
        ];
        Self { tm, consts }
    }

    fn expr(&mut self, e: &Expr) -> TermId {
        let s = self.tm.mk_bv_sort(8).unwrap();
        match e {
            Expr::Const(i) => self.consts[*i],
            Expr::Val(v) => self.tm.mk_bv_value_u64(s, u64::from(*v)).unwrap(),
            Expr::Un(k, a) => {
                let a = self.expr(a);
                let t = self.tm.mk_term(UNARY[*k], &[a], &[]).unwrap();
                if UNARY[*k] == TermKind::BvRedor {
                    self.tm.mk_term(TermKind::BvZeroExtend, &[t], &[7]).unwrap()
                } else {
                    t
                }
            }
            Expr::Bin(k, a, b) => {
                let (a, b) = (self.expr(a), self.expr(b));
                self.tm.mk_term(BINARY[*k], &[a, b], &[]).unwrap()
            }
            Expr::Slice(lo, a) => {
                let a = self.expr(a);
                let hi = self.tm.mk_term(TermKind::BvExtract, &[a], &[7, *lo]).unwrap();
                if *lo == 0 {
                    hi
                } else {
                    self.tm.mk_term(TermKind::BvZeroExtend, &[hi], &[*lo]).unwrap()
                }
            }
            Expr::Ite(c, t, e) => {
                let c = self.atom(c);
                let (t, e) = (self.expr(t), self.expr(e));
                self.tm.mk_ite(c, t, e).unwrap()
            }
        }
    }

    fn atom(&mut self, a: &Atom) -> TermId {
        let (x, y) = (self.expr(&a.1), self.expr(&a.2));
        self.tm.mk_term(COMPARE[a.0], &[x, y], &[]).unwrap()
    }

    fn formula(&mut self, atoms: &[Atom], disjunction: bool) -> TermId {
        let lits: Vec<TermId> = atoms.iter().map(|a| self.atom(a)).collect();
        if disjunction {
            self.tm.mk_or(&lits).unwrap()
        } else {
            self.tm.mk_and(&lits).unwrap()
        }
    }

    fn assign(&mut self, values: [u8; 3]) -> SubstMap {
        let s = self.tm.mk_bv_sort(8).unwrap();
        let mut map = SubstMap::default();
        for (c, v) in self.consts.iter().zip(values) {
            let value = self.tm.mk_bv_value_u64(s, u64::from(v)).unwrap();
            map.insert(*c, value);
        }
        map
    }
}

proptest! {
    /// A second normalization with a fresh rewriter changes nothing
    #[test]
    fn normalize_is_idempotent((atoms, disj) in formula_strategy(), level in 1u8..=3) {
        let mut b = Builder::new();
        let t = b.formula(&atoms, disj);
        let once = Rewriter::new(level).normalize(&mut b.tm, t).unwrap();
        let twice = Rewriter::new(level).normalize(&mut b.tm, once).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// The normal form evaluates like the original under any assignment
    #[test]
    fn normalize_preserves_value((atoms, disj) in formula_strategy(), values in any::<[u8; 3]>()) {
        let mut b = Builder::new();
        let t = b.formula(&atoms, disj);
        let mut rw = Rewriter::new(1);
        let n = rw.normalize(&mut b.tm, t).unwrap();
        let map = b.assign(values);
        let ground_t = b.tm.substitute(t, &map).unwrap();
        let ground_n = b.tm.substitute(n, &map).unwrap();
        let vt = rw.normalize(&mut b.tm, ground_t).unwrap();
        let vn = rw.normalize(&mut b.tm, ground_n).unwrap();
        prop_assert!(b.tm.bool_value(vt).is_some());
        prop_assert_eq!(vt, vn);
    }
}
