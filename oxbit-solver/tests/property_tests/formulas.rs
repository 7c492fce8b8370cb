//! Random quantifier-free bit-vector formulas over three 4-bit constants

use oxbit_core::ast::{TermId, TermKind, TermManager};
use proptest::prelude::*;

const WIDTH: u32 = 4;

const UNARY: [TermKind; 3] = [TermKind::BvNot, TermKind::BvNeg, TermKind::BvInc];

const BINARY: [TermKind; 8] = [
    TermKind::BvAdd,
    TermKind::BvSub,
    TermKind::BvMul,
    TermKind::BvAnd,
    TermKind::BvOr,
    TermKind::BvXor,
    TermKind::BvShl,
    TermKind::BvShr,
];

const COMPARE: [TermKind; 5] = [
    TermKind::Equal,
    TermKind::Distinct,
    TermKind::BvUlt,
    TermKind::BvUle,
    TermKind::BvSlt,
];

#[derive(Debug, Clone)]
pub enum Expr {
    Const(usize),
    Val(u8),
    Un(usize, Box<Expr>),
    Bin(usize, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct Atom(usize, Expr, Expr);

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![(0usize..3).prop_map(Expr::Const), (0u8..16).prop_map(Expr::Val)];
    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (0..UNARY.len(), inner.clone()).prop_map(|(k, e)| Expr::Un(k, Box::new(e))),
            (0..BINARY.len(), inner.clone(), inner)
                .prop_map(|(k, a, b)| Expr::Bin(k, Box::new(a), Box::new(b))),
        ]
    })
}

pub fn atom_strategy() -> impl Strategy<Value = Atom> {
    (0..COMPARE.len(), expr_strategy(), expr_strategy()).prop_map(|(k, a, b)| Atom(k, a, b))
}

pub fn atoms_strategy(max: usize) -> impl Strategy<Value = Vec<Atom>> {
    prop::collection::vec(atom_strategy(), 1..max)
}

pub struct Vars {
    pub consts: [TermId; 3],
}

impl Vars {
    pub fn new(tm: &mut TermManager) -> Self {
        let s = tm.mk_bv_sort(WIDTH).unwrap();
        let consts = [
            tm.mk_const(s, Some("x")),
            tm.mk_const(s, Some("y")),
            tm.mk_const(s, Some("z")),
        ];
        Self { consts }
    }

    fn expr(&self, tm: &mut TermManager, e: &Expr) -> TermId {
        let s = tm.mk_bv_sort(WIDTH).unwrap();
        match e {
            Expr::Const(i) => self.consts[*i],
            Expr::Val(v) => tm.mk_bv_value_u64(s, u64::from(*v)).unwrap(),
            Expr::Un(k, a) => {
                let a = self.expr(tm, a);
                tm.mk_term(UNARY[*k], &[a], &[]).unwrap()
            }
            Expr::Bin(k, a, b) => {
                let (a, b) = (self.expr(tm, a), self.expr(tm, b));
                tm.mk_term(BINARY[*k], &[a, b], &[]).unwrap()
            }
        }
    }

    pub fn atom(&self, tm: &mut TermManager, a: &Atom) -> TermId {
        let (x, y) = (self.expr(tm, &a.1), self.expr(tm, &a.2));
        tm.mk_term(COMPARE[a.0], &[x, y], &[]).unwrap()
    }

    pub fn atoms(&self, tm: &mut TermManager, atoms: &[Atom]) -> Vec<TermId> {
        atoms.iter().map(|a| self.atom(tm, a)).collect()
    }
}
