//! OxBit Core - Sorts, Terms, Values and Rewriting for the SMT Solver
//!
//! This crate provides the foundational types shared by every OxBit crate:
//! - Hash-consed terms with [`TermId`] handles and owner reference counts
//! - A sort system for bit-vectors, floating-point, arrays and functions
//! - Arbitrary-width bit-vector values and a bit-exact IEEE-754 kernel
//! - Constant folding and a fixpoint [`Rewriter`]
//! - An SMT-LIB2 printer and the parser collaborator interface
//!
//! # Examples
//!
//! ## Creating Terms
//!
//! ```
//! use oxbit_core::ast::{TermKind, TermManager};
//!
//! let mut tm = TermManager::new();
//! let bv8 = tm.mk_bv_sort(8).unwrap();
//! let x = tm.mk_const(bv8, Some("x"));
//! let one = tm.mk_bv_one(bv8).unwrap();
//! let a = tm.mk_term(TermKind::BvAdd, &[x, one], &[]).unwrap();
//! let b = tm.mk_term(TermKind::BvAdd, &[x, one], &[]).unwrap();
//! assert_eq!(a, b);
//! ```
//!
//! ## Rewriting
//!
//! ```
//! use oxbit_core::ast::{TermKind, TermManager};
//! use oxbit_core::rewrite::Rewriter;
//!
//! let mut tm = TermManager::new();
//! let bv8 = tm.mk_bv_sort(8).unwrap();
//! let x = tm.mk_const(bv8, Some("x"));
//! let zero = tm.mk_bv_zero(bv8).unwrap();
//! let sum = tm.mk_term(TermKind::BvAdd, &[x, zero], &[]).unwrap();
//!
//! let mut rw = Rewriter::new(1);
//! assert_eq!(rw.normalize(&mut tm, sum).unwrap(), x);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod error;
pub mod fold;
pub mod parse;
pub mod printer;
pub mod rewrite;
pub mod sort;
pub mod value;

pub use ast::{SubstMap, Term, TermId, TermKind, TermManager};
pub use error::{OxbitError, Result};
pub use parse::{FormulaParser, FormulaSink, ParseError};
pub use printer::{Printer, SmtLibPrinter};
pub use rewrite::{RewriteResult, RewriteRule, RewriteStats, Rewriter};
pub use sort::{Sort, SortId, SortKind, SortManager};
pub use value::{BitVec, FpValue, RoundingMode, Value};
