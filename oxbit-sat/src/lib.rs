//! OxBit SAT - Incremental CDCL SAT Solver
//!
//! The propositional backend of the OxBit bit-blasting engines:
//! - Two watched literals, first-UIP learning, VSIDS and Luby restarts
//! - Incremental clause addition between solve calls
//! - Assumptions with failed-assumption queries
//! - Cooperative termination through a polled callback
//!
//! # Examples
//!
//! ```
//! use oxbit_sat::{Lit, Solver, SolverResult};
//!
//! let mut solver = Solver::new();
//! let a = solver.new_var();
//! let b = solver.new_var();
//! solver.add_clause([Lit::pos(a), Lit::pos(b)]);
//! solver.add_clause([Lit::neg(a)]);
//!
//! assert_eq!(solver.solve(), SolverResult::Sat);
//! assert!(solver.model()[b.index()].is_true());
//!
//! assert_eq!(solver.solve_with_assumptions(&[Lit::neg(b)]), SolverResult::Unsat);
//! assert!(solver.is_failed(Lit::neg(b)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod literal;
pub mod solver;

pub use backend::SatBackend;
pub use literal::{LBool, Lit, Var};
pub use solver::{Solver, SolverConfig, SolverResult, SolverStats, Terminator};
