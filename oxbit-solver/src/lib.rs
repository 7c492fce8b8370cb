//! OxBit Solver - Incremental Multi-Engine SMT Solving
//!
//! The solving layer on top of `oxbit-core` and `oxbit-sat`:
//! - [`Solver`]: assertions in push/pop frames, assumptions, check-sat,
//!   value queries, unsat cores and unsat assumptions
//! - A preprocessing pipeline (lambda extraction and merging, substitution,
//!   skeleton propagation, unconstrained-term optimization, ite and slice
//!   elimination)
//! - Engines: bit-blasting to SAT with exact floating-point circuits and
//!   lazy arrays and functions, propagation-based and score-based local
//!   search, and counterexample-guided quantifier instantiation
//! - Typed [`Options`] with validation at set time
//! - Cooperative termination and a process-wide abort hook
//!
//! # Examples
//!
//! ```
//! use oxbit_solver::{Options, SatResult, Solver};
//!
//! let mut solver = Solver::with_options(Options::incremental());
//! let tm = solver.tm_mut();
//! let b = tm.mk_bool_sort();
//! let a = tm.mk_const(b, Some("a"));
//! let not_a = tm.mk_not(a).unwrap();
//!
//! solver.assume(a).unwrap();
//! solver.assume(not_a).unwrap();
//! assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
//! assert!(solver.is_unsat_assumption(a).unwrap());
//!
//! // assumptions only last for one check
//! assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod abort;
pub mod context;
pub mod engine;
pub mod model;
pub mod options;
pub mod preprocess;
pub mod result;
pub mod solver;
pub mod terminate;

pub use abort::{AbortCallback, abort, set_abort_callback};
pub use context::AssertionStack;
pub use engine::Engine;
pub use model::{Model, ModelOracle, ModelValue};
pub use options::{EngineKind, OptionKind, OptionValue, Options};
pub use result::SatResult;
pub use solver::{Solver, Statistics};
pub use terminate::{TerminateCallback, TerminationHandle, TerminationMonitor};
