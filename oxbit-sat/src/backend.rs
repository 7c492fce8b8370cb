//! SAT backend abstraction
//!
//! The bit-blasting engines only talk to a SAT solver through
//! [`SatBackend`], so alternative solvers can be plugged in without touching
//! the encoders.

use crate::literal::{LBool, Lit, Var};
use crate::solver::{Solver, SolverResult, Terminator};

/// Incremental SAT solver interface used by the SMT engines
pub trait SatBackend: Send {
    /// Backend name, used in logs
    fn name(&self) -> &'static str;

    /// Allocate a fresh variable
    fn new_var(&mut self) -> Var;

    /// Number of allocated variables
    fn num_vars(&self) -> usize;

    /// Add a permanent clause; `false` once the clause set is unsatisfiable
    fn add_clause(&mut self, lits: &[Lit]) -> bool;

    /// Solve under the given assumptions
    fn solve(&mut self, assumptions: &[Lit]) -> SolverResult;

    /// Value of `lit` in the last model
    fn value(&self, lit: Lit) -> LBool;

    /// Was `lit` a failed assumption of the last unsatisfiable call
    fn failed(&self, lit: Lit) -> bool;

    /// Requested worker count
    fn set_threads(&mut self, threads: usize);

    /// Install or remove the termination callback
    fn set_terminate(&mut self, terminate: Option<Terminator>);
}

impl SatBackend for Solver {
    fn name(&self) -> &'static str {
        "cdcl"
    }

    fn new_var(&mut self) -> Var {
        Solver::new_var(self)
    }

    fn num_vars(&self) -> usize {
        Solver::num_vars(self)
    }

    fn add_clause(&mut self, lits: &[Lit]) -> bool {
        Solver::add_clause(self, lits.iter().copied())
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SolverResult {
        self.solve_with_assumptions(assumptions)
    }

    fn value(&self, lit: Lit) -> LBool {
        self.model_value(lit)
    }

    fn failed(&self, lit: Lit) -> bool {
        self.is_failed(lit)
    }

    fn set_threads(&mut self, threads: usize) {
        Solver::set_threads(self, threads);
    }

    fn set_terminate(&mut self, terminate: Option<Terminator>) {
        Solver::set_terminate(self, terminate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_object() {
        let mut sat: Box<dyn SatBackend> = Box::new(Solver::new());
        let a = sat.new_var();
        let b = sat.new_var();
        assert!(sat.add_clause(&[Lit::pos(a), Lit::pos(b)]));
        assert!(sat.add_clause(&[Lit::neg(a)]));
        assert_eq!(sat.solve(&[]), SolverResult::Sat);
        assert!(sat.value(Lit::pos(b)).is_true());
        assert_eq!(sat.solve(&[Lit::neg(b)]), SolverResult::Unsat);
        assert!(sat.failed(Lit::neg(b)));
        assert_eq!(sat.num_vars(), 2);
    }
}
