//! Property-based tests for incremental solving
//!
//! - push, assert, pop restores both the assertions and the answer
//! - assumptions influence exactly one check

use super::formulas::{Vars, atoms_strategy};
use oxbit_solver::{Options, Solver};
use proptest::prelude::*;

proptest! {
    #[test]
    fn push_pop_is_inverse(base in atoms_strategy(3), extra in atoms_strategy(3)) {
        let mut solver = Solver::with_options(Options::incremental());
        let vars = Vars::new(solver.tm_mut());
        let base = vars.atoms(solver.tm_mut(), &base);
        let extra = vars.atoms(solver.tm_mut(), &extra);
        for &t in &base {
            solver.assert(t).unwrap();
        }
        let before = solver.check_sat().unwrap();
        let assertions = solver.assertions();

        solver.push(1).unwrap();
        for &t in &extra {
            solver.assert(t).unwrap();
        }
        let inner = solver.check_sat().unwrap();
        solver.pop(1).unwrap();

        prop_assert_eq!(solver.level(), 0);
        prop_assert_eq!(solver.assertions(), assertions);
        prop_assert_eq!(solver.check_sat().unwrap(), before);
        // more constraints never turn unsat into sat
        if before.is_unsat() {
            prop_assert!(inner.is_unsat());
        }
    }

    #[test]
    fn assumptions_last_one_check(base in atoms_strategy(3), assumed in atoms_strategy(3)) {
        let mut solver = Solver::with_options(Options::incremental());
        let vars = Vars::new(solver.tm_mut());
        let base = vars.atoms(solver.tm_mut(), &base);
        let assumed = vars.atoms(solver.tm_mut(), &assumed);
        for &t in &base {
            solver.assert(t).unwrap();
        }
        let before = solver.check_sat().unwrap();

        for &t in &assumed {
            solver.assume(t).unwrap();
        }
        let with = solver.check_sat().unwrap();
        if with.is_unsat() {
            let failed = solver.get_unsat_assumptions().unwrap();
            prop_assert!(failed.iter().all(|t| assumed.contains(t)));
        }
        if before.is_unsat() {
            prop_assert!(with.is_unsat());
        }

        prop_assert_eq!(solver.check_sat().unwrap(), before);
        prop_assert_eq!(solver.assertions(), base);
    }
}
