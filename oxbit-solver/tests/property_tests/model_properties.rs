//! Property-based tests for answers
//!
//! - Model soundness: substituting the model values makes every assertion
//!   rewrite to true
//! - Unsat core soundness: the core alone is unsatisfiable

use super::formulas::{Vars, atoms_strategy};
use oxbit_core::ast::SubstMap;
use oxbit_core::rewrite::Rewriter;
use oxbit_solver::{Options, SatResult, Solver};
use proptest::prelude::*;

proptest! {
    #[test]
    fn models_satisfy_assertions(atoms in atoms_strategy(5), level in 0u8..=3) {
        let options = Options::default().with_models(true).with_rewrite_level(level);
        let mut solver = Solver::with_options(options);
        let vars = Vars::new(solver.tm_mut());
        let assertions = vars.atoms(solver.tm_mut(), &atoms);
        for &t in &assertions {
            solver.assert(t).unwrap();
        }
        if solver.check_sat().unwrap() != SatResult::Sat {
            return Ok(());
        }
        let values = solver.get_values(&vars.consts).unwrap();
        let map: SubstMap = vars.consts.iter().copied().zip(values).collect();
        let mut rw = Rewriter::new(1);
        for &t in &assertions {
            let ground = solver.tm_mut().substitute(t, &map).unwrap();
            let v = rw.normalize(solver.tm_mut(), ground).unwrap();
            prop_assert_eq!(solver.tm().bool_value(v), Some(true));
        }
    }

    #[test]
    fn unsat_cores_are_unsat(atoms in atoms_strategy(6)) {
        let options = Options::default().with_unsat_cores(true);
        let mut solver = Solver::with_options(options.clone());
        let vars = Vars::new(solver.tm_mut());
        let assertions = vars.atoms(solver.tm_mut(), &atoms);
        for &t in &assertions {
            solver.assert(t).unwrap();
        }
        if solver.check_sat().unwrap() != SatResult::Unsat {
            return Ok(());
        }
        let core = solver.get_unsat_core().unwrap();
        prop_assert!(!core.is_empty());
        prop_assert!(core.iter().all(|t| assertions.contains(t)));

        let mut again = Solver::with_options(options);
        let vars = Vars::new(again.tm_mut());
        let core_atoms: Vec<_> = assertions
            .iter()
            .zip(&atoms)
            .filter(|(t, _)| core.contains(t))
            .map(|(_, a)| a.clone())
            .collect();
        for t in vars.atoms(again.tm_mut(), &core_atoms) {
            again.assert(t).unwrap();
        }
        prop_assert_eq!(again.check_sat().unwrap(), SatResult::Unsat);
    }
}
