//! Property-based tests for the CDCL solver
//!
//! Random small CNFs are checked against exhaustive enumeration:
//! - the Sat/Unsat verdict agrees
//! - every reported model satisfies all clauses
//! - failed assumptions are a subset of the assumptions and are unsatisfiable
//!   together with the clauses

use oxbit_sat::{Lit, Solver, SolverResult};
use proptest::prelude::*;

const VARS: i32 = 8;

fn clause_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec((1..=VARS, any::<bool>()), 1..4)
        .prop_map(|lits| lits.into_iter().map(|(v, s)| if s { v } else { -v }).collect())
}

fn cnf_strategy() -> impl Strategy<Value = Vec<Vec<i32>>> {
    prop::collection::vec(clause_strategy(), 0..40)
}

fn satisfies(assignment: u32, clause: &[i32]) -> bool {
    clause.iter().any(|&l| {
        let bit = assignment >> (l.unsigned_abs() - 1) & 1 == 1;
        if l > 0 { bit } else { !bit }
    })
}

fn brute_force(cnf: &[Vec<i32>], fixed: &[i32]) -> bool {
    (0..1u32 << VARS).any(|m| fixed.iter().all(|&l| satisfies(m, &[l])) && cnf.iter().all(|c| satisfies(m, c)))
}

fn load(cnf: &[Vec<i32>]) -> Solver {
    let mut solver = Solver::new();
    for _ in 0..VARS {
        solver.new_var();
    }
    for clause in cnf {
        solver.add_clause_dimacs(clause);
    }
    solver
}

proptest! {
    #[test]
    fn verdict_matches_enumeration(cnf in cnf_strategy()) {
        let mut solver = load(&cnf);
        let result = solver.solve();
        let expected = brute_force(&cnf, &[]);
        prop_assert_eq!(result == SolverResult::Sat, expected);
        if result == SolverResult::Sat {
            let model: u32 = (0..VARS as usize)
                .filter(|&i| solver.model()[i].is_true())
                .map(|i| 1 << i)
                .sum();
            for clause in &cnf {
                prop_assert!(satisfies(model, clause));
            }
        }
    }

    #[test]
    fn assumptions_match_enumeration(
        cnf in cnf_strategy(),
        assumed in prop::collection::vec((1..=VARS, any::<bool>()), 0..4),
    ) {
        let assumed: Vec<i32> = assumed.into_iter().map(|(v, s)| if s { v } else { -v }).collect();
        let mut solver = load(&cnf);
        let lits: Vec<Lit> = assumed.iter().map(|&l| Lit::from_dimacs(l)).collect();
        let result = solver.solve_with_assumptions(&lits);
        prop_assert_eq!(result == SolverResult::Sat, brute_force(&cnf, &assumed));
        if result == SolverResult::Unsat {
            let failed: Vec<i32> = assumed
                .iter()
                .copied()
                .filter(|&l| solver.is_failed(Lit::from_dimacs(l)))
                .collect();
            prop_assert!(!brute_force(&cnf, &failed));
        }
    }

    #[test]
    fn incremental_agrees_with_fresh(cnf in cnf_strategy(), split in 0usize..40) {
        let split = split.min(cnf.len());
        let mut incremental = load(&cnf[..split]);
        incremental.solve();
        for clause in &cnf[split..] {
            incremental.add_clause_dimacs(clause);
        }
        let mut fresh = load(&cnf);
        prop_assert_eq!(incremental.solve(), fresh.solve());
    }
}
