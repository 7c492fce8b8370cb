//! Incremental use: clauses added between calls, assumptions, termination

use oxbit_sat::{Lit, Solver, SolverResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Solve, then add a conflicting unit clause
#[test]
fn test_add_unit_after_solve() {
    let mut sat = Solver::new();
    let a = sat.new_var();
    sat.add_clause([Lit::pos(a)]);
    assert_eq!(sat.solve(), SolverResult::Sat);
    assert!(sat.model()[a.index()].is_true());

    assert!(!sat.add_clause([Lit::neg(a)]));
    assert_eq!(sat.solve(), SolverResult::Unsat);
    assert!(sat.failed_assumptions().is_empty());
}

/// Clauses added after a satisfiable call restrict later models
#[test]
fn test_add_clause_after_solve() {
    let mut sat = Solver::new();
    let vars: Vec<_> = (0..4).map(|_| sat.new_var()).collect();
    sat.add_clause(vars.iter().map(|&v| Lit::pos(v)));
    for round in 0..3 {
        assert_eq!(sat.solve(), SolverResult::Sat, "round {round}");
        // block the current model
        let blocking: Vec<Lit> = vars
            .iter()
            .map(|&v| Lit::new(v, !sat.model()[v.index()].is_true()))
            .collect();
        sat.add_clause(blocking);
    }
}

/// Enumerate all models of x1 xor x2 by blocking clauses
#[test]
fn test_model_enumeration() {
    let mut sat = Solver::new();
    sat.add_clause_dimacs(&[1, 2]);
    sat.add_clause_dimacs(&[-1, -2]);
    let mut count = 0;
    while sat.solve() == SolverResult::Sat {
        count += 1;
        let block: Vec<i32> = (1..=2)
            .map(|d: i32| {
                if sat.model()[(d - 1) as usize].is_true() { -d } else { d }
            })
            .collect();
        sat.add_clause_dimacs(&block);
    }
    assert_eq!(count, 2);
}

/// Assumptions hold for one call only
#[test]
fn test_assumptions_are_temporary() {
    let mut sat = Solver::new();
    let a = sat.new_var();
    let b = sat.new_var();
    sat.add_clause([Lit::pos(a), Lit::pos(b)]);

    assert_eq!(
        sat.solve_with_assumptions(&[Lit::neg(a), Lit::neg(b)]),
        SolverResult::Unsat
    );
    assert!(sat.is_failed(Lit::neg(a)) || sat.is_failed(Lit::neg(b)));
    assert!(sat.is_ok());

    assert_eq!(sat.solve_with_assumptions(&[Lit::neg(a)]), SolverResult::Sat);
    assert!(sat.model_value(Lit::pos(b)).is_true());
    assert!(sat.failed_assumptions().is_empty());
}

/// Assuming `a` and `not a` fails both
#[test]
fn test_complementary_assumptions() {
    let mut sat = Solver::new();
    let a = sat.new_var();
    let b = sat.new_var();
    sat.add_clause([Lit::pos(a), Lit::pos(b)]);
    let result = sat.solve_with_assumptions(&[Lit::pos(a), Lit::neg(a)]);
    assert_eq!(result, SolverResult::Unsat);
    assert!(sat.is_failed(Lit::pos(a)));
    assert!(sat.is_failed(Lit::neg(a)));
    assert_eq!(sat.solve(), SolverResult::Sat);
}

/// Assumptions on unused variables grow the variable set
#[test]
fn test_assumption_on_new_variable() {
    let mut sat = Solver::new();
    let result = sat.solve_with_assumptions(&[Lit::from_dimacs(-5)]);
    assert_eq!(result, SolverResult::Sat);
    assert_eq!(sat.num_vars(), 5);
    assert!(sat.model()[4].is_false());
}

fn pigeonhole(sat: &mut Solver, pigeons: usize, holes: usize) {
    let p: Vec<Vec<_>> = (0..pigeons)
        .map(|_| (0..holes).map(|_| sat.new_var()).collect())
        .collect();
    for row in &p {
        sat.add_clause(row.iter().map(|&v| Lit::pos(v)));
    }
    for h in 0..holes {
        for i in 0..pigeons {
            for j in i + 1..pigeons {
                sat.add_clause([Lit::neg(p[i][h]), Lit::neg(p[j][h])]);
            }
        }
    }
}

#[test]
fn test_pigeonhole_5_4() {
    let mut sat = Solver::new();
    pigeonhole(&mut sat, 5, 4);
    assert_eq!(sat.solve(), SolverResult::Unsat);
    assert!(sat.stats().conflicts > 0);
}

/// The callback is polled and stops the search
#[test]
fn test_terminate_is_polled() {
    let mut sat = Solver::new();
    pigeonhole(&mut sat, 9, 8);
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    sat.set_terminate(Some(Box::new(move || counter.fetch_add(1, Ordering::Relaxed) >= 2)));
    assert_eq!(sat.solve(), SolverResult::Unknown);
    assert!(polls.load(Ordering::Relaxed) >= 3);
    assert!(sat.is_ok());
}

/// A conflict budget yields Unknown on hard instances
#[test]
fn test_conflict_budget() {
    let mut sat = Solver::new();
    pigeonhole(&mut sat, 9, 8);
    sat.set_conflict_budget(Some(10));
    assert_eq!(sat.solve(), SolverResult::Unknown);
    assert!(sat.model().is_empty());
}
