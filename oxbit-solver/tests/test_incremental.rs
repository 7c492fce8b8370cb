//! Incremental use: frames, assumptions and the lifetime of answers

use oxbit_core::ast::{TermId, TermKind};
use oxbit_solver::{Options, SatResult, Solver};

/// Solver with three Boolean constants
fn setup(options: Options) -> (Solver, [TermId; 3]) {
    let mut solver = Solver::with_options(options);
    let tm = solver.tm_mut();
    let b = tm.mk_bool_sort();
    let p = tm.mk_const(b, Some("p"));
    let q = tm.mk_const(b, Some("q"));
    let r = tm.mk_const(b, Some("r"));
    (solver, [p, q, r])
}

#[test]
fn test_non_incremental_restrictions() {
    let (mut solver, [p, _, _]) = setup(Options::default());
    assert!(solver.push(1).unwrap_err().is_state_error());
    assert!(solver.pop(1).unwrap_err().is_state_error());
    assert!(solver.assume(p).unwrap_err().is_state_error());
    solver.assert(p).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
    assert!(solver.check_sat().unwrap_err().is_state_error());
}

#[test]
fn test_pop_too_far_leaves_stack_unchanged() {
    let (mut solver, [p, q, _]) = setup(Options::incremental());
    solver.assert(p).unwrap();
    solver.push(1).unwrap();
    solver.assert(q).unwrap();
    assert!(solver.pop(2).unwrap_err().is_state_error());
    assert_eq!(solver.level(), 1);
    assert_eq!(solver.assertions(), vec![p, q]);
    solver.pop(1).unwrap();
    assert_eq!(solver.assertions(), vec![p]);
    assert_eq!(solver.level(), 0);
}

#[test]
fn test_nested_frames() {
    let (mut solver, [p, q, r]) = setup(Options::incremental());
    let np = solver.tm_mut().mk_not(p).unwrap();
    let q_or_r = solver.tm_mut().mk_or(&[q, r]).unwrap();
    solver.assert(q_or_r).unwrap();
    solver.push(1).unwrap();
    solver.assert(p).unwrap();
    solver.push(2).unwrap();
    solver.assert(np).unwrap();
    assert_eq!(solver.level(), 3);
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    solver.pop(2).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
    solver.pop(1).unwrap();
    solver.assert(np).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
}

#[test]
fn test_assumptions_last_one_check() {
    let (mut solver, [p, q, _]) = setup(Options::incremental());
    let np = solver.tm_mut().mk_not(p).unwrap();
    solver.assert(p).unwrap();
    solver.assume(np).unwrap();
    solver.assume(q).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    assert!(solver.is_unsat_assumption(np).unwrap());
    assert!(!solver.is_unsat_assumption(q).unwrap());
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
}

#[test]
fn test_answers_expire_on_mutation() {
    let (mut solver, [p, q, _]) = setup(Options::incremental());
    let np = solver.tm_mut().mk_not(p).unwrap();
    solver.assert(p).unwrap();
    solver.assume(np).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    assert!(solver.get_unsat_core().is_ok());
    assert!(solver.get_unsat_assumptions().is_ok());

    solver.assert(q).unwrap();
    assert!(solver.get_unsat_core().unwrap_err().is_state_error());
    assert!(solver.get_unsat_assumptions().unwrap_err().is_state_error());
    assert!(solver.is_unsat_assumption(np).unwrap_err().is_state_error());

    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
    assert!(solver.get_value(p).is_ok());
    solver.push(1).unwrap();
    assert!(solver.get_value(p).unwrap_err().is_state_error());
    assert!(solver.get_unsat_core().unwrap_err().is_state_error());
}

#[test]
fn test_unsat_assumption_query_needs_assumed_term() {
    let (mut solver, [p, q, _]) = setup(Options::incremental());
    let np = solver.tm_mut().mk_not(p).unwrap();
    solver.assume(p).unwrap();
    solver.assume(np).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    assert!(solver.is_unsat_assumption(q).unwrap_err().is_state_error());
}

#[test]
fn test_fixated_assumptions_belong_to_the_frame() {
    let (mut solver, [p, _, _]) = setup(Options::incremental());
    let np = solver.tm_mut().mk_not(p).unwrap();
    solver.assert(p).unwrap();
    solver.push(1).unwrap();
    solver.assume(np).unwrap();
    solver.fixate_assumptions();
    assert_eq!(solver.assertions(), vec![p, np]);
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    // still there: fixated assumptions are not consumed by a check
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    solver.pop(1).unwrap();
    assert_eq!(solver.assertions(), vec![p]);
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
}

#[test]
fn test_reset_assumptions() {
    let (mut solver, [p, _, _]) = setup(Options::incremental());
    let np = solver.tm_mut().mk_not(p).unwrap();
    solver.assert(p).unwrap();
    solver.assume(np).unwrap();
    solver.reset_assumptions();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
}

#[test]
fn test_unsat_core_of_bit_vector_conflict() {
    let mut solver = Solver::with_options(Options::incremental());
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let x = tm.mk_const(bv8, Some("x"));
    let y = tm.mk_const(bv8, Some("y"));
    let three = tm.mk_bv_value_u64(bv8, 3).unwrap();
    let ten = tm.mk_bv_value_u64(bv8, 10).unwrap();
    let lt = tm.mk_term(TermKind::BvUlt, &[x, three], &[]).unwrap();
    let gt = tm.mk_term(TermKind::BvUgt, &[x, ten], &[]).unwrap();
    let other = tm.mk_eq(y, ten).unwrap();
    solver.assert(lt).unwrap();
    solver.assert(other).unwrap();
    solver.assert(gt).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    let core = solver.get_unsat_core().unwrap();
    assert!(core.contains(&lt));
    assert!(core.contains(&gt));
}

#[test]
fn test_unsat_core_needs_option() {
    let (mut solver, [p, _, _]) = setup(Options::default().with_incremental(true));
    let f = solver.tm_mut().mk_false();
    solver.assert(p).unwrap();
    solver.assert(f).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    assert!(solver.get_unsat_core().unwrap_err().is_config_error());
    assert!(solver.get_unsat_assumptions().unwrap().is_empty());
}

#[test]
fn test_garbage_collect_between_checks() {
    let mut solver = Solver::with_options(Options::incremental());
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let x = tm.mk_const(bv8, Some("x"));
    let k = tm.mk_bv_value_u64(bv8, 42).unwrap();
    let eq = tm.mk_eq(x, k).unwrap();
    solver.assert(eq).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    let tm = solver.tm_mut();
    let scratch = tm.mk_term(TermKind::BvMul, &[x, x], &[]).unwrap();
    tm.release(scratch);
    assert!(solver.garbage_collect() >= 1);
    assert!(solver.tm().get(scratch).is_none());
    assert!(solver.tm().get(eq).is_some());

    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
    let v = solver.get_value(x).unwrap();
    let got = solver.tm().value_of(v).and_then(|v| v.as_bv()).and_then(|b| b.to_u64());
    assert_eq!(got, Some(42));
}

#[test]
fn test_repeated_checks_leave_no_owned_terms() {
    let mut solver = Solver::with_options(Options::incremental());
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let x = tm.mk_const(bv8, Some("x"));
    let y = tm.mk_const(bv8, Some("y"));
    let prod = tm.mk_term(TermKind::BvMul, &[x, y], &[]).unwrap();
    let target = tm.mk_bv_value_u64(bv8, 42).unwrap();
    let eq = tm.mk_eq(prod, target).unwrap();
    solver.assert(eq).unwrap();
    solver.garbage_collect();
    let baseline = solver.tm().num_terms();

    for round in 1..=3u64 {
        solver.push(1).unwrap();
        let tm = solver.tm_mut();
        let k = tm.mk_bv_value_u64(bv8, round).unwrap();
        let gt = tm.mk_term(TermKind::BvUgt, &[x, k], &[]).unwrap();
        solver.assert(gt).unwrap();
        assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
        let v = solver.get_value(x).unwrap();
        assert_eq!(solver.simplify().unwrap(), SatResult::Unknown);
        solver.pop(1).unwrap();

        let tm = solver.tm_mut();
        for t in [v, gt, k] {
            tm.release(t);
        }
        solver.garbage_collect();
        assert_eq!(solver.tm().num_terms(), baseline, "round {round}");
    }
}
