//! Model queries after satisfiable checks

use oxbit_core::ast::{TermId, TermKind};
use oxbit_solver::{Options, SatResult, Solver};

fn bv_value(solver: &Solver, t: TermId) -> Option<u64> {
    solver
        .tm()
        .value_of(t)
        .and_then(|v| v.as_bv())
        .and_then(|b| b.to_u64())
}

fn model_solver() -> Solver {
    Solver::with_options(Options::default().with_models(true))
}

#[test]
fn test_bit_vector_model_satisfies_assertions() {
    let mut solver = model_solver();
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let x = tm.mk_const(bv8, Some("x"));
    let y = tm.mk_const(bv8, Some("y"));
    let k = tm.mk_bv_value_u64(bv8, 200).unwrap();
    let sum = tm.mk_term(TermKind::BvAdd, &[x, y], &[]).unwrap();
    let eq = tm.mk_eq(sum, k).unwrap();
    let ten = tm.mk_bv_value_u64(bv8, 10).unwrap();
    let small = tm.mk_term(TermKind::BvUlt, &[x, ten], &[]).unwrap();
    solver.assert(eq).unwrap();
    solver.assert(small).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    let vals = solver.get_values(&[x, y]).unwrap();
    let vx = bv_value(&solver, vals[0]).unwrap();
    let vy = bv_value(&solver, vals[1]).unwrap();
    assert!(vx < 10);
    assert_eq!((vx + vy) % 256, 200);

    let holds = solver.get_value(eq).unwrap();
    assert_eq!(solver.tm().bool_value(holds), Some(true));
}

#[test]
fn test_array_model() {
    let mut solver = model_solver();
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let arr = tm.mk_array_sort(bv8, bv8).unwrap();
    let a = tm.mk_const(arr, Some("a"));
    let i = tm.mk_const(bv8, Some("i"));
    let seven = tm.mk_bv_value_u64(bv8, 7).unwrap();
    let three = tm.mk_bv_value_u64(bv8, 3).unwrap();
    let read = tm.mk_select(a, i).unwrap();
    let read_is_seven = tm.mk_eq(read, seven).unwrap();
    let i_is_three = tm.mk_eq(i, three).unwrap();
    let at_three = tm.mk_select(a, three).unwrap();
    solver.assert(read_is_seven).unwrap();
    solver.assert(i_is_three).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    let v = solver.get_value(at_three).unwrap();
    assert_eq!(bv_value(&solver, v), Some(7));
    let vi = solver.get_value(i).unwrap();
    assert_eq!(bv_value(&solver, vi), Some(3));
    // the array itself is rendered as a value term
    let va = solver.get_value(a).unwrap();
    assert!(matches!(
        solver.tm()[va].kind,
        TermKind::ArrayStore | TermKind::ConstArray
    ));
}

#[test]
fn test_function_model_separates_arguments() {
    let mut solver = model_solver();
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let fs = tm.mk_fun_sort(&[bv8], bv8).unwrap();
    let f = tm.mk_const(fs, Some("f"));
    let x = tm.mk_const(bv8, Some("x"));
    let y = tm.mk_const(bv8, Some("y"));
    let three = tm.mk_bv_value_u64(bv8, 3).unwrap();
    let four = tm.mk_bv_value_u64(bv8, 4).unwrap();
    let fx = tm.mk_apply(f, &[x]).unwrap();
    let fy = tm.mk_apply(f, &[y]).unwrap();
    let a = tm.mk_eq(fx, three).unwrap();
    let b = tm.mk_eq(fy, four).unwrap();
    solver.assert(a).unwrap();
    solver.assert(b).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    let vx = solver.get_value(x).unwrap();
    let vy = solver.get_value(y).unwrap();
    assert_ne!(bv_value(&solver, vx), bv_value(&solver, vy));
    let vfx = solver.get_value(fx).unwrap();
    let vfy = solver.get_value(fy).unwrap();
    assert_eq!(bv_value(&solver, vfx), Some(3));
    assert_eq!(bv_value(&solver, vfy), Some(4));
    let vf = solver.get_value(f).unwrap();
    assert_eq!(solver.tm()[vf].kind, TermKind::Lambda);
}

#[test]
fn test_print_model() {
    let mut solver = model_solver();
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let b = tm.mk_bool_sort();
    let x = tm.mk_const(bv8, Some("x"));
    let p = tm.mk_const(b, Some("p"));
    let five = tm.mk_bv_value_u64(bv8, 5).unwrap();
    let eq = tm.mk_eq(x, five).unwrap();
    let both = tm.mk_and(&[eq, p]).unwrap();
    solver.assert(both).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    let text = solver.print_model().unwrap();
    assert!(text.starts_with('('));
    assert!(text.contains("(define-fun x () (_ BitVec 8)"));
    assert!(text.contains("(define-fun p () Bool true)"));
}

#[test]
fn test_model_queries_need_sat() {
    let mut solver = Solver::with_options(Options::incremental());
    let tm = solver.tm_mut();
    let b = tm.mk_bool_sort();
    let p = tm.mk_const(b, Some("p"));
    let f = tm.mk_false();
    assert!(solver.get_value(p).unwrap_err().is_state_error());
    solver.push(1).unwrap();
    solver.assert(f).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
    assert!(solver.get_value(p).unwrap_err().is_state_error());
    assert!(solver.print_model().unwrap_err().is_state_error());
    solver.pop(1).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
    // constants outside the assertions get a default value
    let v = solver.get_value(p).unwrap();
    assert!(solver.tm().bool_value(v).is_some());
}

#[test]
fn test_model_queries_need_option() {
    let mut solver = Solver::new();
    let tm = solver.tm_mut();
    let b = tm.mk_bool_sort();
    let p = tm.mk_const(b, Some("p"));
    solver.assert(p).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
    assert!(solver.get_value(p).unwrap_err().is_config_error());
}

#[test]
fn test_print_formula() {
    let mut solver = Solver::new();
    let tm = solver.tm_mut();
    let bv4 = tm.mk_bv_sort(4).unwrap();
    let x = tm.mk_const(bv4, Some("x"));
    let zero = tm.mk_bv_zero(bv4).unwrap();
    let eq = tm.mk_eq(x, zero).unwrap();
    solver.assert(eq).unwrap();
    let text = solver.print_formula();
    assert!(text.contains("(declare-const x (_ BitVec 4))"));
    assert!(text.contains("(assert"));
    assert!(text.contains("(check-sat)"));
}
