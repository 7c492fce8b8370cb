//! Floating-point queries decided through the rounding circuits

use oxbit_core::ast::{TermId, TermKind};
use oxbit_core::value::{FpValue, RoundingMode};
use oxbit_solver::{Options, SatResult, Solver};

fn fp_value(solver: &mut Solver, t: TermId) -> FpValue {
    let v = solver.get_value(t).unwrap();
    solver.tm().value_of(v).and_then(|v| v.as_fp()).cloned().unwrap()
}

fn holds(solver: &mut Solver, t: TermId) -> bool {
    let v = solver.get_value(t).unwrap();
    solver.tm().bool_value(v) == Some(true)
}

#[test]
fn test_float32_addition_is_solved_exactly() {
    let mut solver = Solver::with_options(Options::default().with_models(true));
    let tm = solver.tm_mut();
    let f32s = tm.mk_fp_sort(8, 24).unwrap();
    let rne = tm.mk_rm_value(RoundingMode::Rne);
    let x = tm.mk_const(f32s, Some("x"));
    let y = tm.mk_const(f32s, Some("y"));
    let a = tm.mk_fp_value_from_real(f32s, RoundingMode::Rne, "1.5").unwrap();
    let b = tm.mk_fp_value_from_real(f32s, RoundingMode::Rne, "3.75").unwrap();
    let sum = tm.mk_term(TermKind::FpAdd, &[rne, x, y], &[]).unwrap();
    let fixed = tm.mk_eq(x, a).unwrap();
    let target = tm.mk_eq(sum, b).unwrap();
    solver.assert(fixed).unwrap();
    solver.assert(target).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    // 3.75 - 1.5 is the only operand that rounds to 3.75
    assert_eq!(fp_value(&mut solver, y).to_f64(), 2.25);
    assert!(holds(&mut solver, target));
}

#[test]
fn test_float16_square_is_never_negative() {
    let mut solver = Solver::new();
    let tm = solver.tm_mut();
    let f16s = tm.mk_fp_sort(5, 11).unwrap();
    let rne = tm.mk_rm_value(RoundingMode::Rne);
    let x = tm.mk_const(f16s, Some("x"));
    let minus_one = tm.mk_fp_value_from_real(f16s, RoundingMode::Rne, "-1").unwrap();
    let square = tm.mk_term(TermKind::FpMul, &[rne, x, x], &[]).unwrap();
    let eq = tm.mk_term(TermKind::FpEqual, &[square, minus_one], &[]).unwrap();
    solver.assert(eq).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
}

#[test]
fn test_float16_division_model_matches_rounding() {
    let mut solver = Solver::with_options(Options::default().with_models(true));
    let tm = solver.tm_mut();
    let f16s = tm.mk_fp_sort(5, 11).unwrap();
    let rtz = tm.mk_rm_value(RoundingMode::Rtz);
    let x = tm.mk_const(f16s, Some("x"));
    let y = tm.mk_const(f16s, Some("y"));
    let three = tm.mk_fp_value_from_real(f16s, RoundingMode::Rne, "3").unwrap();
    let quot = tm.mk_term(TermKind::FpDiv, &[rtz, x, y], &[]).unwrap();
    let eq = tm.mk_term(TermKind::FpEqual, &[quot, three], &[]).unwrap();
    let big = tm.mk_term(TermKind::FpGt, &[y, three], &[]).unwrap();
    solver.assert(eq).unwrap();
    solver.assert(big).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    let vx = fp_value(&mut solver, x);
    let vy = fp_value(&mut solver, y);
    assert!(vy.to_f64() > 3.0);
    assert_eq!(vx.div(RoundingMode::Rtz, &vy).to_f64(), 3.0);
}

#[test]
fn test_float16_sqrt_and_fma() {
    let mut solver = Solver::with_options(Options::default().with_models(true));
    let tm = solver.tm_mut();
    let f16s = tm.mk_fp_sort(5, 11).unwrap();
    let rne = tm.mk_rm_value(RoundingMode::Rne);
    let x = tm.mk_const(f16s, Some("x"));
    let c = tm.mk_const(f16s, Some("c"));
    let five = tm.mk_fp_value_from_real(f16s, RoundingMode::Rne, "5").unwrap();
    let root = tm.mk_term(TermKind::FpSqrt, &[rne, x], &[]).unwrap();
    let root_eq = tm.mk_term(TermKind::FpEqual, &[root, five], &[]).unwrap();
    let fma = tm.mk_term(TermKind::FpFma, &[rne, x, x, c], &[]).unwrap();
    let zero = tm.mk_fp_pos_zero(f16s).unwrap();
    let fma_eq = tm.mk_term(TermKind::FpEqual, &[fma, zero], &[]).unwrap();
    solver.assert(root_eq).unwrap();
    solver.assert(fma_eq).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);

    let vx = fp_value(&mut solver, x);
    let vc = fp_value(&mut solver, c);
    assert_eq!(vx.sqrt(RoundingMode::Rne).to_f64(), 5.0);
    assert!(vx.fma(RoundingMode::Rne, &vx, &vc).is_zero());
}

#[test]
fn test_float16_conversion_to_signed_bit_vector() {
    let mut solver = Solver::new();
    let tm = solver.tm_mut();
    let f16s = tm.mk_fp_sort(5, 11).unwrap();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let rtz = tm.mk_rm_value(RoundingMode::Rtz);
    let x = tm.mk_const(f16s, Some("x"));
    let six = tm.mk_fp_value_from_real(f16s, RoundingMode::Rne, "6").unwrap();
    let five = tm.mk_bv_value_u64(bv8, 5).unwrap();
    let conv = tm.mk_term(TermKind::FpToSbv, &[rtz, x], &[8]).unwrap();
    let eq = tm.mk_eq(conv, five).unwrap();
    let above = tm.mk_term(TermKind::FpGt, &[x, six], &[]).unwrap();
    solver.assert(eq).unwrap();
    solver.assert(above).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat);
}

#[test]
fn test_float_queries_under_local_search_engines() {
    for engine in ["prop", "sls"] {
        let mut solver = Solver::new();
        solver.set_option_by_name("engine", engine).unwrap();
        let tm = solver.tm_mut();
        let f16s = tm.mk_fp_sort(5, 11).unwrap();
        let rne = tm.mk_rm_value(RoundingMode::Rne);
        let x = tm.mk_const(f16s, Some("x"));
        let minus_one = tm.mk_fp_value_from_real(f16s, RoundingMode::Rne, "-1").unwrap();
        let square = tm.mk_term(TermKind::FpMul, &[rne, x, x], &[]).unwrap();
        let eq = tm.mk_term(TermKind::FpEqual, &[square, minus_one], &[]).unwrap();
        solver.assert(eq).unwrap();
        assert_eq!(solver.check_sat().unwrap(), SatResult::Unsat, "{engine}");
    }
}
