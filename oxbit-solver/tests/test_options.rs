//! Option handling through the solver

use oxbit_solver::{EngineKind, OptionKind, OptionValue, Options, SatResult, Solver};

#[test]
fn test_set_and_get_by_name() {
    let mut solver = Solver::new();
    solver.set_option_by_name("engine", "prop").unwrap();
    assert_eq!(solver.options().engine, EngineKind::Prop);
    solver.set_option_by_name("seed", 1234u64).unwrap();
    assert_eq!(solver.get_option(OptionKind::Seed), OptionValue::Int(1234));
    solver.set_option_by_name("produce-models", "true").unwrap();
    assert!(solver.options().produce_models);

    let err = solver.set_option_by_name("no-such-option", true).unwrap_err();
    assert!(err.is_config_error());
    let err = solver.set_option_by_name("rewrite-level", 9u64).unwrap_err();
    assert!(err.is_config_error());
    assert_eq!(solver.get_option(OptionKind::RewriteLevel), OptionValue::Int(3));
}

#[test]
fn test_ucopt_conflicts() {
    let mut solver = Solver::with_options(Options::incremental());
    assert!(solver.set_option(OptionKind::Ucopt, true).unwrap_err().is_config_error());

    let mut solver = Solver::new();
    solver.set_option(OptionKind::Ucopt, true).unwrap();
    assert!(
        solver
            .set_option(OptionKind::ProduceModels, true)
            .unwrap_err()
            .is_config_error()
    );
    assert!(
        solver
            .set_option(OptionKind::Incremental, true)
            .unwrap_err()
            .is_config_error()
    );
}

#[test]
fn test_frozen_after_terms() {
    let mut solver = Solver::new();
    solver.set_option(OptionKind::RewriteLevel, 1u64).unwrap();
    solver.set_option(OptionKind::Incremental, true).unwrap();
    let b = solver.tm_mut().mk_bool_sort();
    let _p = solver.tm_mut().mk_const(b, Some("p"));

    let err = solver.set_option(OptionKind::Incremental, false).unwrap_err();
    assert!(err.is_config_error());
    let err = solver.set_option(OptionKind::RewriteLevel, 2u64).unwrap_err();
    assert!(err.is_config_error());
    // setting the current value again is allowed
    solver.set_option(OptionKind::RewriteLevel, 1u64).unwrap();
    // other options stay writable
    solver.set_option(OptionKind::Seed, 5u64).unwrap();
    solver.set_option(OptionKind::ProduceModels, true).unwrap();
}

#[test]
fn test_ucopt_solves_unconstrained_formula() {
    let mut solver = Solver::new();
    solver.set_option(OptionKind::Ucopt, true).unwrap();
    let tm = solver.tm_mut();
    let bv8 = tm.mk_bv_sort(8).unwrap();
    let x = tm.mk_const(bv8, Some("x"));
    let y = tm.mk_const(bv8, Some("y"));
    let k = tm.mk_bv_value_u64(bv8, 77).unwrap();
    let sum = tm.mk_term(oxbit_core::ast::TermKind::BvAdd, &[x, y], &[]).unwrap();
    let eq = tm.mk_eq(sum, k).unwrap();
    solver.assert(eq).unwrap();
    assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
}

#[test]
fn test_minimal_preprocessing_agrees() {
    for options in [Options::minimal(), Options::default()] {
        let mut solver = Solver::with_options(options.with_models(true));
        let tm = solver.tm_mut();
        let bv4 = tm.mk_bv_sort(4).unwrap();
        let x = tm.mk_const(bv4, Some("x"));
        let hi = tm
            .mk_term(oxbit_core::ast::TermKind::BvExtract, &[x], &[3, 2])
            .unwrap();
        let bv2 = tm.mk_bv_sort(2).unwrap();
        let three = tm.mk_bv_value_u64(bv2, 3).unwrap();
        let eq = tm.mk_eq(hi, three).unwrap();
        let lo = tm
            .mk_term(oxbit_core::ast::TermKind::BvExtract, &[x], &[1, 0])
            .unwrap();
        let zero = tm.mk_bv_zero(bv2).unwrap();
        let eq2 = tm.mk_eq(lo, zero).unwrap();
        solver.assert(eq).unwrap();
        solver.assert(eq2).unwrap();
        assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
        let v = solver.get_value(x).unwrap();
        let bits = solver
            .tm()
            .value_of(v)
            .and_then(|v| v.as_bv())
            .and_then(|b| b.to_u64());
        assert_eq!(bits, Some(0b1100));
    }
}
