//! Criterion benchmarks for bit-blasting checks
//!
//! These benchmarks can be run with:
//! ```bash
//! cargo bench -p oxbit-solver
//! ```

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use oxbit_core::TermId;
use oxbit_core::ast::{TermKind, TermManager};
use oxbit_solver::{Options, Solver};

/// `x * y == c` with `x, y > 1`, a factoring problem of the given width
fn factoring(tm: &mut TermManager, width: u32) -> Vec<TermId> {
    let s = tm.mk_bv_sort(width).unwrap();
    let x = tm.mk_const(s, Some("x"));
    let y = tm.mk_const(s, Some("y"));
    let one = tm.mk_bv_one(s).unwrap();
    // 251 * 241, truncated to the width
    let c = tm.mk_bv_value_u64(s, 60_491 & ((1u64 << width.min(63)) - 1)).unwrap();
    let prod = tm.mk_term(TermKind::BvMul, &[x, y], &[]).unwrap();
    vec![
        tm.mk_eq(prod, c).unwrap(),
        tm.mk_term(TermKind::BvUgt, &[x, one], &[]).unwrap(),
        tm.mk_term(TermKind::BvUgt, &[y, one], &[]).unwrap(),
    ]
}

/// Benchmark a single check of a multiplier circuit
fn bench_multiplier(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitblast_multiplier");
    group.sample_size(10);
    for width in [8u32, 16, 24] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let mut solver = Solver::with_options(Options::default());
                let roots = factoring(solver.tm_mut(), width);
                for r in roots {
                    solver.assert(r).unwrap();
                }
                black_box(solver.check_sat().unwrap())
            });
        });
    }
    group.finish();
}

/// Benchmark repeated checks under assumptions on one solver
fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitblast_incremental");
    for checks in [10usize, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(checks), &checks, |b, &checks| {
            b.iter(|| {
                let mut solver = Solver::with_options(Options::incremental());
                let tm = solver.tm_mut();
                let s = tm.mk_bv_sort(16).unwrap();
                let x = tm.mk_const(s, Some("x"));
                let bounds: Vec<TermId> = (0..checks as u64)
                    .map(|i| {
                        let k = tm.mk_bv_value_u64(s, i * 97).unwrap();
                        tm.mk_term(TermKind::BvUge, &[x, k], &[]).unwrap()
                    })
                    .collect();
                for t in bounds {
                    solver.assume(t).unwrap();
                    black_box(solver.check_sat().unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_multiplier, bench_incremental);
criterion_main!(benches);
