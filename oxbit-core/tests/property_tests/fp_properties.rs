//! Property-based tests for the floating-point kernel
//!
//! Single precision results are compared bit for bit against the host's
//! IEEE-754 arithmetic, which rounds to nearest, ties to even.

use oxbit_core::value::{BitVec, FpValue, RoundingMode};
use proptest::prelude::*;

const RNE: RoundingMode = RoundingMode::Rne;

fn f32v(x: f32) -> FpValue {
    FpValue::from_bits(8, 24, BitVec::from_u64(32, u64::from(x.to_bits())))
}

fn same(kernel: &FpValue, native: f32) -> bool {
    if native.is_nan() {
        return kernel.is_nan();
    }
    kernel.bits().to_u64() == Some(u64::from(native.to_bits()))
}

fn any_f32() -> impl Strategy<Value = f32> {
    prop_oneof![
        any::<u32>().prop_map(f32::from_bits),
        (-1.0e6f32..1.0e6f32),
        (-1.0e-36f32..1.0e-36f32),
        Just(0.0f32),
        Just(-0.0f32),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

proptest! {
    #[test]
    fn add_matches_native(a in any_f32(), b in any_f32()) {
        prop_assert!(same(&f32v(a).add(RNE, &f32v(b)), a + b));
        prop_assert!(same(&f32v(a).sub(RNE, &f32v(b)), a - b));
    }

    #[test]
    fn mul_div_match_native(a in any_f32(), b in any_f32()) {
        prop_assert!(same(&f32v(a).mul(RNE, &f32v(b)), a * b));
        prop_assert!(same(&f32v(a).div(RNE, &f32v(b)), a / b));
    }

    #[test]
    fn fma_matches_native(a in any_f32(), b in any_f32(), c in any_f32()) {
        prop_assert!(same(&f32v(a).fma(RNE, &f32v(b), &f32v(c)), a.mul_add(b, c)));
    }

    #[test]
    fn sqrt_matches_native(a in any_f32()) {
        prop_assert!(same(&f32v(a).sqrt(RNE), a.sqrt()));
    }

    #[test]
    fn comparisons_match_native(a in any_f32(), b in any_f32()) {
        let (x, y) = (f32v(a), f32v(b));
        prop_assert_eq!(x.lt(&y), a < b);
        prop_assert_eq!(x.leq(&y), a <= b);
        prop_assert_eq!(x.fp_eq(&y), a == b);
    }

    #[test]
    fn conversions_match_native(a in any_f32(), d in any::<u64>(), i in any::<i32>()) {
        let wide = f32v(a).convert(RNE, 11, 53);
        let native_wide = f64::from(a);
        if native_wide.is_nan() {
            prop_assert!(wide.is_nan());
        } else {
            prop_assert_eq!(wide.bits().to_u64(), Some(native_wide.to_bits()));
        }
        let double = FpValue::from_bits(11, 53, BitVec::from_u64(64, d));
        prop_assert!(same(&double.convert(RNE, 8, 24), f64::from_bits(d) as f32));
        let from_int = FpValue::from_sbv(8, 24, RNE, &BitVec::from_u64(32, u64::from(i as u32)));
        prop_assert!(same(&from_int, i as f32));
    }

    #[test]
    fn truncation_to_signed(a in -2.0e9f32..2.0e9f32) {
        let bv = f32v(a).to_sbv(RoundingMode::Rtz, 32);
        prop_assert_eq!(bv.to_u64(), Some(u64::from(a as i32 as u32)));
    }

    #[test]
    fn decimal_literals_match_native(int in 0u32..1_000_000, frac in 0u32..1_000_000, neg in any::<bool>()) {
        let text = format!("{}{int}.{frac:06}", if neg { "-" } else { "" });
        let v = FpValue::from_real_str(8, 24, RNE, &text).unwrap();
        let native: f32 = text.parse().unwrap();
        prop_assert!(same(&v, native));
    }
}
