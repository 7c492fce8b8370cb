//! Property-based tests for term construction
//!
//! - Hash-consing identity and owner counts
//! - Literal construction
//! - Substitution and garbage collection

use oxbit_core::ast::{SubstMap, TermKind, TermManager};
use proptest::prelude::*;

const BINARY: [TermKind; 12] = [
    TermKind::BvAdd,
    TermKind::BvSub,
    TermKind::BvMul,
    TermKind::BvAnd,
    TermKind::BvOr,
    TermKind::BvXor,
    TermKind::BvUdiv,
    TermKind::BvUrem,
    TermKind::BvShl,
    TermKind::BvShr,
    TermKind::BvAshr,
    TermKind::BvSmod,
];

fn width_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![1u32..=16, Just(32u32), Just(64u32), 65u32..=130]
}

proptest! {
    /// Identical construction requests return the same term, and each
    /// request counts as one owner
    #[test]
    fn hash_consing_identity(k1 in 0..BINARY.len(), k2 in 0..BINARY.len(), w in width_strategy()) {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(w).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let a = tm.mk_term(BINARY[k1], &[x, y], &[]).unwrap();
        let b = tm.mk_term(BINARY[k1], &[x, y], &[]).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(tm.ref_count(a), 2);
        let c = tm.mk_term(BINARY[k2], &[x, y], &[]).unwrap();
        prop_assert_eq!(a == c, k1 == k2);
        tm.release(a);
        tm.release(b);
        prop_assert_eq!(tm.ref_count(a), u32::from(k1 == k2));
    }

    /// Constants are never shared, whatever their symbol
    #[test]
    fn constants_are_fresh(name in "[a-z]{1,4}", w in width_strategy()) {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(w).unwrap();
        let a = tm.mk_const(s, Some(&name));
        let b = tm.mk_const(s, Some(&name));
        prop_assert_ne!(a, b);
        prop_assert_eq!(tm.symbol(a), Some(name.as_str()));
    }

    /// `u64` literals are truncated to the sort width and agree with the
    /// decimal string form
    #[test]
    fn u64_values_truncate(n in any::<u64>(), w in 1u32..=64) {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(w).unwrap();
        let a = tm.mk_bv_value_u64(s, n).unwrap();
        let masked = if w == 64 { n } else { n & ((1u64 << w) - 1) };
        let b = tm.mk_bv_value(s, &masked.to_string(), 10).unwrap();
        prop_assert_eq!(a, b);
        let c = tm.mk_bv_value(s, &format!("{masked:b}"), 2).unwrap();
        prop_assert_eq!(a, c);
        let d = tm.mk_bv_value(s, &format!("{masked:x}"), 16).unwrap();
        prop_assert_eq!(a, d);
    }

    /// Decimal literals that do not fit the width are rejected
    #[test]
    fn out_of_range_literals_fail(w in 1u32..=32, extra in 0u64..1000) {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(w).unwrap();
        let too_big = (1u64 << w) + extra;
        let err = tm.mk_bv_value(s, &too_big.to_string(), 10).unwrap_err();
        prop_assert!(err.is_value_error());
    }

    /// Substituting a constant by a fresh one and back is the identity
    #[test]
    fn substitution_round_trip(k1 in 0..BINARY.len(), k2 in 0..BINARY.len()) {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let inner = tm.mk_term(BINARY[k1], &[x, y], &[]).unwrap();
        let t = tm.mk_term(BINARY[k2], &[inner, x], &[]).unwrap();
        let z = tm.mk_const(s, Some("z"));
        let mut map = SubstMap::default();
        map.insert(x, z);
        let renamed = tm.substitute(t, &map).unwrap();
        prop_assert!(!tm.occurs(x, renamed));
        prop_assert!(tm.occurs(z, renamed));
        let mut back = SubstMap::default();
        back.insert(z, x);
        prop_assert_eq!(tm.substitute(renamed, &back).unwrap(), t);
    }

    /// Released terms are freed by garbage collection and their handles
    /// dangle, while owned terms survive
    #[test]
    fn garbage_collection_frees_released(k in 0..BINARY.len()) {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let t = tm.mk_term(BINARY[k], &[x, y], &[]).unwrap();
        let u = tm.mk_term(TermKind::BvNot, &[t], &[]).unwrap();
        tm.release(u);
        tm.garbage_collect();
        prop_assert!(tm.get(u).is_none());
        prop_assert!(tm.get(t).is_some());
        prop_assert!(tm.get(x).is_some());
        let again = tm.mk_term(TermKind::BvNot, &[t], &[]).unwrap();
        prop_assert_ne!(again, u);
    }
}
