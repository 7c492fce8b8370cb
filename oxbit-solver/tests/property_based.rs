//! Property-based tests for the solver
//!
//! Run with: cargo test --test property_based

mod property_tests;
