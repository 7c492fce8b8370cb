//! Property-based tests for the SAT solver

mod property_tests;
