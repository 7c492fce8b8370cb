//! Property-based tests for oxbit-core

mod fp_properties;
mod rewriter_properties;
mod term_properties;
