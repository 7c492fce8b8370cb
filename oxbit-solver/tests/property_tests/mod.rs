//! Property-based tests for oxbit-solver

mod formulas;
mod incremental_properties;
mod model_properties;
