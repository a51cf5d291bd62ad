//! Property-based tests for parameter resolution

mod resolver_determinism;
