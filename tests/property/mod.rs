//! Property-based tests for the quotabatch workspace.
//!
//! Run with: cargo test --test property_tests

pub mod coordinator;
