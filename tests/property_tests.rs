//! Property-based tests for the load balancer.
//!
//! Run with: cargo test --test property_tests

mod property;
