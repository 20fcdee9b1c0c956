//! # strand-test
//!
//! Integration tests for strand.
//!
//! This crate contains:
//! - Snapshot isolation and reclamation scenarios
//! - A reference model that replays operations against a `VecDeque`
//! - Randomized workload generators
//! - Concurrency stress tests

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;

/// Reference model checking
pub mod model;

/// Workload generators
pub mod workload;
