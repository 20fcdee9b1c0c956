//! Configuration for strand.
//!
//! This module provides the configuration structure for a versioned deque.

mod deque;

pub use deque::DequeConfig;
