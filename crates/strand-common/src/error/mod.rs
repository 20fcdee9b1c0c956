//! Error handling for strand.
//!
//! This module provides a unified error type and result alias used
//! across all strand components.

mod deque;

pub use deque::{DequeError, ErrorCode};

/// Result type alias for deque operations.
pub type DequeResult<T> = std::result::Result<T, DequeError>;
