//! # strand-common
//!
//! Common types, errors, and configuration for strand.
//!
//! This crate provides the foundational types shared by the versioned deque
//! engine and its consumers. It includes:
//!
//! - **Types**: Identifiers (`Version`, `NodeHandle`, `NodeId`, `SnapshotId`)
//! - **Errors**: Unified error handling with `DequeError`
//! - **Config**: Deque configuration (`DequeConfig`)
//! - **Constants**: Defaults and limits
//!
//! ## Example
//!
//! ```rust
//! use strand_common::config::DequeConfig;
//! use strand_common::error::DequeResult;
//! use strand_common::types::Version;
//!
//! fn example() -> DequeResult<()> {
//!     let config = DequeConfig::bounded(64);
//!     config.validate()?;
//!     assert!(Version::INITIAL.next() > Version::INITIAL);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::DequeConfig;
pub use constants::*;
pub use error::{DequeError, DequeResult, ErrorCode};
pub use types::{NodeHandle, NodeId, ObserverId, SnapshotId, Version};
