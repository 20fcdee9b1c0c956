//! Type definitions for strand.
//!
//! This module contains the identifier types shared by the deque engine and
//! its consumers.

mod ids;

pub use ids::{NodeHandle, NodeId, ObserverId, SnapshotId, Version};
