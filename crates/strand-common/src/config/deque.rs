//! Deque configuration structures.
//!
//! These structures define all configurable aspects of a versioned deque.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DEQUE_NAME, DEFAULT_RECLAIM_BATCH, MAX_DEQUE_CAPACITY, MIN_RECLAIM_BATCH,
};
use crate::error::{DequeError, DequeResult};

/// Versioned deque configuration.
///
/// # Example
///
/// ```rust
/// use strand_common::config::DequeConfig;
///
/// let config = DequeConfig::default().with_capacity(128).with_name("inbox");
/// assert_eq!(config.capacity, Some(128));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DequeConfig {
    /// Name of the deque, reported in log events and disposal callbacks.
    /// Default: "deque"
    pub name: String,

    /// Ceiling on concurrently linked elements. `None` means unbounded.
    /// Default: None
    pub capacity: Option<usize>,

    /// Record a creation sequence number and wall-clock timestamp per node.
    /// Default: false
    pub node_metadata: bool,

    /// Upper bound on obsolete links drained in one reclamation pass.
    /// Default: 1024
    pub reclaim_batch: usize,
}

impl Default for DequeConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEQUE_NAME.to_string(),
            capacity: None,
            node_metadata: false,
            reclaim_batch: DEFAULT_RECLAIM_BATCH,
        }
    }
}

impl DequeConfig {
    /// Creates a bounded configuration.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Default::default()
        }
    }

    /// Sets the deque name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the capacity ceiling.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Enables or disables per-node metadata.
    #[must_use]
    pub fn with_node_metadata(mut self, enabled: bool) -> Self {
        self.node_metadata = enabled;
        self
    }

    /// Sets the reclamation batch size.
    #[must_use]
    pub fn with_reclaim_batch(mut self, batch: usize) -> Self {
        self.reclaim_batch = batch;
        self
    }

    /// Returns the capacity ceiling, or [`MAX_DEQUE_CAPACITY`] when unbounded.
    #[must_use]
    pub fn effective_capacity(&self) -> usize {
        self.capacity.unwrap_or(MAX_DEQUE_CAPACITY)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> DequeResult<()> {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Err(DequeError::invalid_config("capacity must be at least 1"));
            }
            if capacity > MAX_DEQUE_CAPACITY {
                return Err(DequeError::invalid_config(format!(
                    "capacity {} exceeds maximum {}",
                    capacity, MAX_DEQUE_CAPACITY
                )));
            }
        }

        if self.reclaim_batch < MIN_RECLAIM_BATCH {
            return Err(DequeError::invalid_config(format!(
                "reclaim_batch must be at least {}",
                MIN_RECLAIM_BATCH
            )));
        }

        Ok(())
    }
}
