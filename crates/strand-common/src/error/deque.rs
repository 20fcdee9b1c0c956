//! Deque error types.
//!
//! Provides the error type for every fallible deque and snapshot operation.

use std::fmt;
use thiserror::Error;

use crate::types::{NodeHandle, SnapshotId};

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid argument or configuration.
    InvalidArgument = 0x0003,

    // Deque errors (0x0100 - 0x01FF)
    /// Capacity ceiling reached.
    CapacityExceeded = 0x0100,
    /// Deque has no elements.
    Empty = 0x0101,
    /// Node is a sentinel, not a payload node.
    NodeNotPayload = 0x0102,
    /// Deque has been disposed.
    Disposed = 0x0103,

    // Snapshot errors (0x0200 - 0x02FF)
    /// Snapshot has been closed.
    SnapshotClosed = 0x0200,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Deque",
            0x02 => "Snapshot",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The error type for strand.
///
/// Every variant is raised synchronously to the direct caller; the deque
/// never retries internally.
///
/// # Example
///
/// ```rust
/// use strand_common::error::{DequeError, DequeResult};
///
/// fn insert(len: usize, capacity: usize) -> DequeResult<()> {
///     if len >= capacity {
///         return Err(DequeError::CapacityExceeded { capacity });
///     }
///     Ok(())
/// }
///
/// assert!(insert(4, 4).unwrap_err().is_capacity_exceeded());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DequeError {
    /// An insertion would exceed the configured ceiling.
    #[error("deque capacity of {capacity} elements exceeded")]
    CapacityExceeded {
        /// The configured capacity.
        capacity: usize,
    },

    /// The deque is empty.
    #[error("deque is empty")]
    Empty,

    /// Sentinels cannot be unlinked.
    #[error("node {node} is a sentinel and cannot be unlinked")]
    NodeNotPayload {
        /// The sentinel handle.
        node: NodeHandle,
    },

    /// The snapshot was already closed.
    #[error("snapshot {snapshot} is closed")]
    SnapshotClosed {
        /// The closed snapshot.
        snapshot: SnapshotId,
    },

    /// The deque was disposed.
    #[error("deque has been disposed")]
    Disposed,

    /// A core invariant was violated. The deque instance must not be trusted
    /// after this error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl DequeError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
            Self::Empty => ErrorCode::Empty,
            Self::NodeNotPayload { .. } => ErrorCode::NodeNotPayload,
            Self::SnapshotClosed { .. } => ErrorCode::SnapshotClosed,
            Self::Disposed => ErrorCode::Disposed,
            Self::Internal { .. } => ErrorCode::Internal,
            Self::InvalidConfig { .. } => ErrorCode::InvalidArgument,
        }
    }

    /// Returns true if this is a capacity error.
    #[must_use]
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    /// Returns true if this error came from a closed snapshot.
    #[must_use]
    pub const fn is_snapshot_closed(&self) -> bool {
        matches!(self, Self::SnapshotClosed { .. })
    }

    /// Returns true if the deque instance is no longer usable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal { .. } | Self::Disposed)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = DequeError::CapacityExceeded { capacity: 8 };
        assert_eq!(err.code(), ErrorCode::CapacityExceeded);
        assert_eq!(err.code().category(), "Deque");
        assert_eq!(ErrorCode::SnapshotClosed.category(), "Snapshot");
        assert_eq!(ErrorCode::Internal.as_u16(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = DequeError::CapacityExceeded { capacity: 8 };
        assert_eq!(err.to_string(), "deque capacity of 8 elements exceeded");

        let err = DequeError::SnapshotClosed {
            snapshot: SnapshotId::new(3),
        };
        assert_eq!(err.to_string(), "snapshot 3 is closed");

        let err = DequeError::NodeNotPayload {
            node: NodeHandle::BEGIN,
        };
        assert_eq!(err.to_string(), "node 0@0 is a sentinel and cannot be unlinked");
    }

    #[test]
    fn test_predicates() {
        assert!(DequeError::CapacityExceeded { capacity: 1 }.is_capacity_exceeded());
        assert!(!DequeError::Empty.is_capacity_exceeded());
        assert!(DequeError::SnapshotClosed {
            snapshot: SnapshotId::new(1)
        }
        .is_snapshot_closed());
        assert!(DequeError::internal("broken splice").is_fatal());
        assert!(DequeError::Disposed.is_fatal());
        assert!(!DequeError::Empty.is_fatal());
    }

    #[test]
    fn test_invalid_config_code() {
        let err = DequeError::invalid_config("capacity must be positive");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(
            err.to_string(),
            "invalid configuration: capacity must be positive"
        );
    }
}
