//! Core identifier types for strand.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in a deque's modification timeline.
///
/// Versions are monotonically increasing. Every link in the deque is stamped
/// with the version it was created on, and every snapshot observes exactly
/// one version.
///
/// # Example
///
/// ```rust
/// use strand_common::types::Version;
///
/// let v = Version::INITIAL;
/// assert!(v.next() > v);
/// assert_eq!(v.next().as_u64(), 2);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Version(u64);

impl Version {
    /// Version before any modification. Never stamped on a link.
    pub const ZERO: Self = Self(0);

    /// First modification version of a fresh deque.
    pub const INITIAL: Self = Self(1);

    /// Upper bound, used as "no version pinned".
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a new `Version` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the following version.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAX {
            write!(f, "Version(MAX)")
        } else {
            write!(f, "Version({})", self.0)
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for Version {
    #[inline]
    fn from(version: u64) -> Self {
        Self::new(version)
    }
}

impl From<Version> for u64 {
    #[inline]
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Handle to a node slot in a deque's node arena.
///
/// A handle is an arena index plus the generation of the slot at the time the
/// node was created. Once the node is disposed its slot may be recycled with a
/// bumped generation, so a stale handle never aliases a newer node.
///
/// Handles are plain values: they hold no reference into the deque and are
/// resolved through it on every access.
///
/// # Example
///
/// ```rust
/// use strand_common::types::NodeHandle;
///
/// let handle = NodeHandle::new(7, 3);
/// assert_eq!(handle.index(), 7);
/// assert!(!handle.is_sentinel());
/// assert!(NodeHandle::BEGIN.is_sentinel());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl NodeHandle {
    /// Handle of the begin sentinel.
    pub const BEGIN: Self = Self::new(0, 0);

    /// Handle of the end sentinel.
    pub const END: Self = Self::new(1, 0);

    /// Number of arena slots reserved for sentinels.
    pub const RESERVED_SLOTS: u32 = 2;

    /// Creates a handle from an arena index and slot generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the arena index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the slot generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Checks if this handle names one of the two sentinels.
    #[inline]
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.index < Self::RESERVED_SLOTS
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BEGIN => write!(f, "NodeHandle(BEGIN)"),
            Self::END => write!(f, "NodeHandle(END)"),
            _ => write!(f, "NodeHandle({}@{})", self.index, self.generation),
        }
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.index, self.generation)
    }
}

/// Opaque node identity.
///
/// Unlike [`NodeHandle`], a `NodeId` is never reused within one deque: it is
/// drawn from a per-deque sequence when the node is created.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new `NodeId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot identifier, unique within one deque.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SnapshotId(u64);

impl SnapshotId {
    /// Creates a new `SnapshotId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotId({})", self.0)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a registered lifecycle observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Creates a new `ObserverId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}
