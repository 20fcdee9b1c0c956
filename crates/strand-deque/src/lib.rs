//! # strand-deque
//!
//! A concurrent double-ended queue with copy-on-write snapshots.
//!
//! One writer at a time mutates the deque under an exclusive lock, while any
//! number of readers hold [`Snapshot`]s: point-in-time views that iterate
//! without taking the lock and without blocking the writer. Snapshots are
//! not copies. They share the deque's links, and the writer forks a link
//! instead of rewriting it whenever an open snapshot could still see it.
//!
//! This crate implements:
//! - Versioned links and their older/newer chains
//! - A generational node arena
//! - The modification timeline and snapshot pins
//! - Reclamation of obsolete links when snapshots close
//! - Lifecycle observers
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────────────────────────────────────────────────┐
//!  │ VersionedDeque        (RwLock<DequeState>)             │
//!  │                                                        │
//!  │  begin ──▶ [A v1] ──▶ [B v3] ──▶ [C v1] ──▶ end        │
//!  │                         │ older                        │
//!  │                         ▼                              │
//!  │                       [B v1]   obsolete on v3          │
//!  │                                                        │
//!  │  timeline: modification v3, pinned {v1}                │
//!  │  obsolete: [B v1, ...]                                 │
//!  └────────────────────────────────────────────────────────┘
//!        ▲                                  ▲
//!        │ Arc                              │ Arc
//!   Snapshot @ v1                      Snapshot @ v3
//!   sees A, B v1, C                    sees A, B v3, C
//! ```
//!
//! # Example
//!
//! ```rust
//! use strand_deque::VersionedDeque;
//!
//! let deque = VersionedDeque::new();
//! deque.link_all(["a", "b", "c"]).unwrap();
//!
//! let snapshot = deque.create_snapshot().unwrap();
//! deque.poll_first().unwrap();
//! deque.append("d").unwrap();
//!
//! assert_eq!(snapshot.to_vec().unwrap(), vec!["a", "b", "c"]);
//! drop(snapshot);
//! assert_eq!(deque.stats().obsolete_links, 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// The deque and batched mutations
pub mod deque;

/// Obsolete-link reclamation
pub mod gc;

/// Versioned links
pub mod link;

/// Version markers and the modification timeline
pub mod marker;

/// Node arena
pub mod node;

/// Lifecycle observers
pub mod observer;

/// Point-in-time views
pub mod snapshot;

pub use deque::{DequeStats, DequeTxn, VersionedDeque};
pub use gc::{GcResult, GcStats};
pub use link::{LinkInfo, LinkKind};
pub use marker::VersionMarker;
pub use node::{NodeInfo, NodeMeta};
pub use observer::{DequeObserver, LinkMode, ObserverResult};
pub use snapshot::{Iter, Links, Nodes, Snapshot, SnapshotEntry};

pub use strand_common::{
    DequeConfig, DequeError, DequeResult, NodeHandle, NodeId, ObserverId, SnapshotId, Version,
};
