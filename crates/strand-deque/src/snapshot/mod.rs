//! Point-in-time views of a versioned deque.
//!
//! A [`Snapshot`] is bound to one version of the deque. It captures the
//! first and last links and the element count at that version and pins the
//! version, which keeps every link it can reach from being reclaimed. Reading
//! a snapshot never takes the deque lock.
//!
//! # Lifecycle
//!
//! ```text
//!   create_snapshot ──▶ open ──close()/drop──▶ closed
//!                        │                        │
//!                   pins version            unpins; last one out
//!                                           reclaims obsolete links
//! ```
//!
//! Removal through a snapshot (`unlink`, `remove`, `remove_if`, ...) is
//! routed to the live deque and takes its lock for the duration of the
//! call. The snapshot itself keeps showing the removed elements.

mod iter;

pub use iter::{Iter, Links, Nodes, SnapshotEntry};

use std::fmt;
use std::sync::Arc;

use strand_common::error::{DequeError, DequeResult};
use strand_common::types::{NodeHandle, SnapshotId, Version};

use crate::deque::Shared;
use crate::gc::GcResult;
use crate::link::LinkVersion;

/// What a snapshot captured when it was opened.
pub(crate) struct SnapshotView<T> {
    pub(crate) id: SnapshotId,
    pub(crate) version: Version,
    pub(crate) first: Arc<LinkVersion<T>>,
    pub(crate) last: Arc<LinkVersion<T>>,
    pub(crate) size: usize,
}

/// An immutable, point-in-time view of a [`VersionedDeque`].
///
/// [`VersionedDeque`]: crate::VersionedDeque
///
/// # Example
///
/// ```rust
/// use strand_deque::VersionedDeque;
///
/// let deque = VersionedDeque::new();
/// deque.append("a").unwrap();
/// let snapshot = deque.create_snapshot().unwrap();
/// deque.append("b").unwrap();
///
/// let seen: Vec<_> = snapshot.iter().unwrap().map(|e| *e).collect();
/// assert_eq!(seen, vec!["a"]);
/// assert_eq!(deque.len(), 2);
/// ```
pub struct Snapshot<T> {
    deque: Arc<Shared<T>>,
    view: SnapshotView<T>,
    closed: bool,
}

impl<T> Snapshot<T> {
    pub(crate) fn new(deque: Arc<Shared<T>>, view: SnapshotView<T>) -> Self {
        Self {
            deque,
            view,
            closed: false,
        }
    }

    /// Returns the snapshot identifier.
    pub fn id(&self) -> SnapshotId {
        self.view.id
    }

    /// Returns the version this snapshot observes.
    pub fn version(&self) -> Version {
        self.view.version
    }

    /// Checks if the snapshot was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> DequeResult<()> {
        if self.closed {
            return Err(DequeError::SnapshotClosed {
                snapshot: self.view.id,
            });
        }
        if self.deque.is_disposed() {
            return Err(DequeError::Disposed);
        }
        Ok(())
    }

    /// Returns the number of elements in the snapshot.
    pub fn len(&self) -> DequeResult<usize> {
        self.check_open()?;
        Ok(self.view.size)
    }

    /// Checks if the snapshot has no elements.
    pub fn is_empty(&self) -> DequeResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterates the elements front to back. Reversible.
    pub fn iter(&self) -> DequeResult<Iter<'_, T>> {
        self.check_open()?;
        Ok(Iter::new(&self.view))
    }

    /// Iterates the nodes with their elements.
    pub fn nodes(&self) -> DequeResult<Nodes<'_, T>> {
        self.check_open()?;
        Ok(Nodes::new(&self.view))
    }

    /// Iterates the link versions the snapshot resolves to.
    pub fn links(&self) -> DequeResult<Links<'_, T>> {
        self.check_open()?;
        Ok(Links::new(&self.view))
    }

    /// Returns the first element.
    pub fn first(&self) -> DequeResult<Option<Arc<T>>> {
        Ok(self.iter()?.next())
    }

    /// Returns the last element.
    pub fn last(&self) -> DequeResult<Option<Arc<T>>> {
        Ok(self.iter()?.next_back())
    }

    /// Returns the first node.
    pub fn first_node(&self) -> DequeResult<Option<SnapshotEntry<T>>> {
        Ok(self.nodes()?.next())
    }

    /// Returns the last node.
    pub fn last_node(&self) -> DequeResult<Option<SnapshotEntry<T>>> {
        Ok(self.nodes()?.next_back())
    }

    /// Returns the first node whose element matches `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> DequeResult<Option<SnapshotEntry<T>>>
    where
        F: FnMut(&T) -> bool,
    {
        Ok(self.nodes()?.find(|entry| predicate(&entry.element)))
    }

    /// Collects the elements as shared references.
    pub fn elements(&self) -> DequeResult<Vec<Arc<T>>> {
        Ok(self.iter()?.collect())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Unlinks `node` from the live deque.
    ///
    /// Returns `false` if the node was already unlinked. The snapshot keeps
    /// showing it.
    pub fn unlink(&self, node: NodeHandle) -> DequeResult<bool> {
        self.check_open()?;
        self.deque.unlink(node)
    }

    /// Unlinks from the live deque every node of this snapshot whose element
    /// matches `predicate`. Returns how many were still linked.
    pub fn remove_if<F>(&self, mut predicate: F) -> DequeResult<usize>
    where
        F: FnMut(&T) -> bool,
    {
        let nodes: Vec<NodeHandle> = self
            .nodes()?
            .filter(|entry| predicate(&entry.element))
            .map(|entry| entry.node)
            .collect();
        if nodes.is_empty() {
            return Ok(0);
        }
        self.deque.unlink_many(&nodes)
    }

    /// Keeps only the nodes whose element matches `predicate`.
    pub fn retain_only<F>(&self, mut predicate: F) -> DequeResult<usize>
    where
        F: FnMut(&T) -> bool,
    {
        self.remove_if(|element| !predicate(element))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Closes the snapshot. Idempotent.
    ///
    /// When this was the last snapshot pinned to its version, obsolete links
    /// that no other snapshot can reach are reclaimed.
    pub fn close(&mut self) -> GcResult {
        if self.closed {
            return GcResult::default();
        }
        self.closed = true;
        self.deque.close_snapshot(self.view.id, self.view.version)
    }
}

impl<T: PartialEq> Snapshot<T> {
    /// Checks if the snapshot contains `value`.
    pub fn contains(&self, value: &T) -> DequeResult<bool> {
        Ok(self.iter()?.any(|element| *element == *value))
    }

    /// Returns the index of the first element equal to `value`.
    pub fn position(&self, value: &T) -> DequeResult<Option<usize>> {
        Ok(self.iter()?.position(|element| *element == *value))
    }

    /// Unlinks the first node of this snapshot holding `value`.
    pub fn remove(&self, value: &T) -> DequeResult<bool> {
        match self.find(|element| element == value)? {
            Some(entry) => self.deque.unlink(entry.node),
            None => Ok(false),
        }
    }

    /// Unlinks every node of this snapshot holding one of `values`.
    pub fn remove_all(&self, values: &[T]) -> DequeResult<usize> {
        self.remove_if(|element| values.contains(element))
    }
}

impl<T: Clone> Snapshot<T> {
    /// Copies the elements into a vector.
    pub fn to_vec(&self) -> DequeResult<Vec<T>> {
        Ok(self.iter()?.map(|element| T::clone(&element)).collect())
    }
}

impl<T> Drop for Snapshot<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.view.id)
            .field("version", &self.view.version)
            .field("size", &self.view.size)
            .field("closed", &self.closed)
            .finish()
    }
}
