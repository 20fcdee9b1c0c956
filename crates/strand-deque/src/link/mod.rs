//! Link versions: the edges of the deque, versioned for snapshot isolation.
//!
//! Every node of the deque reaches its neighbors through a [`LinkVersion`].
//! A link records the neighbors of one node as of one modification version.
//! When a link that an open snapshot can still observe has to change, the
//! writer forks it instead: the fork becomes the node's current link and the
//! old one stays reachable for the snapshot through the version chain.
//!
//! # Version Chain Structure
//!
//! ```text
//!   node N
//!   ┌──────────────────────────────┐
//!   │ head ─────────────┐          │
//!   └───────────────────┼──────────┘
//!                       ▼
//!          ┌──────────────────────┐
//!          │ link v7 (current)    │
//!          │ obsolete_on: -       │
//!          └──────────────────────┘
//!              older │    ▲ newer
//!                    ▼    │
//!          ┌──────────────────────┐
//!          │ link v3              │
//!          │ obsolete_on: v7      │  ← still pinned by a snapshot at v5
//!          └──────────────────────┘
//! ```
//!
//! Readers resolve a link for their version by walking `older` while the link
//! was created after their version, then `newer` while the successor was
//! created at or before it.
//!
//! # Mutability
//!
//! `created_on` and the owning node never change. `newer` and `obsolete_on`
//! are written at most once. Neighbor pointers, the cached element and the
//! `older` pointer are atomically swappable, so snapshot readers load them
//! without taking any lock. Only the writer holding the deque's exclusive
//! lock stores into them, and only on links that no open snapshot can
//! resolve to, or when the link is reclaimed.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use strand_common::error::{DequeError, DequeResult};
use strand_common::types::{NodeHandle, Version};

/// What a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Link of the begin sentinel.
    Begin,
    /// Link of the end sentinel.
    End,
    /// Link of a payload node.
    Payload,
}

impl LinkKind {
    /// Derives the kind from the owning node handle.
    #[must_use]
    pub const fn of(owner: NodeHandle) -> Self {
        match owner.index() {
            0 => Self::Begin,
            1 => Self::End,
            _ => Self::Payload,
        }
    }

    /// Checks if this is a sentinel link.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        !matches!(self, Self::Payload)
    }
}

/// One version of a node's position in the deque.
pub struct LinkVersion<T> {
    /// Node this link belongs to.
    owner: NodeHandle,
    /// Modification version this link was created on.
    created_on: Version,
    /// Version at which the link stopped being live topology. 0 = still live.
    obsolete_on: AtomicU64,
    /// Superseding version, written once by a fork.
    newer: OnceLock<Arc<LinkVersion<T>>>,
    /// Linked element count. Only maintained on sentinel links.
    count: AtomicUsize,
    element: ArcSwapOption<T>,
    previous: ArcSwapOption<LinkVersion<T>>,
    next: ArcSwapOption<LinkVersion<T>>,
    older: ArcSwapOption<LinkVersion<T>>,
}

impl<T> LinkVersion<T> {
    /// Creates a sentinel link with no neighbors.
    pub(crate) fn sentinel(owner: NodeHandle, created_on: Version) -> Arc<Self> {
        debug_assert!(owner.is_sentinel());
        Arc::new(Self::build(owner, created_on, None, None, None, None, 0))
    }

    /// Creates the first link of a payload node.
    pub(crate) fn payload(
        owner: NodeHandle,
        created_on: Version,
        element: Arc<T>,
        previous: Arc<Self>,
        next: Arc<Self>,
    ) -> Arc<Self> {
        Arc::new(Self::build(
            owner,
            created_on,
            Some(element),
            Some(previous),
            Some(next),
            None,
            0,
        ))
    }

    fn build(
        owner: NodeHandle,
        created_on: Version,
        element: Option<Arc<T>>,
        previous: Option<Arc<Self>>,
        next: Option<Arc<Self>>,
        older: Option<Arc<Self>>,
        count: usize,
    ) -> Self {
        Self {
            owner,
            created_on,
            obsolete_on: AtomicU64::new(0),
            newer: OnceLock::new(),
            count: AtomicUsize::new(count),
            element: ArcSwapOption::new(element),
            previous: ArcSwapOption::new(previous),
            next: ArcSwapOption::new(next),
            older: ArcSwapOption::new(older),
        }
    }

    /// Returns the owning node.
    #[inline]
    pub fn owner(&self) -> NodeHandle {
        self.owner
    }

    /// Returns the link kind.
    #[inline]
    pub fn kind(&self) -> LinkKind {
        LinkKind::of(self.owner)
    }

    /// Checks if this link belongs to a sentinel.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.owner.is_sentinel()
    }

    /// Returns the version this link was created on.
    #[inline]
    pub fn created_on(&self) -> Version {
        self.created_on
    }

    /// Returns the version this link became obsolete on, if it has.
    pub fn obsolete_on(&self) -> Option<Version> {
        match self.obsolete_on.load(AtomicOrdering::Acquire) {
            0 => None,
            v => Some(Version::new(v)),
        }
    }

    /// Returns the cached element. `None` for sentinels and reclaimed links.
    pub fn element(&self) -> Option<Arc<T>> {
        self.element.load_full()
    }

    /// Returns the previous neighbor as recorded on this link.
    pub fn previous(&self) -> Option<Arc<Self>> {
        self.previous.load_full()
    }

    /// Returns the next neighbor as recorded on this link.
    pub fn next(&self) -> Option<Arc<Self>> {
        self.next.load_full()
    }

    /// Returns the version this link superseded.
    pub fn older(&self) -> Option<Arc<Self>> {
        self.older.load_full()
    }

    /// Returns the version that superseded this link.
    pub fn newer(&self) -> Option<Arc<Self>> {
        self.newer.get().cloned()
    }

    /// Returns the linked element count recorded on a sentinel link.
    #[inline]
    pub fn count(&self) -> usize {
        self.count.load(AtomicOrdering::Acquire)
    }

    pub(crate) fn set_previous(&self, previous: Arc<Self>) {
        self.previous.store(Some(previous));
    }

    pub(crate) fn set_next(&self, next: Arc<Self>) {
        self.next.store(Some(next));
    }

    pub(crate) fn add_count(&self, delta: usize) {
        self.count.fetch_add(delta, AtomicOrdering::AcqRel);
    }

    pub(crate) fn sub_count(&self, delta: usize) {
        self.count.fetch_sub(delta, AtomicOrdering::AcqRel);
    }

    pub(crate) fn reset_count(&self) {
        self.count.store(0, AtomicOrdering::Release);
    }

    /// Tags the link as obsolete from `version` on. The first tag wins.
    pub(crate) fn mark_obsolete(&self, version: Version) {
        let _ = self.obsolete_on.compare_exchange(
            0,
            version.as_u64(),
            AtomicOrdering::AcqRel,
            AtomicOrdering::Acquire,
        );
    }

    /// Returns a snapshot of this link's identity and version range.
    pub fn info(&self) -> LinkInfo {
        LinkInfo {
            node: self.owner,
            created_on: self.created_on,
            obsolete_on: self.obsolete_on(),
        }
    }

    /// Drops everything the link keeps alive except the `newer` forward
    /// pointer, which stale neighbor pointers may still follow.
    pub(crate) fn release(&self) {
        self.element.store(None);
        self.previous.store(None);
        self.next.store(None);
        self.older.store(None);
    }

    /// Detaches `older` if it still points at `link`.
    pub(crate) fn forget_older(&self, link: &Arc<Self>) {
        // Only the lock-holding writer stores, so load then store is enough.
        if self
            .older
            .load_full()
            .is_some_and(|older| Arc::ptr_eq(&older, link))
        {
            self.older.store(None);
        }
    }
}

impl<T> LinkVersion<T> {
    /// Copy-on-write: creates the successor of `self` stamped with `version`.
    ///
    /// The successor inherits neighbors, element and count. `self` is tagged
    /// obsolete on `version` and forwards to the successor through `newer`.
    pub(crate) fn fork(self: &Arc<Self>, version: Version) -> DequeResult<Arc<Self>> {
        if version <= self.created_on {
            return Err(DequeError::internal(format!(
                "fork of {} at {} does not advance past {}",
                self.owner, version, self.created_on
            )));
        }

        let forked = Arc::new(Self::build(
            self.owner,
            version,
            self.element(),
            self.previous(),
            self.next(),
            Some(Arc::clone(self)),
            self.count(),
        ));

        if self.newer.set(Arc::clone(&forked)).is_err() {
            return Err(DequeError::internal(format!(
                "link of {} created on {} was forked twice",
                self.owner, self.created_on
            )));
        }
        self.mark_obsolete(version);
        Ok(forked)
    }

    /// Finds the version of this link's node that was live at `version`.
    ///
    /// Returns `None` if the chain was cut, which only happens when a link
    /// was reclaimed while a snapshot could still reach it.
    pub fn resolve(self: &Arc<Self>, version: Version) -> Option<Arc<Self>> {
        let mut current = Arc::clone(self);
        while current.created_on > version {
            match current.older() {
                Some(older) => current = older,
                None => {
                    tracing::error!(
                        node = %current.owner,
                        created_on = %current.created_on,
                        %version,
                        "link version chain broken while resolving"
                    );
                    return None;
                }
            }
        }
        while let Some(newer) = current.newer() {
            if newer.created_on > version {
                break;
            }
            current = newer;
        }
        Some(current)
    }
}

impl<T> fmt::Debug for LinkVersion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkVersion")
            .field("owner", &self.owner)
            .field("created_on", &self.created_on)
            .field("obsolete_on", &self.obsolete_on())
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

/// Identity and version range of one link, as exposed to snapshot readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    /// Node the link belongs to.
    pub node: NodeHandle,
    /// Version the link was created on.
    pub created_on: Version,
    /// Version the link was superseded or unlinked on.
    pub obsolete_on: Option<Version>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(i: u32) -> NodeHandle {
        NodeHandle::new(i, 0)
    }

    fn chain() -> (Arc<LinkVersion<u32>>, Arc<LinkVersion<u32>>) {
        let begin = LinkVersion::sentinel(NodeHandle::BEGIN, Version::new(1));
        let end = LinkVersion::sentinel(NodeHandle::END, Version::new(1));
        begin.set_next(Arc::clone(&end));
        end.set_previous(Arc::clone(&begin));
        (begin, end)
    }

    #[test]
    fn test_link_kind() {
        assert_eq!(LinkKind::of(NodeHandle::BEGIN), LinkKind::Begin);
        assert_eq!(LinkKind::of(NodeHandle::END), LinkKind::End);
        assert_eq!(LinkKind::of(node(2)), LinkKind::Payload);
        assert!(LinkKind::Begin.is_sentinel());
        assert!(!LinkKind::Payload.is_sentinel());
    }

    #[test]
    fn test_payload_link() {
        let (begin, end) = chain();
        let link = LinkVersion::payload(
            node(2),
            Version::new(1),
            Arc::new(10),
            Arc::clone(&begin),
            Arc::clone(&end),
        );
        assert_eq!(link.kind(), LinkKind::Payload);
        assert_eq!(link.element().as_deref(), Some(&10));
        assert_eq!(link.previous().unwrap().owner(), NodeHandle::BEGIN);
        assert_eq!(link.next().unwrap().owner(), NodeHandle::END);
        assert_eq!(link.obsolete_on(), None);
        assert!(link.newer().is_none());
    }

    #[test]
    fn test_fork_links_chain() {
        let (begin, end) = chain();
        begin.add_count(3);
        let forked = begin.fork(Version::new(4)).unwrap();

        assert_eq!(forked.created_on(), Version::new(4));
        assert_eq!(forked.count(), 3);
        assert!(Arc::ptr_eq(&forked.older().unwrap(), &begin));
        assert!(Arc::ptr_eq(&begin.newer().unwrap(), &forked));
        assert_eq!(begin.obsolete_on(), Some(Version::new(4)));
        assert!(Arc::ptr_eq(&forked.next().unwrap(), &end));
    }

    #[test]
    fn test_fork_twice_is_internal_error() {
        let (begin, _end) = chain();
        begin.fork(Version::new(2)).unwrap();
        let err = begin.fork(Version::new(3)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_fork_must_advance() {
        let (begin, _end) = chain();
        assert!(begin.fork(Version::new(1)).is_err());
    }

    #[test]
    fn test_resolve() {
        let (v1, _end) = chain();
        let v3 = v1.fork(Version::new(3)).unwrap();
        let v6 = v3.fork(Version::new(6)).unwrap();

        // From the oldest version forward.
        assert!(Arc::ptr_eq(&v1.resolve(Version::new(1)).unwrap(), &v1));
        assert!(Arc::ptr_eq(&v1.resolve(Version::new(4)).unwrap(), &v3));
        assert!(Arc::ptr_eq(&v1.resolve(Version::new(9)).unwrap(), &v6));

        // From the newest version backward.
        assert!(Arc::ptr_eq(&v6.resolve(Version::new(2)).unwrap(), &v1));
        assert!(Arc::ptr_eq(&v6.resolve(Version::new(5)).unwrap(), &v3));
        assert!(Arc::ptr_eq(&v6.resolve(Version::new(6)).unwrap(), &v6));
    }

    #[test]
    fn test_resolve_broken_chain() {
        let (v1, _end) = chain();
        let v3 = v1.fork(Version::new(3)).unwrap();
        v3.forget_older(&v1);
        assert!(v3.resolve(Version::new(1)).is_none());
    }

    #[test]
    fn test_release_keeps_newer() {
        let (begin, end) = chain();
        let link = LinkVersion::payload(node(2), Version::new(1), Arc::new(5), begin, end);
        let forked = link.fork(Version::new(2)).unwrap();
        link.release();

        assert!(link.element().is_none());
        assert!(link.next().is_none());
        assert!(Arc::ptr_eq(&link.newer().unwrap(), &forked));
        // A stale pointer to the released link still forwards.
        assert!(Arc::ptr_eq(&link.resolve(Version::new(2)).unwrap(), &forked));
    }

    #[test]
    fn test_readers_follow_neighbor_swaps() {
        use std::sync::atomic::AtomicBool;
        use std::thread;

        let (begin, end) = chain();
        let middle = LinkVersion::payload(
            node(2),
            Version::new(1),
            Arc::new(7),
            Arc::clone(&begin),
            Arc::clone(&end),
        );
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let begin = Arc::clone(&begin);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut seen_middle = 0usize;
                    while !done.load(AtomicOrdering::Acquire) {
                        let next = begin.next().unwrap();
                        match next.kind() {
                            LinkKind::End => {}
                            LinkKind::Payload => {
                                assert_eq!(next.element().as_deref(), Some(&7));
                                seen_middle += 1;
                            }
                            LinkKind::Begin => panic!("begin linked to itself"),
                        }
                    }
                    seen_middle
                })
            })
            .collect();

        for _ in 0..10_000 {
            begin.set_next(Arc::clone(&middle));
            begin.set_next(Arc::clone(&end));
        }
        done.store(true, AtomicOrdering::Release);
        for reader in readers {
            reader.join().unwrap();
        }
        assert!(Arc::ptr_eq(&begin.next().unwrap(), &end));
    }

    #[test]
    fn test_mark_obsolete_first_wins() {
        let (begin, _end) = chain();
        begin.mark_obsolete(Version::new(5));
        begin.mark_obsolete(Version::new(8));
        assert_eq!(begin.info().obsolete_on, Some(Version::new(5)));
    }
}
