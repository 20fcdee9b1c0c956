//! The versioned deque.
//!
//! All structural changes and snapshot creation take one exclusive lock;
//! peeks take it shared. Exclusive guards are released fairly so that a
//! writer queued behind a stream of readers gets its turn in order.
//!
//! # Batches
//!
//! [`VersionedDeque::compute`] keeps the exclusive lock for the whole
//! closure. The guard is parked in [`Shared`] together with the token of
//! the thread that took it, and any deque call that thread makes before
//! the closure returns (through the [`DequeTxn`], through another handle,
//! or by dropping a snapshot) runs on the parked guard instead of locking
//! again.
//!
//! # Event delivery
//!
//! Lifecycle events are buffered while the lock is held and queued in
//! lock order before it is released. One thread at a time drains the queue
//! and hands the events to the observers, so observers see the events of
//! concurrent writers in the order the writers held the lock.

mod state;
mod txn;

pub use txn::DequeTxn;

pub(crate) use state::DequeState;

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::{ArcRwLockWriteGuard, Mutex, RawRwLock, RwLock, RwLockWriteGuard};
use serde::Serialize;
use strand_common::config::DequeConfig;
use strand_common::error::{DequeError, DequeResult};
use strand_common::types::{NodeHandle, ObserverId, SnapshotId, Version};

use crate::gc::GcResult;
use crate::marker::VersionMarker;
use crate::node::NodeInfo;
use crate::observer::{self, DequeObserver, LifecycleEvent, LinkMode, ObserverSet};
use crate::snapshot::Snapshot;

/// Identifies the calling thread. Never zero.
fn thread_token() -> u64 {
    static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TOKEN: u64 = NEXT_TOKEN.fetch_add(1, AtomicOrdering::Relaxed);
    }
    TOKEN.with(|token| *token)
}

/// State shared between a deque handle and its snapshots.
pub(crate) struct Shared<T> {
    name: String,
    state: Arc<RwLock<DequeState<T>>>,
    /// Exclusive guard held by a running batch.
    batch: Mutex<Option<ArcRwLockWriteGuard<RawRwLock, DequeState<T>>>>,
    /// Token of the thread running the batch, 0 if none.
    batch_owner: AtomicU64,
    /// Event batches in lock order, waiting for delivery.
    outbox: Mutex<VecDeque<Vec<LifecycleEvent<T>>>>,
    delivering: AtomicBool,
    observers: RwLock<ObserverSet<T>>,
    disposed: AtomicBool,
}

impl<T> Shared<T> {
    fn new(config: DequeConfig) -> Self {
        Self {
            name: config.name.clone(),
            state: Arc::new(RwLock::new(DequeState::new(config))),
            batch: Mutex::new(None),
            batch_owner: AtomicU64::new(0),
            outbox: Mutex::new(VecDeque::new()),
            delivering: AtomicBool::new(false),
            observers: RwLock::new(ObserverSet::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(AtomicOrdering::Acquire)
    }

    fn in_batch(&self) -> bool {
        self.batch_owner.load(AtomicOrdering::Acquire) == thread_token()
    }

    /// Runs `op` on the exclusively locked state.
    ///
    /// On the thread running a batch, `op` runs on the batch guard and its
    /// events wait for the end of the batch. Anywhere else the lock is taken
    /// for `op` alone.
    fn exclusive<R>(&self, op: impl FnOnce(&mut DequeState<T>) -> R) -> R {
        if self.in_batch() {
            let mut batch = self.batch.lock();
            if let Some(guard) = batch.as_mut() {
                return op(&mut **guard);
            }
        }
        let mut state = self.state.write();
        let result = op(&mut state);
        self.post(&mut state);
        RwLockWriteGuard::unlock_fair(state);
        self.deliver();
        result
    }

    /// Runs `op` on the state under the shared lock, or on the batch guard
    /// when called from inside a batch.
    fn inspect<R>(&self, op: impl FnOnce(&DequeState<T>) -> R) -> R {
        if self.in_batch() {
            let batch = self.batch.lock();
            if let Some(guard) = batch.as_ref() {
                return op(&**guard);
            }
        }
        op(&self.state.read())
    }

    /// Runs a mutation and reclaims whatever the last snapshot close left.
    fn write<R, F>(&self, op: F) -> DequeResult<R>
    where
        F: FnOnce(&mut DequeState<T>) -> DequeResult<R>,
    {
        self.exclusive(|state| {
            if state.is_disposed() {
                return Err(DequeError::Disposed);
            }
            state.reclaim_pending();
            op(state)
        })
    }

    fn read<R, F>(&self, op: F) -> Option<R>
    where
        F: FnOnce(&DequeState<T>) -> R,
    {
        self.inspect(|state| (!state.is_disposed()).then(|| op(state)))
    }

    /// Runs `f` with the exclusive lock held across every deque call the
    /// current thread makes before `f` returns. Nested batches join the
    /// outer one.
    fn run_batch<R, F>(&self, f: F) -> DequeResult<R>
    where
        F: FnOnce() -> DequeResult<R>,
    {
        if self.in_batch() {
            return f();
        }
        let mut guard = self.state.write_arc();
        if guard.is_disposed() {
            return Err(DequeError::Disposed);
        }
        guard.reclaim_pending();
        *self.batch.lock() = Some(guard);
        self.batch_owner
            .store(thread_token(), AtomicOrdering::Release);

        let scope = BatchScope { shared: self };
        let result = f();
        drop(scope);
        self.deliver();
        result
    }

    /// Queues the buffered events. Must run before the lock is released.
    fn post(&self, state: &mut DequeState<T>) {
        let events = state.take_events();
        if !events.is_empty() {
            self.outbox.lock().push_back(events);
        }
    }

    /// Drains the outbox unless another thread is already draining it.
    fn deliver(&self) {
        loop {
            if self
                .delivering
                .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
                .is_err()
            {
                return;
            }
            loop {
                // Pop in its own statement so the outbox is not locked while
                // observers run.
                let next = self.outbox.lock().pop_front();
                let Some(events) = next else {
                    break;
                };
                let observers = self.observers.read().to_vec();
                observer::dispatch(&self.name, &observers, events);
            }
            self.delivering.store(false, AtomicOrdering::Release);
            if self.outbox.lock().is_empty() {
                return;
            }
        }
    }

    pub(crate) fn unlink(&self, node: NodeHandle) -> DequeResult<bool> {
        self.write(|state| state.unlink(node))
    }

    pub(crate) fn unlink_many(&self, nodes: &[NodeHandle]) -> DequeResult<usize> {
        self.write(|state| {
            let mut unlinked = 0;
            for node in nodes {
                if state.unlink(*node)? {
                    unlinked += 1;
                }
            }
            Ok(unlinked)
        })
    }

    pub(crate) fn close_snapshot(&self, snapshot: SnapshotId, version: Version) -> GcResult {
        let result = self.write(|state| Ok(state.close_snapshot(snapshot, version)));
        result.unwrap_or_default()
    }
}

/// Ends a batch, also when the batch closure unwinds.
struct BatchScope<'a, T> {
    shared: &'a Shared<T>,
}

impl<T> Drop for BatchScope<'_, T> {
    fn drop(&mut self) {
        self.shared.batch_owner.store(0, AtomicOrdering::Release);
        let guard = self.shared.batch.lock().take();
        if let Some(mut guard) = guard {
            self.shared.post(&mut guard);
            ArcRwLockWriteGuard::unlock_fair(guard);
        }
    }
}

/// Point-in-time statistics of a deque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DequeStats {
    /// Deque name.
    pub name: String,
    /// Linked elements.
    pub len: usize,
    /// Configured capacity, `None` if unbounded.
    pub capacity: Option<usize>,
    /// Current modification version.
    pub modification_version: Version,
    /// Version shared by snapshots opened since the last mutation.
    pub baseline: Option<Version>,
    /// Versions pinned by open snapshots, oldest first.
    pub pinned_versions: Vec<Version>,
    /// Open snapshots.
    pub open_snapshots: usize,
    /// Links waiting in the obsolete set.
    pub obsolete_links: usize,
    /// Nodes held by the arena, linked or awaiting disposal.
    pub arena_nodes: usize,
    /// Reclamation passes that released something.
    pub gc_runs: u64,
    /// Links released so far.
    pub links_reclaimed: u64,
    /// Nodes disposed so far.
    pub nodes_disposed: u64,
    /// Registered observers.
    pub observers: usize,
}

/// A concurrent double-ended queue with copy-on-write snapshots.
///
/// Cloning the handle is cheap and yields another handle to the same deque.
///
/// # Example
///
/// ```rust
/// use strand_deque::VersionedDeque;
///
/// let deque = VersionedDeque::new();
/// let b = deque.append("b").unwrap();
/// deque.prepend("a").unwrap();
///
/// let snapshot = deque.create_snapshot().unwrap();
/// deque.unlink(b).unwrap();
///
/// assert_eq!(snapshot.len().unwrap(), 2);
/// assert_eq!(deque.len(), 1);
/// ```
pub struct VersionedDeque<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for VersionedDeque<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for VersionedDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VersionedDeque<T> {
    /// Creates an unbounded deque with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(DequeConfig::default())
    }

    /// Creates a deque from `config`.
    pub fn with_config(config: DequeConfig) -> DequeResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: DequeConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
        }
    }

    /// Returns the deque name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the configured capacity, `None` if unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.shared.inspect(|state| state.config.capacity)
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Links `element` at the back and returns its node.
    pub fn append(&self, element: T) -> DequeResult<NodeHandle> {
        self.shared.write(|state| state.link(element, LinkMode::Last))
    }

    /// Links `element` at the front and returns its node.
    pub fn prepend(&self, element: T) -> DequeResult<NodeHandle> {
        self.shared.write(|state| state.link(element, LinkMode::First))
    }

    /// Same as [`append`](Self::append).
    pub fn push_back(&self, element: T) -> DequeResult<NodeHandle> {
        self.append(element)
    }

    /// Same as [`prepend`](Self::prepend).
    pub fn push_front(&self, element: T) -> DequeResult<NodeHandle> {
        self.prepend(element)
    }

    /// Links `element` at the back; returns `false` if the deque is full.
    pub fn offer_last(&self, element: T) -> DequeResult<bool> {
        Self::offered(self.append(element))
    }

    /// Links `element` at the front; returns `false` if the deque is full.
    pub fn offer_first(&self, element: T) -> DequeResult<bool> {
        Self::offered(self.prepend(element))
    }

    fn offered(result: DequeResult<NodeHandle>) -> DequeResult<bool> {
        match result {
            Ok(_) => Ok(true),
            Err(DequeError::CapacityExceeded { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Links every element at the back, in order, under one lock
    /// acquisition. Nothing is linked if the batch does not fit.
    pub fn link_all<I>(&self, elements: I) -> DequeResult<Vec<NodeHandle>>
    where
        I: IntoIterator<Item = T>,
    {
        let elements: Vec<T> = elements.into_iter().collect();
        self.shared
            .write(|state| state.link_all(elements, LinkMode::Last))
    }

    /// Links every element at the front so that they end up in input order
    /// ahead of the existing elements.
    pub fn link_all_first<I>(&self, elements: I) -> DequeResult<Vec<NodeHandle>>
    where
        I: IntoIterator<Item = T>,
    {
        let elements: Vec<T> = elements.into_iter().collect();
        self.shared
            .write(|state| state.link_all(elements, LinkMode::First))
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Unlinks `node`. Returns `false` if it was already unlinked.
    pub fn unlink(&self, node: NodeHandle) -> DequeResult<bool> {
        self.shared.unlink(node)
    }

    /// Unlinks and returns the first element.
    pub fn poll_first(&self) -> DequeResult<Option<Arc<T>>> {
        self.shared.write(|state| state.poll(LinkMode::First))
    }

    /// Unlinks and returns the last element.
    pub fn poll_last(&self) -> DequeResult<Option<Arc<T>>> {
        self.shared.write(|state| state.poll(LinkMode::Last))
    }

    /// Unlinks and returns the first element, failing if the deque is empty.
    pub fn remove_first(&self) -> DequeResult<Arc<T>> {
        self.poll_first()?.ok_or(DequeError::Empty)
    }

    /// Unlinks and returns the last element, failing if the deque is empty.
    pub fn remove_last(&self) -> DequeResult<Arc<T>> {
        self.poll_last()?.ok_or(DequeError::Empty)
    }

    /// Unlinks every element. Returns how many were linked.
    pub fn clear(&self) -> DequeResult<usize> {
        self.shared.write(DequeState::clear)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Returns the number of linked elements.
    pub fn len(&self) -> usize {
        self.shared.read(DequeState::len).unwrap_or(0)
    }

    /// Checks if the deque is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many more elements fit before the capacity is reached.
    pub fn remaining_capacity(&self) -> usize {
        self.shared
            .read(DequeState::remaining_capacity)
            .unwrap_or(0)
    }

    /// Returns the first element without unlinking it.
    pub fn peek_first(&self) -> Option<Arc<T>> {
        self.shared
            .read(|state| state.peek(LinkMode::First))
            .flatten()
    }

    /// Returns the last element without unlinking it.
    pub fn peek_last(&self) -> Option<Arc<T>> {
        self.shared
            .read(|state| state.peek(LinkMode::Last))
            .flatten()
    }

    /// Returns the first element, failing if the deque is empty.
    pub fn get_first(&self) -> DequeResult<Arc<T>> {
        self.peek_first().ok_or(DequeError::Empty)
    }

    /// Returns the last element, failing if the deque is empty.
    pub fn get_last(&self) -> DequeResult<Arc<T>> {
        self.peek_last().ok_or(DequeError::Empty)
    }

    /// Checks if `node` is part of the live deque.
    pub fn is_linked(&self, node: NodeHandle) -> bool {
        self.shared
            .read(|state| state.is_linked(node))
            .unwrap_or(false)
    }

    /// Returns the element of `node`, as long as the node is not disposed.
    pub fn element(&self, node: NodeHandle) -> Option<Arc<T>> {
        self.shared.read(|state| state.element(node)).flatten()
    }

    /// Describes `node`, as long as it is not disposed.
    pub fn node_info(&self, node: NodeHandle) -> Option<NodeInfo> {
        self.shared.read(|state| state.node_info(node)).flatten()
    }

    /// Returns point-in-time statistics.
    pub fn stats(&self) -> DequeStats {
        self.shared.inspect(|state| DequeStats {
            name: self.shared.name.clone(),
            len: state.len(),
            capacity: state.config.capacity,
            modification_version: state.timeline.current(),
            baseline: state.timeline.baseline(),
            pinned_versions: state.timeline.pinned_versions(),
            open_snapshots: state.snapshot_count(),
            obsolete_links: state.obsolete.len(),
            arena_nodes: state.nodes.len(),
            gc_runs: state.gc_stats.total_runs(),
            links_reclaimed: state.gc_stats.total_links_reclaimed(),
            nodes_disposed: state.gc_stats.total_nodes_disposed(),
            observers: self.shared.observers.read().len(),
        })
    }

    /// Returns the pinned version markers, oldest first.
    pub fn markers(&self) -> Vec<VersionMarker> {
        self.shared
            .inspect(|state| state.timeline.markers().cloned().collect())
    }

    // =========================================================================
    // Batches and snapshots
    // =========================================================================

    /// Runs `f` with exclusive access to the deque.
    ///
    /// Everything `f` does happens atomically with respect to other threads:
    /// the operations of the [`DequeTxn`], calls through any handle of this
    /// deque, snapshots opened or dropped, and nested `compute` calls all
    /// run under the lock taken here. Observers hear about the changes once
    /// `f` has returned.
    pub fn compute<R, F>(&self, f: F) -> DequeResult<R>
    where
        F: FnOnce(&mut DequeTxn<'_, T>) -> DequeResult<R>,
    {
        self.shared.run_batch(|| f(&mut DequeTxn::new(&self.shared)))
    }

    /// Opens a snapshot of the current contents.
    pub fn create_snapshot(&self) -> DequeResult<Snapshot<T>> {
        let view = self.shared.write(DequeState::open_snapshot)?;
        Ok(Snapshot::new(Arc::clone(&self.shared), view))
    }

    /// Opens a snapshot and atomically unlinks up to `max_elements` elements
    /// from the front. The snapshot contains exactly the unlinked elements.
    /// `None` drains the whole deque.
    pub fn create_snapshot_poll(&self, max_elements: Option<usize>) -> DequeResult<Snapshot<T>> {
        let view = self
            .shared
            .write(|state| state.open_snapshot_poll(max_elements))?;
        Ok(Snapshot::new(Arc::clone(&self.shared), view))
    }

    /// Runs a reclamation pass bounded by the configured batch size.
    pub fn reclaim(&self) -> DequeResult<GcResult> {
        self.shared.write(|state| {
            let batch = state.config.reclaim_batch;
            Ok(state.reclaim(batch))
        })
    }

    // =========================================================================
    // Observers and disposal
    // =========================================================================

    /// Registers a lifecycle observer.
    pub fn register_observer(&self, observer: Arc<dyn DequeObserver<T>>) -> ObserverId {
        let id = self.shared.observers.write().register(observer);
        self.refresh_observed();
        id
    }

    /// Unregisters an observer. Returns `false` if it was not registered.
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        let removed = self.shared.observers.write().unregister(id);
        self.refresh_observed();
        removed
    }

    fn refresh_observed(&self) {
        self.shared.exclusive(|state| {
            state.emit_events = !self.shared.observers.read().is_empty();
        });
    }

    /// Releases every node and link. Open snapshots fail with
    /// [`DequeError::Disposed`] afterwards, as does every mutation.
    pub fn dispose(&self) -> DequeResult<()> {
        self.shared.exclusive(|state| {
            if state.is_disposed() {
                return Err(DequeError::Disposed);
            }
            self.shared.disposed.store(true, AtomicOrdering::Release);
            state.dispose();
            Ok(())
        })
    }

    /// Checks if the deque was disposed.
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }
}

impl<T: PartialEq> VersionedDeque<T> {
    /// Checks if the live deque contains `value`.
    pub fn contains(&self, value: &T) -> bool {
        self.shared
            .read(|state| {
                state.live_links().is_ok_and(|links| {
                    links
                        .iter()
                        .any(|link| link.element().is_some_and(|e| *e == *value))
                })
            })
            .unwrap_or(false)
    }
}

impl<T> fmt::Debug for VersionedDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedDeque")
            .field("name", &self.shared.name)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;

    #[test]
    fn test_basic_operations() {
        let deque = VersionedDeque::new();
        assert!(deque.is_empty());
        deque.push_back(2).unwrap();
        deque.push_front(1).unwrap();
        deque.append(3).unwrap();

        assert_eq!(deque.len(), 3);
        assert_eq!(*deque.get_first().unwrap(), 1);
        assert_eq!(*deque.get_last().unwrap(), 3);
        assert!(deque.contains(&2));
        assert!(!deque.contains(&4));

        assert_eq!(*deque.remove_first().unwrap(), 1);
        assert_eq!(*deque.remove_last().unwrap(), 3);
        assert_eq!(deque.poll_last().unwrap().as_deref(), Some(&2));
        assert!(deque.poll_first().unwrap().is_none());
        assert_eq!(deque.remove_first().unwrap_err(), DequeError::Empty);
        assert_eq!(deque.get_last().unwrap_err(), DequeError::Empty);
    }

    #[test]
    fn test_capacity_and_offer() {
        let deque = VersionedDeque::with_config(DequeConfig::bounded(2)).unwrap();
        assert_eq!(deque.capacity(), Some(2));
        assert!(deque.offer_last(1).unwrap());
        assert!(deque.offer_first(0).unwrap());
        assert!(!deque.offer_last(2).unwrap());
        assert_eq!(
            deque.append(2).unwrap_err(),
            DequeError::CapacityExceeded { capacity: 2 }
        );
        assert_eq!(deque.remaining_capacity(), 0);

        deque.poll_first().unwrap();
        assert_eq!(deque.remaining_capacity(), 1);
        assert!(deque.offer_last(2).unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = VersionedDeque::<u8>::with_config(DequeConfig::bounded(0)).unwrap_err();
        assert!(matches!(err, DequeError::InvalidConfig { .. }));
    }

    #[test]
    fn test_link_all_first_preserves_order() {
        let deque = VersionedDeque::new();
        deque.append(9).unwrap();
        deque.link_all_first([1, 2, 3]).unwrap();
        let snapshot = deque.create_snapshot().unwrap();
        assert_eq!(snapshot.to_vec().unwrap(), vec![1, 2, 3, 9]);
    }

    #[test]
    fn test_unlink_sentinel() {
        let deque: VersionedDeque<u8> = VersionedDeque::new();
        assert_eq!(
            deque.unlink(NodeHandle::END).unwrap_err(),
            DequeError::NodeNotPayload {
                node: NodeHandle::END
            }
        );
    }

    #[test]
    fn test_node_info_and_stale_handles() {
        let deque =
            VersionedDeque::with_config(DequeConfig::default().with_node_metadata(true)).unwrap();
        let a = deque.append("a").unwrap();
        let info = deque.node_info(a).unwrap();
        assert!(info.linked);
        assert!(info.meta.is_some());
        assert_eq!(*deque.element(a).unwrap(), "a");

        deque.unlink(a).unwrap();
        // No snapshot open: the node is disposed right away.
        assert!(deque.node_info(a).is_none());
        assert!(!deque.is_linked(a));
        assert!(!deque.unlink(a).unwrap());

        let b = deque.append("b").unwrap();
        assert_eq!(b.index(), a.index());
        assert!(!deque.is_linked(a));
        assert!(deque.is_linked(b));
    }

    #[test]
    fn test_abcd_scenario() {
        let deque = VersionedDeque::new();
        deque.append("A").unwrap();
        let b = deque.append("B").unwrap();
        deque.append("C").unwrap();

        let mut s1 = deque.create_snapshot().unwrap();
        assert_eq!(s1.to_vec().unwrap(), vec!["A", "B", "C"]);

        deque.unlink(b).unwrap();
        assert_eq!(deque.create_snapshot().unwrap().to_vec().unwrap(), vec!["A", "C"]);
        assert_eq!(s1.to_vec().unwrap(), vec!["A", "B", "C"]);

        let mut s2 = deque.create_snapshot().unwrap();
        assert_eq!(s2.to_vec().unwrap(), vec!["A", "C"]);

        deque.append("D").unwrap();
        assert_eq!(*deque.peek_last().unwrap(), "D");
        assert_eq!(deque.len(), 3);
        assert_eq!(s2.to_vec().unwrap(), vec!["A", "C"]);

        s1.close();
        s2.close();
        assert!(deque.node_info(b).is_none());

        let s3 = deque.create_snapshot().unwrap();
        assert_eq!(s3.to_vec().unwrap(), vec!["A", "C", "D"]);

        let stats = deque.stats();
        assert_eq!(stats.obsolete_links, 0);
        assert_eq!(stats.arena_nodes, 3);
        assert_eq!(stats.pinned_versions, vec![s3.version()]);
    }

    #[test]
    fn test_shared_marker() {
        let deque = VersionedDeque::new();
        deque.append(1).unwrap();
        let s1 = deque.create_snapshot().unwrap();
        let s2 = deque.create_snapshot().unwrap();
        assert_eq!(s1.version(), s2.version());
        assert_ne!(s1.id(), s2.id());

        let stats = deque.stats();
        assert_eq!(stats.pinned_versions, vec![s1.version()]);
        assert_eq!(stats.baseline, Some(s1.version()));
        assert_eq!(stats.open_snapshots, 2);

        let markers = deque.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].version(), s1.version());
        assert!(markers[0].contains(s2.id()));

        deque.append(2).unwrap();
        let s3 = deque.create_snapshot().unwrap();
        assert!(s3.version() > s1.version());
    }

    #[test]
    fn test_poll_snapshot() {
        let deque = VersionedDeque::new();
        deque.link_all(1..=5).unwrap();

        let partial = deque.create_snapshot_poll(Some(2)).unwrap();
        assert_eq!(partial.to_vec().unwrap(), vec![1, 2]);
        assert_eq!(partial.iter().unwrap().rev().map(|e| *e).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(deque.len(), 3);

        let rest = deque.create_snapshot_poll(None).unwrap();
        assert_eq!(rest.to_vec().unwrap(), vec![3, 4, 5]);
        assert!(deque.is_empty());

        let none = deque.create_snapshot_poll(None).unwrap();
        assert!(none.is_empty().unwrap());
        let zero = deque.create_snapshot_poll(Some(0)).unwrap();
        assert_eq!(zero.len().unwrap(), 0);
    }

    #[test]
    fn test_clear() {
        let deque = VersionedDeque::new();
        deque.link_all(0..4).unwrap();
        let snapshot = deque.create_snapshot().unwrap();
        assert_eq!(deque.clear().unwrap(), 4);
        assert!(deque.is_empty());
        assert_eq!(snapshot.len().unwrap(), 4);
        assert_eq!(deque.clear().unwrap(), 0);
    }

    #[test]
    fn test_dispose() {
        let deque = VersionedDeque::new();
        deque.append(1).unwrap();
        let snapshot = deque.create_snapshot().unwrap();
        deque.dispose().unwrap();

        assert!(deque.is_disposed());
        assert_eq!(deque.append(2).unwrap_err(), DequeError::Disposed);
        assert_eq!(deque.dispose().unwrap_err(), DequeError::Disposed);
        assert!(deque.create_snapshot().is_err());
        assert_eq!(snapshot.len().unwrap_err(), DequeError::Disposed);
        assert!(deque.is_empty());
        assert!(deque.peek_first().is_none());
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl DequeObserver<&'static str> for Events {
        fn on_link(&self, _: NodeHandle, mode: LinkMode, _: Version) -> observer::ObserverResult {
            self.0.lock().push(format!("link {mode}"));
            Ok(())
        }

        fn on_unlink(&self, _: NodeHandle, _: Version) -> observer::ObserverResult {
            self.0.lock().push("unlink".to_string());
            Ok(())
        }

        fn on_dispose_node(&self, deque: &str, element: &&'static str) -> observer::ObserverResult {
            self.0.lock().push(format!("dispose {deque} {element}"));
            Ok(())
        }
    }

    #[test]
    fn test_observer_events() {
        let deque = VersionedDeque::with_config(DequeConfig::default().with_name("jobs")).unwrap();
        let events = Arc::new(Events::default());
        let id = deque.register_observer(events.clone());
        assert_eq!(deque.stats().observers, 1);

        let x = deque.append("x").unwrap();
        deque.prepend("w").unwrap();
        let snapshot = deque.create_snapshot().unwrap();
        deque.unlink(x).unwrap();
        assert_eq!(
            *events.0.lock(),
            vec!["link last", "link first", "unlink"]
        );

        drop(snapshot);
        assert_eq!(events.0.lock().last().unwrap(), "dispose jobs x");

        assert!(deque.unregister_observer(id));
        deque.append("y").unwrap();
        assert_eq!(events.0.lock().len(), 4);
    }

    #[test]
    fn test_handles_are_shared_across_threads() {
        let deque = VersionedDeque::new();
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let deque = deque.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        deque.append(t * 100 + i).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(deque.len(), 400);
        let snapshot = deque.create_snapshot().unwrap();
        assert_eq!(snapshot.iter().unwrap().count(), 400);
    }
}
