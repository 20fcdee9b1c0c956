//! Lock-protected state of a versioned deque and the splice algorithms.
//!
//! Everything in here runs with the deque's exclusive lock held, except the
//! read-only accessors which only need the shared one.

use std::sync::Arc;

use strand_common::config::DequeConfig;
use strand_common::error::{DequeError, DequeResult};
use strand_common::types::{NodeHandle, SnapshotId, Version};

use crate::gc::{GcResult, GcStats, ObsoleteSet};
use crate::link::LinkVersion;
use crate::marker::Timeline;
use crate::node::{NodeArena, NodeInfo};
use crate::observer::{LifecycleEvent, LinkMode};
use crate::snapshot::SnapshotView;

type Link<T> = Arc<LinkVersion<T>>;

pub(crate) struct DequeState<T> {
    pub(crate) config: DequeConfig,
    capacity: usize,
    pub(crate) nodes: NodeArena<T>,
    pub(crate) timeline: Timeline,
    pub(crate) obsolete: ObsoleteSet<T>,
    /// Current link of the begin sentinel.
    begin: Link<T>,
    /// Current link of the end sentinel.
    end: Link<T>,
    pub(crate) gc_stats: GcStats,
    next_snapshot: u64,
    pub(crate) emit_events: bool,
    events: Vec<LifecycleEvent<T>>,
    disposed: bool,
}

impl<T> DequeState<T> {
    pub(crate) fn new(config: DequeConfig) -> Self {
        let version = Version::INITIAL;
        let begin = LinkVersion::sentinel(NodeHandle::BEGIN, version);
        let end = LinkVersion::sentinel(NodeHandle::END, version);
        begin.set_next(Arc::clone(&end));
        end.set_previous(Arc::clone(&begin));

        Self {
            capacity: config.effective_capacity(),
            nodes: NodeArena::new(config.node_metadata),
            config,
            timeline: Timeline::new(),
            obsolete: ObsoleteSet::new(),
            begin,
            end,
            gc_stats: GcStats::new(),
            next_snapshot: 0,
            emit_events: false,
            events: Vec::new(),
            disposed: false,
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn take_events(&mut self) -> Vec<LifecycleEvent<T>> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: LifecycleEvent<T>) {
        if self.emit_events {
            self.events.push(event);
        }
    }

    // =========================================================================
    // Read-only accessors
    // =========================================================================

    pub(crate) fn len(&self) -> usize {
        self.begin.count()
    }

    pub(crate) fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    pub(crate) fn peek(&self, mode: LinkMode) -> Option<Arc<T>> {
        let link = match mode {
            LinkMode::First => self.next_of(&self.begin).ok()?,
            LinkMode::Last => self.previous_of(&self.end).ok()?,
        };
        if link.is_sentinel() {
            return None;
        }
        link.element()
    }

    pub(crate) fn is_linked(&self, node: NodeHandle) -> bool {
        self.nodes.get(node).is_some_and(|entry| entry.is_linked())
    }

    pub(crate) fn element(&self, node: NodeHandle) -> Option<Arc<T>> {
        self.nodes.get(node).map(|entry| Arc::clone(&entry.element))
    }

    pub(crate) fn node_info(&self, node: NodeHandle) -> Option<NodeInfo> {
        self.nodes.get(node).map(|entry| entry.info(node))
    }

    /// Current links of the live deque, front to back.
    pub(crate) fn live_links(&self) -> DequeResult<Vec<Link<T>>> {
        let len = self.len();
        let mut links = Vec::with_capacity(len);
        let mut cursor = self.next_of(&self.begin)?;
        while !cursor.is_sentinel() {
            if links.len() == len {
                return Err(self.corrupted("live deque is longer than its count"));
            }
            let next = self.next_of(&cursor)?;
            links.push(cursor);
            cursor = next;
        }
        Ok(links)
    }

    pub(crate) fn snapshot_count(&self) -> usize {
        self.timeline.snapshot_count()
    }

    // =========================================================================
    // Link helpers
    // =========================================================================

    /// Current link of `node`.
    fn head(&self, node: NodeHandle) -> DequeResult<Link<T>> {
        match node {
            NodeHandle::BEGIN => Ok(Arc::clone(&self.begin)),
            NodeHandle::END => Ok(Arc::clone(&self.end)),
            _ => self
                .nodes
                .head(node)
                .ok_or_else(|| self.corrupted(&format!("neighbor {node} is not linked"))),
        }
    }

    /// Installs `link` as the current link of its node.
    fn install(&mut self, link: Link<T>) -> DequeResult<()> {
        match link.owner() {
            NodeHandle::BEGIN => self.begin = link,
            NodeHandle::END => self.end = link,
            node => {
                let entry = self
                    .nodes
                    .get_mut(node)
                    .ok_or_else(|| DequeError::internal(format!("node {node} is not allocated")))?;
                entry.head = Some(link);
                entry.live_links += 1;
            }
        }
        Ok(())
    }

    /// Current link of the node following `link`.
    fn next_of(&self, link: &Link<T>) -> DequeResult<Link<T>> {
        let next = link
            .next()
            .ok_or_else(|| self.corrupted(&format!("link of {} has no next", link.owner())))?;
        self.head(next.owner())
    }

    /// Current link of the node preceding `link`.
    fn previous_of(&self, link: &Link<T>) -> DequeResult<Link<T>> {
        let previous = link
            .previous()
            .ok_or_else(|| self.corrupted(&format!("link of {} has no previous", link.owner())))?;
        self.head(previous.owner())
    }

    /// Returns a version of `link` that may be rewritten at `version`.
    ///
    /// A link some open snapshot can resolve to is forked; the fork becomes
    /// the node's current link and the original is retired.
    fn writable(&mut self, link: Link<T>, version: Version) -> DequeResult<Link<T>> {
        if link.created_on() >= version || !self.timeline.is_observed(link.created_on()) {
            return Ok(link);
        }
        let forked = link.fork(version)?;
        self.install(Arc::clone(&forked))?;
        self.obsolete.retire(link);
        Ok(forked)
    }

    fn add_len(&mut self, delta: usize, version: Version) -> DequeResult<()> {
        let begin = self.writable(Arc::clone(&self.begin), version)?;
        let end = self.writable(Arc::clone(&self.end), version)?;
        begin.add_count(delta);
        end.add_count(delta);
        Ok(())
    }

    fn sub_len(&mut self, delta: usize, version: Version) -> DequeResult<()> {
        let begin = self.writable(Arc::clone(&self.begin), version)?;
        let end = self.writable(Arc::clone(&self.end), version)?;
        begin.sub_count(delta);
        end.sub_count(delta);
        Ok(())
    }

    /// Verifies that `left` and `right` are current and adjacent.
    fn check_splice(&self, left: &Link<T>, right: &Link<T>) -> DequeResult<()> {
        let current = |link: &Link<T>| {
            self.head(link.owner())
                .is_ok_and(|head| Arc::ptr_eq(&head, link))
        };
        let forward = left.next().is_some_and(|n| n.owner() == right.owner());
        let backward = right.previous().is_some_and(|p| p.owner() == left.owner());
        if forward && backward && current(left) && current(right) {
            return Ok(());
        }
        Err(self.corrupted(&format!(
            "splice of {} and {} left the neighbors disagreeing",
            left.owner(),
            right.owner()
        )))
    }

    fn corrupted(&self, message: &str) -> DequeError {
        tracing::error!(deque = %self.config.name, reason = message, "deque invariant violated");
        DequeError::internal(message)
    }

    // =========================================================================
    // Linking
    // =========================================================================

    fn check_capacity(&self, additional: usize) -> DequeResult<()> {
        if self.len().saturating_add(additional) > self.capacity {
            return Err(DequeError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Links a new node holding `element` at one end of the deque.
    pub(crate) fn link(&mut self, element: T, mode: LinkMode) -> DequeResult<NodeHandle> {
        self.check_capacity(1)?;
        let version = self.timeline.modification_version();
        self.splice_new(Arc::new(element), mode, version)
    }

    /// Links every element of `elements`, keeping their order.
    ///
    /// Capacity is checked for the whole batch before anything is linked.
    pub(crate) fn link_all(&mut self, elements: Vec<T>, mode: LinkMode) -> DequeResult<Vec<NodeHandle>> {
        self.check_capacity(elements.len())?;
        if elements.is_empty() {
            return Ok(Vec::new());
        }
        let version = self.timeline.modification_version();
        let mut handles = Vec::with_capacity(elements.len());
        match mode {
            LinkMode::Last => {
                for element in elements {
                    handles.push(self.splice_new(Arc::new(element), mode, version)?);
                }
            }
            LinkMode::First => {
                for element in elements.into_iter().rev() {
                    handles.push(self.splice_new(Arc::new(element), mode, version)?);
                }
                handles.reverse();
            }
        }
        Ok(handles)
    }

    fn splice_new(&mut self, element: Arc<T>, mode: LinkMode, version: Version) -> DequeResult<NodeHandle> {
        let (previous, next) = match mode {
            LinkMode::First => {
                let begin = Arc::clone(&self.begin);
                let next = self.next_of(&begin)?;
                (begin, next)
            }
            LinkMode::Last => {
                let end = Arc::clone(&self.end);
                let previous = self.previous_of(&end)?;
                (previous, end)
            }
        };
        let node = self.nodes.insert(Arc::clone(&element))?;
        let next = self.writable(next, version)?;
        let previous = self.writable(previous, version)?;

        let link = LinkVersion::payload(
            node,
            version,
            element,
            Arc::clone(&previous),
            Arc::clone(&next),
        );
        previous.set_next(Arc::clone(&link));
        next.set_previous(Arc::clone(&link));
        self.install(Arc::clone(&link))?;

        self.check_splice(&previous, &link)?;
        self.check_splice(&link, &next)?;
        self.add_len(1, version)?;
        self.emit(LifecycleEvent::Link {
            node,
            mode,
            version,
        });
        Ok(node)
    }

    // =========================================================================
    // Unlinking
    // =========================================================================

    /// Unlinks `node`. Returns `false` if it was already unlinked.
    pub(crate) fn unlink(&mut self, node: NodeHandle) -> DequeResult<bool> {
        if node.is_sentinel() {
            return Err(DequeError::NodeNotPayload { node });
        }
        let Some(link) = self.nodes.head(node) else {
            return Ok(false);
        };
        let version = self.timeline.modification_version();
        self.unlink_link(&link, version)?;
        Ok(true)
    }

    /// Unlinks the node at one end and returns its element.
    pub(crate) fn poll(&mut self, mode: LinkMode) -> DequeResult<Option<Arc<T>>> {
        let link = match mode {
            LinkMode::First => self.next_of(&self.begin)?,
            LinkMode::Last => self.previous_of(&self.end)?,
        };
        if link.is_sentinel() {
            return Ok(None);
        }
        let element = self.element(link.owner());
        let version = self.timeline.modification_version();
        self.unlink_link(&link, version)?;
        Ok(element)
    }

    fn unlink_link(&mut self, link: &Link<T>, version: Version) -> DequeResult<()> {
        let next = self.next_of(link)?;
        let previous = self.previous_of(link)?;
        let next = self.writable(next, version)?;
        let previous = self.writable(previous, version)?;

        previous.set_next(Arc::clone(&next));
        next.set_previous(Arc::clone(&previous));
        self.check_splice(&previous, &next)?;
        self.sub_len(1, version)?;
        self.detach(link.owner(), version)
    }

    /// Drops the head of an already spliced-out node.
    fn detach(&mut self, node: NodeHandle, version: Version) -> DequeResult<()> {
        let link = self
            .nodes
            .get_mut(node)
            .and_then(|entry| entry.head.take())
            .ok_or_else(|| self.corrupted(&format!("node {node} has no link to detach")))?;
        self.emit(LifecycleEvent::Unlink { node, version });

        if self.timeline.is_observed(link.created_on()) {
            link.mark_obsolete(version);
            self.obsolete.retire(link);
        } else {
            let mut result = GcResult::default();
            self.release(&link, &mut result);
            self.gc_stats.record_released(&result);
        }
        Ok(())
    }

    /// Unlinks every element at once by splicing the sentinels together.
    ///
    /// The splice only touches the two sentinel links. Each former node is
    /// still detached on its own: its head is cleared so that `is_linked`
    /// answers for it, its unlink event is raised, and its link is released
    /// or retired for the snapshots that can still reach it.
    pub(crate) fn unlink_everything(&mut self, version: Version) -> DequeResult<usize> {
        let nodes: Vec<NodeHandle> = self.live_links()?.iter().map(|l| l.owner()).collect();
        if nodes.is_empty() {
            return Ok(0);
        }
        let end = self.writable(Arc::clone(&self.end), version)?;
        let begin = self.writable(Arc::clone(&self.begin), version)?;
        begin.set_next(Arc::clone(&end));
        end.set_previous(Arc::clone(&begin));
        begin.reset_count();
        end.reset_count();
        self.check_splice(&begin, &end)?;

        for node in &nodes {
            self.detach(*node, version)?;
        }
        Ok(nodes.len())
    }

    pub(crate) fn clear(&mut self) -> DequeResult<usize> {
        let version = self.timeline.modification_version();
        self.unlink_everything(version)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub(crate) fn open_snapshot(&mut self) -> DequeResult<SnapshotView<T>> {
        self.next_snapshot += 1;
        let id = SnapshotId::new(self.next_snapshot);
        let version = self.timeline.pin(id);
        let first = self.next_of(&self.begin)?;
        let last = self.previous_of(&self.end)?;
        let size = self.len();
        tracing::debug!(deque = %self.config.name, snapshot = %id, %version, size, "snapshot opened");
        Ok(SnapshotView {
            id,
            version,
            first,
            last,
            size,
        })
    }

    /// Opens a snapshot and detaches up to `max_elements` elements from the
    /// front of the live deque. The snapshot shows only what was detached.
    pub(crate) fn open_snapshot_poll(&mut self, max_elements: Option<usize>) -> DequeResult<SnapshotView<T>> {
        let mut view = self.open_snapshot()?;
        let take = max_elements.map_or(view.size, |max| max.min(view.size));
        if take == 0 {
            view.size = 0;
            return Ok(view);
        }

        let version = self.timeline.modification_version();
        if take == view.size {
            self.unlink_everything(version)?;
            return Ok(view);
        }

        let mut last = None;
        for _ in 0..take {
            let link = self.next_of(&self.begin)?;
            // Resolve before unlinking: a head created after the pin may be
            // released as soon as it is detached.
            let pinned = link
                .resolve(view.version)
                .ok_or_else(|| self.corrupted("polled link is not visible to its snapshot"))?;
            last = Some(pinned);
            self.unlink_link(&link, version)?;
        }
        if let Some(last) = last {
            view.last = last;
        }
        view.size = take;
        Ok(view)
    }

    /// Releases `snapshot`'s pin and reclaims what it was the last to hold.
    pub(crate) fn close_snapshot(&mut self, snapshot: SnapshotId, version: Version) -> GcResult {
        let last_referent = self.timeline.unpin(version, snapshot);
        tracing::debug!(
            deque = %self.config.name,
            %snapshot,
            %version,
            last_referent,
            "snapshot closed"
        );
        if last_referent {
            self.reclaim(self.config.reclaim_batch)
        } else {
            GcResult {
                remaining: self.obsolete.len(),
                ..GcResult::default()
            }
        }
    }

    // =========================================================================
    // Reclamation
    // =========================================================================

    /// Drains obsolete links no open snapshot can reach, at most `budget`.
    pub(crate) fn reclaim(&mut self, budget: usize) -> GcResult {
        let mut result = GcResult::default();
        if self.obsolete.is_empty() {
            return result;
        }
        let min_pinned = self.timeline.min_pinned();
        while result.links_reclaimed < budget {
            let Some(link) = self.obsolete.pop_reclaimable(min_pinned) else {
                break;
            };
            self.release(&link, &mut result);
        }
        result.remaining = self.obsolete.len();
        self.gc_stats.record_run(&result);

        if result.did_work() {
            tracing::debug!(
                deque = %self.config.name,
                links = result.links_reclaimed,
                nodes = result.nodes_disposed,
                remaining = result.remaining,
                "reclaimed obsolete links"
            );
        }
        result
    }

    /// Runs a bounded pass if the front of the obsolete set is reclaimable.
    pub(crate) fn reclaim_pending(&mut self) {
        if self.obsolete.has_reclaimable(self.timeline.min_pinned()) {
            self.reclaim(self.config.reclaim_batch);
        }
    }

    /// Releases one link and disposes its node if that was its last link.
    fn release(&mut self, link: &Link<T>, result: &mut GcResult) {
        if let Some(newer) = link.newer() {
            newer.forget_older(link);
        }
        link.release();
        result.links_reclaimed += 1;

        let node = link.owner();
        let disposable = self.nodes.get_mut(node).is_some_and(|entry| {
            entry.live_links = entry.live_links.saturating_sub(1);
            entry.is_disposable()
        });
        if disposable {
            if let Some(entry) = self.nodes.remove(node) {
                result.nodes_disposed += 1;
                self.emit(LifecycleEvent::Dispose {
                    element: entry.element,
                });
            }
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Releases every link and node. Returns the number of nodes dropped.
    pub(crate) fn dispose(&mut self) -> usize {
        let disposed = self.teardown();
        tracing::debug!(deque = %self.config.name, nodes = disposed, "deque disposed");
        disposed
    }

    fn teardown(&mut self) -> usize {
        self.disposed = true;
        let mut disposed = 0;
        for link in self.obsolete.drain() {
            link.release();
        }
        for entry in self.nodes.drain() {
            if let Some(head) = entry.head {
                head.release();
            }
            disposed += 1;
            if self.emit_events {
                self.events.push(LifecycleEvent::Dispose {
                    element: entry.element,
                });
            }
        }
        self.begin.release();
        self.end.release();
        self.begin.reset_count();
        self.timeline.clear();
        disposed
    }
}

impl<T> Drop for DequeState<T> {
    fn drop(&mut self) {
        // Links reference each other in both directions; break the cycles.
        if !self.disposed {
            self.emit_events = false;
            self.teardown();
        }
    }
}
