//! Obsolete-link reclamation.
//!
//! Links that were superseded by a fork, or whose node was unlinked, are
//! retired into the [`ObsoleteSet`] tagged with the modification version on
//! which they stopped being live. The set is FIFO: versions only grow, so
//! entries are ordered by their tag.
//!
//! # Overview
//!
//! Reclamation works by:
//! 1. Retiring a link with its `obsolete_on` version
//! 2. Computing the oldest version still pinned by an open snapshot
//! 3. Draining entries from the front while their tag is older than it
//! 4. Stopping at the first entry a snapshot may still reach
//!
//! The drain itself lives on the deque state, which owns the node arena the
//! released links are accounted against. This module holds the queue and the
//! bookkeeping.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use strand_common::types::Version;

use crate::link::LinkVersion;

/// FIFO of retired links awaiting reclamation.
pub(crate) struct ObsoleteSet<T> {
    queue: VecDeque<Arc<LinkVersion<T>>>,
}

impl<T> ObsoleteSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Retires a link. The link must already carry its `obsolete_on` tag.
    pub(crate) fn retire(&mut self, link: Arc<LinkVersion<T>>) {
        debug_assert!(link.obsolete_on().is_some());
        self.queue.push_back(link);
    }

    /// Pops the oldest entry if no snapshot pinned at `min_pinned` or later
    /// can reach it.
    pub(crate) fn pop_reclaimable(&mut self, min_pinned: Version) -> Option<Arc<LinkVersion<T>>> {
        let front = self.queue.front()?;
        match front.obsolete_on() {
            Some(tag) if tag < min_pinned => self.queue.pop_front(),
            _ => None,
        }
    }

    /// Checks if the oldest entry is reclaimable at `min_pinned`.
    pub(crate) fn has_reclaimable(&self, min_pinned: Version) -> bool {
        self.queue
            .front()
            .and_then(|link| link.obsolete_on())
            .is_some_and(|tag| tag < min_pinned)
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Arc<LinkVersion<T>>> + '_ {
        self.queue.drain(..)
    }
}

/// Outcome of one reclamation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcResult {
    /// Links released by this pass.
    pub links_reclaimed: usize,
    /// Nodes disposed by this pass.
    pub nodes_disposed: usize,
    /// Entries left in the obsolete set afterwards.
    pub remaining: usize,
}

impl GcResult {
    /// Returns true if the pass released anything.
    pub fn did_work(&self) -> bool {
        self.links_reclaimed > 0 || self.nodes_disposed > 0
    }
}

/// Running reclamation totals.
#[derive(Debug, Default)]
pub struct GcStats {
    /// Passes that released at least one link.
    pub runs: AtomicU64,
    /// Total links released.
    pub links_reclaimed: AtomicU64,
    /// Total nodes disposed.
    pub nodes_disposed: AtomicU64,
}

impl GcStats {
    /// Creates new stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pass.
    pub fn record_run(&self, result: &GcResult) {
        if !result.did_work() {
            return;
        }
        self.runs.fetch_add(1, AtomicOrdering::Relaxed);
        self.links_reclaimed
            .fetch_add(result.links_reclaimed as u64, AtomicOrdering::Relaxed);
        self.nodes_disposed
            .fetch_add(result.nodes_disposed as u64, AtomicOrdering::Relaxed);
    }

    /// Records links released directly by an unlink, outside of any pass.
    pub fn record_released(&self, result: &GcResult) {
        self.links_reclaimed
            .fetch_add(result.links_reclaimed as u64, AtomicOrdering::Relaxed);
        self.nodes_disposed
            .fetch_add(result.nodes_disposed as u64, AtomicOrdering::Relaxed);
    }

    /// Returns the total number of passes that did work.
    pub fn total_runs(&self) -> u64 {
        self.runs.load(AtomicOrdering::Relaxed)
    }

    /// Returns the total links released.
    pub fn total_links_reclaimed(&self) -> u64 {
        self.links_reclaimed.load(AtomicOrdering::Relaxed)
    }

    /// Returns the total nodes disposed.
    pub fn total_nodes_disposed(&self) -> u64 {
        self.nodes_disposed.load(AtomicOrdering::Relaxed)
    }
}
