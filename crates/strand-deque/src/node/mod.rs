//! Node arena.
//!
//! Nodes are stored in an index-addressed arena owned by the deque and are
//! referred to from the outside only by [`NodeHandle`]. A slot whose node was
//! disposed goes back onto a free list with its generation bumped, so a stale
//! handle never reaches the slot's next tenant.
//!
//! Slots 0 and 1 are reserved for the begin and end sentinels. Their current
//! links are kept by the deque itself; the arena never hands those slots out.

use std::sync::Arc;
use std::time::SystemTime;

use strand_common::error::{DequeError, DequeResult};
use strand_common::types::{NodeHandle, NodeId, Version};

use crate::link::LinkVersion;

/// Optional per-node creation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMeta {
    /// Position of the node in the deque's creation sequence.
    pub sequence: u64,
    /// Wall-clock creation time.
    pub created_at: SystemTime,
}

/// Point-in-time description of a node, as returned by `node_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Handle of the node.
    pub handle: NodeHandle,
    /// Opaque identity, never reused within the deque.
    pub id: NodeId,
    /// Whether the node is still part of the live deque.
    pub linked: bool,
    /// Version the node's current link was created on, if linked.
    pub linked_on: Option<Version>,
    /// Creation metadata, when enabled in the configuration.
    pub meta: Option<NodeMeta>,
}

/// A payload node.
pub(crate) struct NodeEntry<T> {
    pub(crate) id: NodeId,
    pub(crate) element: Arc<T>,
    /// Current link. `None` once unlinked; never set again after that.
    pub(crate) head: Option<Arc<LinkVersion<T>>>,
    /// Links of this node that have not been released yet (head included).
    pub(crate) live_links: usize,
    pub(crate) meta: Option<NodeMeta>,
}

impl<T> NodeEntry<T> {
    pub(crate) fn is_linked(&self) -> bool {
        self.head.is_some()
    }

    /// A node is disposable once it is unlinked and none of its links
    /// remain reachable.
    pub(crate) fn is_disposable(&self) -> bool {
        self.head.is_none() && self.live_links == 0
    }

    pub(crate) fn info(&self, handle: NodeHandle) -> NodeInfo {
        NodeInfo {
            handle,
            id: self.id,
            linked: self.is_linked(),
            linked_on: self.head.as_ref().map(|link| link.created_on()),
            meta: self.meta,
        }
    }
}

struct Slot<T> {
    generation: u32,
    entry: Option<NodeEntry<T>>,
}

/// Arena of payload nodes.
pub(crate) struct NodeArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    next_id: u64,
    len: usize,
    record_meta: bool,
    /// Slots the arena may grow to, sentinels included.
    slot_limit: usize,
}

impl<T> NodeArena<T> {
    pub(crate) fn new(record_meta: bool) -> Self {
        let reserved = (0..NodeHandle::RESERVED_SLOTS)
            .map(|_| Slot {
                generation: 0,
                entry: None,
            })
            .collect();
        Self {
            slots: reserved,
            free: Vec::new(),
            next_id: 1,
            len: 0,
            record_meta,
            slot_limit: usize::MAX,
        }
    }

    #[cfg(test)]
    fn with_slot_limit(record_meta: bool, slot_limit: usize) -> Self {
        Self {
            slot_limit,
            ..Self::new(record_meta)
        }
    }

    /// Allocates a node for `element`. The node starts without a head.
    ///
    /// Fails once every index a [`NodeHandle`] can address is taken.
    pub(crate) fn insert(&mut self, element: Arc<T>) -> DequeResult<NodeHandle> {
        let (index, generation) = match self.free.pop() {
            Some(index) => (index, self.slots[index as usize].generation),
            None => {
                let taken = self.slots.len();
                let index = u32::try_from(taken)
                    .ok()
                    .filter(|_| taken < self.slot_limit)
                    .ok_or_else(|| {
                        DequeError::internal(format!(
                            "node arena index space exhausted at {taken} slots"
                        ))
                    })?;
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (index, 0)
            }
        };

        let meta = self.record_meta.then(|| NodeMeta {
            sequence: self.next_id,
            created_at: SystemTime::now(),
        });
        self.slots[index as usize].entry = Some(NodeEntry {
            id: NodeId::new(self.next_id),
            element,
            head: None,
            live_links: 0,
            meta,
        });
        self.next_id += 1;
        self.len += 1;
        Ok(NodeHandle::new(index, generation))
    }

    fn slot(&self, handle: NodeHandle) -> Option<&Slot<T>> {
        if handle.is_sentinel() {
            return None;
        }
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
    }

    pub(crate) fn get(&self, handle: NodeHandle) -> Option<&NodeEntry<T>> {
        self.slot(handle).and_then(|slot| slot.entry.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut NodeEntry<T>> {
        if handle.is_sentinel() {
            return None;
        }
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Returns the current link of a node, or `None` if it is unlinked or
    /// the handle is stale.
    pub(crate) fn head(&self, handle: NodeHandle) -> Option<Arc<LinkVersion<T>>> {
        self.get(handle).and_then(|entry| entry.head.clone())
    }

    /// Disposes a node: frees the slot and invalidates outstanding handles.
    pub(crate) fn remove(&mut self, handle: NodeHandle) -> Option<NodeEntry<T>> {
        if handle.is_sentinel() {
            return None;
        }
        let slot = self
            .slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.len -= 1;
        Some(entry)
    }

    /// Number of nodes held by the arena, linked or awaiting disposal.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Drains every node, bumping generations so old handles go stale.
    pub(crate) fn drain(&mut self) -> Vec<NodeEntry<T>> {
        let mut drained = Vec::with_capacity(self.len);
        for (index, slot) in self
            .slots
            .iter_mut()
            .enumerate()
            .skip(NodeHandle::RESERVED_SLOTS as usize)
        {
            if let Some(entry) = slot.entry.take() {
                slot.generation = slot.generation.wrapping_add(1);
                if let Ok(index) = u32::try_from(index) {
                    self.free.push(index);
                }
                drained.push(entry);
            }
        }
        self.len = 0;
        drained
    }
}
