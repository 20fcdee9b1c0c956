//! Batched mutations under one exclusive lock acquisition.

use std::sync::Arc;

use strand_common::error::{DequeError, DequeResult};
use strand_common::types::NodeHandle;

use super::state::DequeState;
use super::Shared;
use crate::observer::LinkMode;

/// Access to a locked deque, handed to [`VersionedDeque::compute`].
///
/// Every operation runs under the lock the surrounding `compute` call
/// already holds, so the whole closure is linearized as one step. Changes
/// made before the closure returns an error are kept.
///
/// [`VersionedDeque::compute`]: crate::VersionedDeque::compute
pub struct DequeTxn<'a, T> {
    shared: &'a Shared<T>,
}

impl<'a, T> DequeTxn<'a, T> {
    pub(crate) fn new(shared: &'a Shared<T>) -> Self {
        Self { shared }
    }

    /// Links `element` at the back.
    pub fn append(&mut self, element: T) -> DequeResult<NodeHandle> {
        self.shared.write(|state| state.link(element, LinkMode::Last))
    }

    /// Links `element` at the front.
    pub fn prepend(&mut self, element: T) -> DequeResult<NodeHandle> {
        self.shared.write(|state| state.link(element, LinkMode::First))
    }

    /// Links every element at the back, in order.
    pub fn link_all<I>(&mut self, elements: I) -> DequeResult<Vec<NodeHandle>>
    where
        I: IntoIterator<Item = T>,
    {
        let elements: Vec<T> = elements.into_iter().collect();
        self.shared
            .write(|state| state.link_all(elements, LinkMode::Last))
    }

    /// Unlinks `node`. Returns `false` if it was already unlinked.
    pub fn unlink(&mut self, node: NodeHandle) -> DequeResult<bool> {
        self.shared.unlink(node)
    }

    /// Unlinks and returns the first element.
    pub fn poll_first(&mut self) -> DequeResult<Option<Arc<T>>> {
        self.shared.write(|state| state.poll(LinkMode::First))
    }

    /// Unlinks and returns the last element.
    pub fn poll_last(&mut self) -> DequeResult<Option<Arc<T>>> {
        self.shared.write(|state| state.poll(LinkMode::Last))
    }

    /// Unlinks and returns the first element, failing if the deque is empty.
    pub fn remove_first(&mut self) -> DequeResult<Arc<T>> {
        self.poll_first()?.ok_or(DequeError::Empty)
    }

    /// Returns the first element.
    pub fn peek_first(&self) -> Option<Arc<T>> {
        self.shared
            .read(|state| state.peek(LinkMode::First))
            .flatten()
    }

    /// Returns the last element.
    pub fn peek_last(&self) -> Option<Arc<T>> {
        self.shared
            .read(|state| state.peek(LinkMode::Last))
            .flatten()
    }

    /// Checks if `node` is linked.
    pub fn is_linked(&self, node: NodeHandle) -> bool {
        self.shared
            .read(|state| state.is_linked(node))
            .unwrap_or(false)
    }

    /// Returns the number of linked elements.
    pub fn len(&self) -> usize {
        self.shared.read(DequeState::len).unwrap_or(0)
    }

    /// Checks if the deque is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many more elements fit.
    pub fn remaining_capacity(&self) -> usize {
        self.shared
            .read(DequeState::remaining_capacity)
            .unwrap_or(0)
    }

    /// Unlinks every element. Returns how many were linked.
    pub fn clear(&mut self) -> DequeResult<usize> {
        self.shared.write(DequeState::clear)
    }
}
