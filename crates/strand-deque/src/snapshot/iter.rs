//! Snapshot iterators.
//!
//! Iteration takes no deque lock. Each step follows the recorded neighbor
//! pointer and resolves it to the link version live at the snapshot's
//! version. Both ends are bounded by the snapshot's size, so a forward and a
//! backward cursor never cross.

use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;

use strand_common::types::{NodeHandle, Version};

use super::{Snapshot, SnapshotView};
use crate::link::{LinkInfo, LinkVersion};

/// A node as seen by a snapshot.
#[derive(Debug)]
pub struct SnapshotEntry<T> {
    /// Handle of the node, usable with the deque's node operations.
    pub node: NodeHandle,
    /// The node's element.
    pub element: Arc<T>,
}

impl<T> Clone for SnapshotEntry<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node,
            element: Arc::clone(&self.element),
        }
    }
}

type Step<T> = (Arc<LinkVersion<T>>, Arc<T>);

/// Double-ended walk over the links a snapshot can see.
pub(crate) struct Cursor<T> {
    front: Option<Arc<LinkVersion<T>>>,
    back: Option<Arc<LinkVersion<T>>>,
    remaining: usize,
    version: Version,
}

impl<T> Cursor<T> {
    pub(crate) fn new(view: &SnapshotView<T>) -> Self {
        let version = view.version;
        if view.size == 0 {
            return Self {
                front: None,
                back: None,
                remaining: 0,
                version,
            };
        }
        Self {
            front: view.first.resolve(version),
            back: view.last.resolve(version),
            remaining: view.size,
            version,
        }
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn visit(&mut self, link: &Arc<LinkVersion<T>>) -> Option<Arc<T>> {
        let element = if link.is_sentinel() {
            None
        } else {
            link.element()
        };
        match element {
            Some(element) => {
                self.remaining -= 1;
                Some(element)
            }
            None => {
                tracing::error!(
                    node = %link.owner(),
                    version = %self.version,
                    remaining = self.remaining,
                    "snapshot iteration ended early"
                );
                self.remaining = 0;
                None
            }
        }
    }

    pub(crate) fn next_front(&mut self) -> Option<Step<T>> {
        if self.remaining == 0 {
            return None;
        }
        let link = self.front.take()?;
        let element = self.visit(&link)?;
        if self.remaining > 0 {
            self.front = link.next().and_then(|next| next.resolve(self.version));
        }
        Some((link, element))
    }

    pub(crate) fn next_back(&mut self) -> Option<Step<T>> {
        if self.remaining == 0 {
            return None;
        }
        let link = self.back.take()?;
        let element = self.visit(&link)?;
        if self.remaining > 0 {
            self.back = link.previous().and_then(|prev| prev.resolve(self.version));
        }
        Some((link, element))
    }
}

macro_rules! snapshot_iterator {
    ($(#[$doc:meta])* $name:ident, $item:ty, |$link:ident, $element:ident| $map:expr) => {
        $(#[$doc])*
        pub struct $name<'a, T> {
            cursor: Cursor<T>,
            _snapshot: PhantomData<&'a Snapshot<T>>,
        }

        impl<'a, T> $name<'a, T> {
            pub(crate) fn new(view: &'a SnapshotView<T>) -> Self {
                Self {
                    cursor: Cursor::new(view),
                    _snapshot: PhantomData,
                }
            }
        }

        impl<T> Iterator for $name<'_, T> {
            type Item = $item;

            fn next(&mut self) -> Option<Self::Item> {
                self.cursor.next_front().map(|($link, $element)| $map)
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                let remaining = self.cursor.remaining();
                (remaining, Some(remaining))
            }
        }

        impl<T> DoubleEndedIterator for $name<'_, T> {
            fn next_back(&mut self) -> Option<Self::Item> {
                self.cursor.next_back().map(|($link, $element)| $map)
            }
        }

        impl<T> ExactSizeIterator for $name<'_, T> {}

        impl<T> FusedIterator for $name<'_, T> {}
    };
}

snapshot_iterator!(
    /// Iterator over a snapshot's elements.
    Iter,
    Arc<T>,
    |_link, element| element
);

snapshot_iterator!(
    /// Iterator over a snapshot's nodes and their elements.
    Nodes,
    SnapshotEntry<T>,
    |link, element| SnapshotEntry {
        node: link.owner(),
        element,
    }
);

snapshot_iterator!(
    /// Iterator over the link versions a snapshot resolves to.
    Links,
    LinkInfo,
    |link, _element| link.info()
);
