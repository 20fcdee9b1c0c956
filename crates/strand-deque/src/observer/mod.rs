//! Lifecycle observers.
//!
//! An observer is told when a node is linked, when it is unlinked, and when
//! its element is finally disposed. Events are collected while the deque
//! lock is held and delivered after it is released, so an observer may call
//! back into the deque.
//!
//! Observer failures never reach the caller of the deque operation: an
//! `Err` or a panic from a callback is logged and dropped.

use std::error::Error;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use strand_common::types::{NodeHandle, ObserverId, Version};

/// Result returned by observer callbacks.
pub type ObserverResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Which end of the deque a node was linked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkMode {
    /// Linked after the begin sentinel.
    First,
    /// Linked before the end sentinel.
    Last,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// Receives node lifecycle events from a deque.
///
/// Every callback has an empty default, so implementors only override what
/// they care about.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use strand_deque::{DequeObserver, ObserverResult};
///
/// #[derive(Default)]
/// struct Disposals(AtomicUsize);
///
/// impl DequeObserver<String> for Disposals {
///     fn on_dispose_node(&self, _deque: &str, _element: &String) -> ObserverResult {
///         self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(())
///     }
/// }
/// ```
pub trait DequeObserver<T>: Send + Sync {
    /// Called after `node` was linked at version `version`.
    fn on_link(&self, node: NodeHandle, mode: LinkMode, version: Version) -> ObserverResult {
        let _ = (node, mode, version);
        Ok(())
    }

    /// Called after `node` was unlinked at version `version`.
    fn on_unlink(&self, node: NodeHandle, version: Version) -> ObserverResult {
        let _ = (node, version);
        Ok(())
    }

    /// Called once no snapshot can reach an unlinked node any more.
    fn on_dispose_node(&self, deque: &str, element: &T) -> ObserverResult {
        let _ = (deque, element);
        Ok(())
    }
}

/// An event recorded under the deque lock, delivered after it is released.
pub(crate) enum LifecycleEvent<T> {
    Link {
        node: NodeHandle,
        mode: LinkMode,
        version: Version,
    },
    Unlink {
        node: NodeHandle,
        version: Version,
    },
    Dispose {
        element: Arc<T>,
    },
}

impl<T> LifecycleEvent<T> {
    fn name(&self) -> &'static str {
        match self {
            Self::Link { .. } => "on_link",
            Self::Unlink { .. } => "on_unlink",
            Self::Dispose { .. } => "on_dispose_node",
        }
    }
}

/// Registered observers of one deque.
pub(crate) struct ObserverSet<T> {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<dyn DequeObserver<T>>)>,
}

impl<T> ObserverSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            observers: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, observer: Arc<dyn DequeObserver<T>>) -> ObserverId {
        let id = ObserverId::new(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Snapshot of the current observers, so delivery runs without holding
    /// the registry lock.
    pub(crate) fn to_vec(&self) -> Vec<Arc<dyn DequeObserver<T>>> {
        self.observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

/// Delivers `events` to every observer, isolating failures.
pub(crate) fn dispatch<T>(
    deque: &str,
    observers: &[Arc<dyn DequeObserver<T>>],
    events: Vec<LifecycleEvent<T>>,
) {
    for event in &events {
        for observer in observers {
            let outcome = catch_unwind(AssertUnwindSafe(|| match event {
                LifecycleEvent::Link {
                    node,
                    mode,
                    version,
                } => observer.on_link(*node, *mode, *version),
                LifecycleEvent::Unlink { node, version } => observer.on_unlink(*node, *version),
                LifecycleEvent::Dispose { element } => observer.on_dispose_node(deque, element),
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        deque,
                        callback = event.name(),
                        error = %err,
                        "observer callback failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(deque, callback = event.name(), "observer callback panicked");
                }
            }
        }
    }
}
