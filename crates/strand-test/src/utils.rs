//! Test utilities and helpers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use parking_lot::Mutex;
use strand_deque::{DequeObserver, LinkMode, NodeHandle, ObserverResult, Snapshot, Version, VersionedDeque};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Collects a snapshot's elements front to back.
pub fn contents<T: Clone>(snapshot: &Snapshot<T>) -> Vec<T> {
    snapshot.to_vec().expect("snapshot should be open")
}

/// Collects a snapshot's elements back to front.
pub fn contents_rev<T: Clone>(snapshot: &Snapshot<T>) -> Vec<T> {
    snapshot
        .iter()
        .expect("snapshot should be open")
        .rev()
        .map(|element| T::clone(&element))
        .collect()
}

/// Collects the live deque's elements through a short-lived snapshot.
pub fn live_contents<T: Clone>(deque: &VersionedDeque<T>) -> Vec<T> {
    let snapshot = deque.create_snapshot().expect("deque should be usable");
    contents(&snapshot)
}

/// Observer that counts every callback and remembers disposed elements.
pub struct CountingObserver<T> {
    /// `on_link` calls.
    pub links: AtomicUsize,
    /// `on_unlink` calls.
    pub unlinks: AtomicUsize,
    /// Elements passed to `on_dispose_node`, in order.
    pub disposed: Mutex<Vec<T>>,
}

impl<T> Default for CountingObserver<T> {
    fn default() -> Self {
        Self {
            links: AtomicUsize::new(0),
            unlinks: AtomicUsize::new(0),
            disposed: Mutex::new(Vec::new()),
        }
    }
}

impl<T> CountingObserver<T> {
    /// Returns the number of `on_link` calls.
    pub fn link_count(&self) -> usize {
        self.links.load(Ordering::SeqCst)
    }

    /// Returns the number of `on_unlink` calls.
    pub fn unlink_count(&self) -> usize {
        self.unlinks.load(Ordering::SeqCst)
    }
}

impl<T: Clone> CountingObserver<T> {
    /// Returns the disposed elements.
    pub fn disposed(&self) -> Vec<T> {
        self.disposed.lock().clone()
    }
}

impl<T: Clone + Send + Sync> DequeObserver<T> for CountingObserver<T> {
    fn on_link(&self, _node: NodeHandle, _mode: LinkMode, _version: Version) -> ObserverResult {
        self.links.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_unlink(&self, _node: NodeHandle, _version: Version) -> ObserverResult {
        self.unlinks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_dispose_node(&self, _deque: &str, element: &T) -> ObserverResult {
        self.disposed.lock().push(element.clone());
        Ok(())
    }
}
