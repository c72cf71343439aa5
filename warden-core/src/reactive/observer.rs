//! Observer types for the reactive system.
//!
//! An Observer is a unit of reactive work that a cell re-runs after a
//! successful write. Effects and plain subscriptions are both observers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for an observer.
///
/// Identity is separate from the work an observer runs, so registering the
/// same closure twice yields two independent observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// An observer of reactive values.
///
/// Cheap to clone: clones share the same work and the same identity.
#[derive(Clone)]
pub struct Observer {
    id: ObserverId,
    /// Invoked when a cell this observer is registered on commits a write.
    notify: Arc<dyn Fn() + Send + Sync>,
}

impl Observer {
    /// Create a new observer with a fresh identity.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_id(ObserverId::new(), notify)
    }

    /// Create an observer that reuses an existing identity.
    ///
    /// Effects rebuild their observer on every run; keeping the id stable
    /// means a cell that already holds the effect keeps it in place.
    pub fn with_id<F>(id: ObserverId, notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id,
            notify: Arc::new(notify),
        }
    }

    /// Get the observer's unique ID.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Run the observer's work.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish()
    }
}
