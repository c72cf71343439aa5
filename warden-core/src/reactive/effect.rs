//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a cell
//! it read commits a write.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately. Every cell
//!    read during that run registers the effect as an observer.
//!
//! 2. When one of those cells commits a write, it re-runs the effect
//!    synchronously, and the effect re-discovers its dependencies.
//!
//! 3. After each run the effect reconciles what it read against what it
//!    read last time, according to its [`DependencyPolicy`]. A run that was
//!    overtaken by a newer run started inside it (the body wrote a cell it
//!    reads), or whose body panicked, only adds to the recorded
//!    dependencies and never prunes.
//!
//! # Disposal
//!
//! [`Effect::dispose`] removes the effect from every cell it is registered
//! on and stops it from ever running again. Dropping the handle does not
//! dispose the effect: cells keep it alive for as long as they hold it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::cell::{CellId, Source};
use super::context::{Dependency, ReactiveContext};
use super::observer::{Observer, ObserverId};

/// What happens to subscriptions an effect stops using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyPolicy {
    /// Drop the effect from cells it read last run but not this run.
    #[default]
    Prune,
    /// Keep every subscription the effect ever made until disposal.
    Accumulate,
}

struct EffectInner {
    id: ObserverId,
    run: Box<dyn Fn() + Send + Sync>,
    policy: DependencyPolicy,
    /// Every cell currently holding this effect, in discovery order.
    dependencies: RwLock<IndexMap<CellId, Weak<dyn Source>>>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
    /// Bumped when a run starts; only the newest run may prune.
    generation: AtomicU64,
}

/// The context frame of one effect run.
///
/// Closing the scope pops the frame and yields the run's reads. A scope
/// dropped while still open (the body panicked) folds its reads into the
/// effect's dependencies without pruning, so disposal can still find every
/// cell the failed run registered on.
struct RunScope<'a> {
    effect: &'a EffectInner,
    context: Option<ReactiveContext>,
}

impl RunScope<'_> {
    fn close(&mut self) -> Option<Vec<Dependency>> {
        let context = self.context.take()?;
        let read = ReactiveContext::get_dependencies();
        drop(context);
        Some(read)
    }
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        if let Some(read) = self.close() {
            trace!(effect = %self.effect.id, dependencies = read.len(), "effect run unwound");
            self.effect.absorb(read);
        }
    }
}

impl EffectInner {
    fn execute(self: &Arc<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let observer = {
            let inner = Arc::clone(self);
            Observer::with_id(self.id, move || inner.execute())
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut scope = RunScope {
            effect: self,
            context: Some(ReactiveContext::enter(observer)),
        };
        (self.run)();
        let read = scope.close().unwrap_or_default();
        drop(scope);

        let runs = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(effect = %self.id, run = runs, dependencies = read.len(), "effect ran");

        if self.generation.load(Ordering::SeqCst) != generation {
            // a newer run started inside this one and already reconciled
            self.absorb(read);
        } else if self.disposed.load(Ordering::SeqCst) {
            self.unregister(read);
        } else {
            self.reconcile(read);
        }
    }

    /// Record reads without dropping anything already recorded.
    fn absorb(&self, read: Vec<Dependency>) {
        if self.disposed.load(Ordering::SeqCst) {
            self.unregister(read);
            return;
        }
        let mut deps = self.dependencies.write();
        for dep in read {
            deps.entry(dep.cell_id).or_insert(dep.source);
        }
    }

    /// Leave every cell in `read` as well as every recorded one.
    ///
    /// Used when the effect was disposed while running: reads made after
    /// disposal registered it again.
    fn unregister(&self, read: Vec<Dependency>) {
        for dep in read {
            if let Some(source) = dep.source.upgrade() {
                source.remove_observer(self.id);
            }
        }
        self.release_all();
    }

    fn reconcile(&self, read: Vec<Dependency>) {
        if self.policy == DependencyPolicy::Accumulate {
            self.absorb(read);
            return;
        }

        let stale: Vec<Weak<dyn Source>> = {
            let mut deps = self.dependencies.write();
            let current: IndexMap<CellId, Weak<dyn Source>> = read
                .into_iter()
                .map(|dep| (dep.cell_id, dep.source))
                .collect();
            let previous = std::mem::replace(&mut *deps, current);
            previous
                .into_iter()
                .filter(|(cell_id, _)| !deps.contains_key(cell_id))
                .map(|(_, source)| source)
                .collect()
        };

        for source in stale {
            if let Some(source) = source.upgrade() {
                source.remove_observer(self.id);
                trace!(effect = %self.id, cell = %source.cell_id(), "stale dependency pruned");
            }
        }
    }

    fn release_all(&self) {
        let deps = std::mem::take(&mut *self.dependencies.write());
        for (_, source) in deps {
            if let Some(source) = source.upgrade() {
                source.remove_observer(self.id);
            }
        }
    }
}

/// A side-effecting computation that runs when its dependencies change.
///
/// # Example
///
/// ```rust
/// use warden_core::reactive::{Cell, Effect};
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use std::sync::Arc;
///
/// let count = Cell::new(1_i64);
/// let seen = Arc::new(AtomicI64::new(0));
///
/// let effect = {
///     let count = count.clone();
///     let seen = seen.clone();
///     Effect::new(move || seen.store(count.read(), Ordering::SeqCst))
/// };
///
/// count.write(5);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// effect.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create an effect that prunes unused subscriptions, and run it once.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_policy(DependencyPolicy::default(), run)
    }

    /// Create an effect with an explicit dependency policy, and run it once.
    pub fn with_policy<F>(policy: DependencyPolicy, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self {
            inner: Arc::new(EffectInner {
                id: ObserverId::new(),
                run: Box::new(run),
                policy,
                dependencies: RwLock::new(IndexMap::new()),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
            }),
        };
        debug!(effect = %effect.inner.id, ?policy, "effect created");

        effect.execute();
        effect
    }

    /// The observer identity cells hold this effect under.
    pub fn id(&self) -> ObserverId {
        self.inner.id
    }

    pub fn policy(&self) -> DependencyPolicy {
        self.inner.policy
    }

    /// Run the effect now, re-discovering its dependencies.
    ///
    /// Does nothing once the effect is disposed.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Remove the effect from every cell it observes and stop it for good.
    ///
    /// Calling this more than once is harmless.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.release_all();
        debug!(effect = %self.inner.id, "effect disposed");
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of completed runs, including the first one.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Number of cells currently holding this effect.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.read().len()
    }

    /// Ids of the cells this effect is registered on, in discovery order.
    pub fn dependencies(&self) -> Vec<CellId> {
        self.inner.dependencies.read().keys().copied().collect()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("policy", &self.inner.policy)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
