//! Cell Implementation
//!
//! A Cell holds a single value, guards every update with a parse/validate
//! pipeline, and tracks which observers depend on it.
//!
//! # How Cells Work
//!
//! 1. When a cell is read while an effect is running, the effect's observer
//!    is registered on the cell.
//!
//! 2. A write runs the parse stages, then the validation stages. Any
//!    failure is reported to the cell's error sink and the write stops
//!    there: the value is untouched and nobody is notified.
//!
//! 3. A write that passes both stages commits and then re-runs every
//!    registered observer, in registration order, before returning. There
//!    is no equality check; writing the current value notifies again.
//!
//! # Observer failures
//!
//! Observers are not isolated from each other. A panicking observer unwinds
//! out of `write` after the value was committed, and observers registered
//! after it do not run for that write.
//!
//! # Thread Safety
//!
//! Value and observer set sit behind `parking_lot` locks, and no lock is
//! held while stages or observers run, so observers may freely read and
//! write cells (including the one notifying them). Dependency tracking uses
//! a per-thread context stack; an effect only discovers reads made on the
//! thread running it.
//!
//! Writes from different threads are serialized from validation through
//! commit, so every validator compares against the value that the write
//! will actually replace. A stage that writes the same cell from inside its
//! own write is not serialized against it (the lock is reentrant), and the
//! outer write then commits over the inner one.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::effect::Effect;
use super::observer::{Observer, ObserverId};
use super::pipeline::{Parse, Pipeline, Validate, Validation};
use super::sink::{ErrorSink, TracingSink};
use crate::error::ParseError;

/// Unique identifier for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Type-erased view of a cell's observer set.
///
/// Effects and subscriptions hold cells through this trait so that they can
/// drop their own entry without knowing the cell's value type.
pub(crate) trait Source: Send + Sync {
    fn cell_id(&self) -> CellId;

    /// Remove an observer. Returns whether it was present.
    fn remove_observer(&self, id: ObserverId) -> bool;

    fn has_observer(&self, id: ObserverId) -> bool;
}

/// Result of a call to [`Cell::write`].
///
/// Rejections carry no payload; the reason goes to the cell's error sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value was stored and every observer was notified.
    Committed,
    /// A parse or validation stage refused the input.
    Rejected,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

struct CellInner<T> {
    id: CellId,
    label: Option<String>,
    value: RwLock<T>,
    /// Insertion order is notification order.
    observers: RwLock<IndexMap<ObserverId, Observer>>,
    pipeline: Pipeline<T>,
    sink: Box<dyn ErrorSink>,
    /// Held from reading the old value until the new one is stored.
    write_order: ReentrantMutex<()>,
}

impl<T> Source for CellInner<T>
where
    T: Send + Sync,
{
    fn cell_id(&self) -> CellId {
        self.id
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        // shift_remove keeps the remaining observers in registration order
        let removed = self.observers.write().shift_remove(&id).is_some();
        if removed {
            trace!(cell = %self.id, observer = %id, "observer removed");
        }
        removed
    }

    fn has_observer(&self, id: ObserverId) -> bool {
        self.observers.read().contains_key(&id)
    }
}

/// A reactive cell holding a value of type T.
///
/// Cloning a cell yields another handle to the same state.
///
/// # Example
///
/// ```rust
/// use warden_core::reactive::{Cell, Validation};
///
/// let age = Cell::builder(30_i64)
///     .validate(|_, new| Validation::check(*new >= 0, "age cannot be negative"))
///     .build();
///
/// assert!(age.write(31).is_committed());
/// assert!(age.write(-1).is_rejected());
/// assert_eq!(age.read(), 31);
/// ```
pub struct Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<CellInner<T>>,
}

impl<T> Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell with no parse or validation stages.
    pub fn new(value: T) -> Self {
        Self::builder(value).build()
    }

    /// Start configuring a cell with the given initial value.
    pub fn builder(value: T) -> CellBuilder<T> {
        CellBuilder::new(value)
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Optional name used in log events.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Get the current value.
    ///
    /// If called while an effect is running, the effect becomes an observer
    /// of this cell. Outside of any effect this is a plain getter.
    pub fn read(&self) -> T {
        if let Some(observer) = ReactiveContext::current_observer() {
            self.track(observer);
        }
        self.read_untracked()
    }

    /// Get the current value without registering any dependency.
    pub fn read_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    fn track(&self, observer: Observer) {
        let observer_id = observer.id();
        let previous = self.inner.observers.write().insert(observer_id, observer);
        if previous.is_none() {
            trace!(cell = %self.inner.id, observer = %observer_id, "dependency registered");
        }

        let source: Weak<dyn Source> = Arc::downgrade(&self.inner) as Weak<dyn Source>;
        ReactiveContext::track_dependency(self.inner.id, source);
    }

    /// Run `raw` through the pipeline and, if accepted, commit and notify.
    ///
    /// Parse and validation failures are reported to the error sink and
    /// leave the cell untouched. Panics raised by observers propagate.
    pub fn write(&self, raw: T) -> WriteOutcome {
        let committed = {
            let _order = self.inner.write_order.lock();
            let current = self.read_untracked();
            self.inner
                .pipeline
                .process(&current, raw)
                .map(|value| *self.inner.value.write() = value)
        };

        if let Err(error) = committed {
            debug!(
                cell = %self.inner.id,
                label = ?self.inner.label,
                %error,
                "write rejected"
            );
            self.inner.sink.report(self.inner.id, &error);
            return WriteOutcome::Rejected;
        }
        debug!(cell = %self.inner.id, label = ?self.inner.label, "write committed");

        self.notify_observers();
        WriteOutcome::Committed
    }

    /// Re-run every observer registered at the start of the fan-out.
    ///
    /// Observers removed by an earlier observer in the same fan-out are
    /// skipped.
    fn notify_observers(&self) {
        let observers: Vec<Observer> = self.inner.observers.read().values().cloned().collect();
        trace!(cell = %self.inner.id, count = observers.len(), "notifying observers");

        for observer in observers {
            if !self.inner.has_observer(observer.id()) {
                continue;
            }
            observer.notify();
        }
    }

    /// Shorthand for [`Effect::new`].
    ///
    /// The effect is not tied to this cell: it observes exactly the cells it
    /// reads, and is not registered here unless its body reads this cell.
    pub fn create_effect<F>(&self, run: F) -> Effect
    where
        F: Fn() + Send + Sync + 'static,
    {
        Effect::new(run)
    }

    /// Register passive work that runs after every committed write.
    ///
    /// The work does not run now and does not discover dependencies; reads
    /// it performs are plain getters.
    pub fn subscribe<F>(&self, notify: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let observer = Observer::new(notify);
        let id = observer.id();
        self.inner.observers.write().insert(id, observer);
        trace!(cell = %self.inner.id, observer = %id, "subscribed");

        Subscription {
            id,
            cell_id: self.inner.id,
            source: Arc::downgrade(&self.inner) as Weak<dyn Source>,
        }
    }

    /// Get the number of observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.read().len()
    }

    /// Whether the given observer is registered on this cell.
    pub fn is_subscribed(&self, id: ObserverId) -> bool {
        self.inner.has_observer(id)
    }

    /// Observer ids in notification order.
    pub fn observer_ids(&self) -> Vec<ObserverId> {
        self.inner.observers.read().keys().copied().collect()
    }
}

impl<T> Clone for Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Cell<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("value", &self.read_untracked())
            .field("parsers", &self.inner.pipeline.parser_count())
            .field("validators", &self.inner.pipeline.validator_count())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`Cell::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Clone)]
pub struct Subscription {
    id: ObserverId,
    cell_id: CellId,
    source: Weak<dyn Source>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// The cell this subscription was taken on.
    pub fn cell_id(&self) -> CellId {
        self.cell_id
    }

    /// Stop receiving notifications. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if let Some(source) = self.source.upgrade() {
            source.remove_observer(self.id);
        }
    }

    /// Whether the subscription is still registered on a live cell.
    pub fn is_active(&self) -> bool {
        self.source
            .upgrade()
            .is_some_and(|source| source.has_observer(self.id))
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cell_id", &self.cell_id)
            .finish()
    }
}

/// Construction-time configuration for a [`Cell`].
///
/// Stages run in the order they are added. Nothing can be changed once
/// [`CellBuilder::build`] has been called.
pub struct CellBuilder<T> {
    value: T,
    label: Option<String>,
    parsers: Vec<Box<dyn Parse<T>>>,
    validators: Vec<Box<dyn Validate<T>>>,
    sink: Option<Box<dyn ErrorSink>>,
}

impl<T> CellBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(value: T) -> Self {
        Self {
            value,
            label: None,
            parsers: Vec::new(),
            validators: Vec::new(),
            sink: None,
        }
    }

    /// Name the cell in log events.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a parse stage.
    pub fn parse<F>(self, stage: F) -> Self
    where
        F: Fn(T) -> Result<T, ParseError> + Send + Sync + 'static,
    {
        self.parse_stage(stage)
    }

    /// Append any [`Parse`] implementation as a stage.
    pub fn parse_stage<P>(mut self, stage: P) -> Self
    where
        P: Parse<T> + 'static,
    {
        self.parsers.push(Box::new(stage));
        self
    }

    /// Append a validation stage.
    pub fn validate<F>(self, stage: F) -> Self
    where
        F: Fn(&T, &T) -> Validation + Send + Sync + 'static,
    {
        self.validate_stage(stage)
    }

    /// Append any [`Validate`] implementation as a stage.
    pub fn validate_stage<V>(mut self, stage: V) -> Self
    where
        V: Validate<T> + 'static,
    {
        self.validators.push(Box::new(stage));
        self
    }

    /// Route parse and validation failures to `sink`.
    ///
    /// Without a sink, failures are logged through `tracing`.
    pub fn error_sink<S>(mut self, sink: S) -> Self
    where
        S: ErrorSink + 'static,
    {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Cell<T> {
        let inner = CellInner {
            id: CellId::new(),
            label: self.label,
            value: RwLock::new(self.value),
            observers: RwLock::new(IndexMap::new()),
            write_order: ReentrantMutex::new(()),
            pipeline: Pipeline::new(self.parsers, self.validators),
            sink: self.sink.unwrap_or_else(|| Box::new(TracingSink)),
        };
        debug!(cell = %inner.id, label = ?inner.label, "cell created");

        Cell {
            inner: Arc::new(inner),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
