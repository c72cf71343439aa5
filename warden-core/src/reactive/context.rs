//! Reactive Context
//!
//! The reactive context tracks which observer is currently running.
//! This enables automatic dependency tracking: when a cell is read,
//! the observer on top of the stack is registered on that cell.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running an effect pushes a frame
//! for its observer; the frame is popped when the returned guard drops,
//! including when the effect body panics.
//!
//! Nested effects push nested frames, so only the innermost observer is
//! ever "current".

use std::cell::RefCell;
use std::sync::Weak;

use smallvec::SmallVec;

use super::cell::{CellId, Source};
use super::observer::{Observer, ObserverId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// A cell read during a context, held weakly so tracking never keeps a
/// cell alive.
#[derive(Clone)]
pub(crate) struct Dependency {
    pub(crate) cell_id: CellId,
    pub(crate) source: Weak<dyn Source>,
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency")
            .field("cell_id", &self.cell_id)
            .finish()
    }
}

/// An entry in the reactive context stack.
struct ContextEntry {
    observer: Observer,
    /// Cells read during this frame, first read first, no duplicates.
    dependencies: SmallVec<[Dependency; 4]>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    observer_id: ObserverId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given observer.
    ///
    /// While this context is active, any cell that is read registers the
    /// observer as a dependent.
    pub fn enter(observer: Observer) -> Self {
        let observer_id = observer.id();
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                observer,
                dependencies: SmallVec::new(),
            });
        });

        Self { observer_id }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Number of frames currently on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Get the observer on top of the stack, if any.
    pub fn current_observer() -> Option<Observer> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.observer.clone()))
    }

    /// Get the id of the observer on top of the stack, if any.
    pub fn current_observer_id() -> Option<ObserverId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.observer.id()))
    }

    /// Record that the current frame read the given cell.
    pub(crate) fn track_dependency(cell_id: CellId, source: Weak<dyn Source>) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if !entry.dependencies.iter().any(|dep| dep.cell_id == cell_id) {
                    entry.dependencies.push(Dependency { cell_id, source });
                }
            }
        });
    }

    /// Get the dependencies collected in the current frame.
    pub(crate) fn get_dependencies() -> Vec<Dependency> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.observer.id(),
                    self.observer_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.observer_id,
                    entry.observer.id()
                );
            }
        });
    }
}
