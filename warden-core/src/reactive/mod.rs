//! Reactive Primitives
//!
//! This module implements guarded reactive cells and the effects that
//! observe them.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A Cell is a container for a single value. Writes go through a fixed
//! pipeline of parse stages and validation stages; only values that pass
//! both are committed. When a cell's value is read within an effect, the
//! cell automatically registers that effect as an observer. When a write
//! commits, every observer is re-run.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once on creation and
//! again whenever a cell it read commits a write. Its dependencies are
//! rediscovered on every run.
//!
//! ## Subscriptions
//!
//! A Subscription is passive work attached to one cell. It never runs on
//! creation and never discovers dependencies.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a cell is read, we check if there is an active
//! tracking context and, if so, register the dependency.

mod cell;
mod context;
mod effect;
mod observer;
mod pipeline;
mod sink;

pub use cell::{Cell, CellBuilder, CellId, Subscription, WriteOutcome};
pub use context::ReactiveContext;
pub use effect::{DependencyPolicy, Effect};
pub use observer::{Observer, ObserverId};
pub use pipeline::{Parse, Validate, Validation};
pub use sink::{CollectingSink, ErrorSink, TracingSink};
