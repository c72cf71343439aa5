//! Warden Core
//!
//! This crate provides guarded reactive cells: holders of a single value
//! that run every update through a parse/validate pipeline before
//! committing it, and that re-run dependent effects when it changes.
//!
//! It implements:
//!
//! - Reactive cells with construction-time parse and validation stages
//! - Effects with automatic, per-run dependency discovery
//! - Passive subscriptions with idempotent unsubscribe
//! - Pluggable reporting of rejected writes
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Cells, effects, the tracking context and the write pipeline
//! - `stages`: Ready-made parse and validation stages
//! - `error`: Failures reported for rejected writes
//!
//! # Example
//!
//! ```rust
//! use warden_core::reactive::{Cell, CollectingSink, Effect};
//! use warden_core::stages::text;
//! use std::sync::{Arc, Mutex};
//!
//! let sink = CollectingSink::new();
//! let name = Cell::builder(String::from("guest"))
//!     .parse(text::trim())
//!     .validate(text::non_blank())
//!     .error_sink(sink.clone())
//!     .build();
//!
//! let greeting = Arc::new(Mutex::new(String::new()));
//! let _effect = {
//!     let name = name.clone();
//!     let greeting = greeting.clone();
//!     Effect::new(move || *greeting.lock().unwrap() = format!("Hello, {}", name.read()))
//! };
//!
//! name.write("  Ada ".into());
//! assert_eq!(*greeting.lock().unwrap(), "Hello, Ada");
//!
//! // Rejected: nothing changes, the reason goes to the sink.
//! name.write("   ".into());
//! assert_eq!(name.read(), "Ada");
//! assert_eq!(sink.errors()[0].messages(), vec!["empty after trim"]);
//! ```

pub mod error;
pub mod reactive;
pub mod stages;

pub use error::{CellError, ParseError, ValidationError};
