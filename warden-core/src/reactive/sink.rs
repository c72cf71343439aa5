//! Error Reporting
//!
//! Parse and validation failures never leave `write` as errors. They are
//! delivered to the cell's [`ErrorSink`] instead, which defaults to a
//! `tracing` warning. Any `Fn(CellId, &CellError)` closure is also a sink.

use std::sync::Arc;

use parking_lot::Mutex;

use super::cell::CellId;
use crate::error::CellError;

/// Receives failures from rejected writes.
pub trait ErrorSink: Send + Sync {
    fn report(&self, cell: CellId, error: &CellError);
}

impl<F> ErrorSink for F
where
    F: Fn(CellId, &CellError) + Send + Sync,
{
    fn report(&self, cell: CellId, error: &CellError) {
        self(cell, error)
    }
}

/// Emits every failure as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, cell: CellId, error: &CellError) {
        match error {
            CellError::Parse(err) => {
                tracing::warn!(cell = %cell, reason = err.message(), "write rejected by parser");
            }
            CellError::Validation(err) => {
                tracing::warn!(
                    cell = %cell,
                    rejections = err.messages().len(),
                    reasons = ?err.messages(),
                    "write rejected by validators"
                );
            }
        }
    }
}

/// Keeps every reported failure in memory.
///
/// Clones share the same log, so one clone can be handed to a cell while
/// another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    errors: Arc<Mutex<Vec<(CellId, CellError)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All failures reported so far, oldest first.
    pub fn errors(&self) -> Vec<CellError> {
        self.errors.lock().iter().map(|(_, err)| err.clone()).collect()
    }

    /// Failures reported for a single cell.
    pub fn errors_for(&self, cell: CellId) -> Vec<CellError> {
        self.errors
            .lock()
            .iter()
            .filter(|(id, _)| *id == cell)
            .map(|(_, err)| err.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Drain and return everything collected so far.
    pub fn take(&self) -> Vec<CellError> {
        self.errors.lock().drain(..).map(|(_, err)| err).collect()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, cell: CellId, error: &CellError) {
        self.errors.lock().push((cell, error.clone()));
    }
}
