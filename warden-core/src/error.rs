//! Error Types
//!
//! Failures that a cell recovers from locally. A rejected write never
//! reaches the caller as an error value it must handle; instead the
//! [`CellError`] is handed to the cell's error sink.
//!
//! Observer failures are deliberately absent here: they are panics inside
//! observer work and unwind through `write` untouched.

use thiserror::Error;

/// A parse stage could not convert its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse failed: {message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable reason reported by the stage.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One or more validation stages rejected a parsed value.
///
/// Holds one message per rejecting stage, in stage order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", .messages.join("; "))]
pub struct ValidationError {
    messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Everything that can stop a write before commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CellError {
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// All reasons carried by this error, one per failing stage.
    pub fn messages(&self) -> Vec<&str> {
        match self {
            Self::Parse(err) => vec![err.message()],
            Self::Validation(err) => err.messages().iter().map(String::as_str).collect(),
        }
    }
}
