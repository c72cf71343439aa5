//! Update Pipeline
//!
//! Every write passes through two ordered stage lists before it may commit:
//!
//! 1. Parse stages transform the raw input. Each stage feeds the next; the
//!    first failure aborts the write.
//! 2. Validation stages each see the same `(current, parsed)` pair and never
//!    see each other's verdicts. Every rejection is collected.
//!
//! Stages are plain callables. Any `Fn(T) -> Result<T, ParseError>` is a
//! parse stage and any `Fn(&T, &T) -> Validation` is a validation stage.

use crate::error::{CellError, ParseError, ValidationError};

/// Verdict of a single validation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Rejected(String),
}

impl Validation {
    /// Build a rejection from any displayable reason.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Accept when `ok` holds, otherwise reject with `reason`.
    pub fn check(ok: bool, reason: impl Into<String>) -> Self {
        if ok {
            Self::Accepted
        } else {
            Self::Rejected(reason.into())
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// A stage that converts raw input into the value a cell stores.
pub trait Parse<T>: Send + Sync {
    fn parse(&self, raw: T) -> Result<T, ParseError>;
}

impl<T, F> Parse<T> for F
where
    F: Fn(T) -> Result<T, ParseError> + Send + Sync,
{
    fn parse(&self, raw: T) -> Result<T, ParseError> {
        self(raw)
    }
}

/// A stage that approves or rejects a transition from `old` to `new`.
pub trait Validate<T>: Send + Sync {
    fn validate(&self, old: &T, new: &T) -> Validation;
}

impl<T, F> Validate<T> for F
where
    F: Fn(&T, &T) -> Validation + Send + Sync,
{
    fn validate(&self, old: &T, new: &T) -> Validation {
        self(old, new)
    }
}

/// The fixed parse and validation stages of one cell.
pub(crate) struct Pipeline<T> {
    parsers: Vec<Box<dyn Parse<T>>>,
    validators: Vec<Box<dyn Validate<T>>>,
}

impl<T> Pipeline<T> {
    pub(crate) fn new(
        parsers: Vec<Box<dyn Parse<T>>>,
        validators: Vec<Box<dyn Validate<T>>>,
    ) -> Self {
        Self {
            parsers,
            validators,
        }
    }

    pub(crate) fn parser_count(&self) -> usize {
        self.parsers.len()
    }

    pub(crate) fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Run `raw` through every parse stage in order.
    ///
    /// With no parse stages the input is returned as-is.
    pub(crate) fn parse(&self, raw: T) -> Result<T, ParseError> {
        self.parsers
            .iter()
            .try_fold(raw, |value, stage| stage.parse(value))
    }

    /// Run every validation stage against the same pair.
    pub(crate) fn validate(&self, old: &T, new: &T) -> Result<(), ValidationError> {
        let messages: Vec<String> = self
            .validators
            .iter()
            .filter_map(|stage| match stage.validate(old, new) {
                Validation::Accepted => None,
                Validation::Rejected(reason) => Some(reason),
            })
            .collect();

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(messages))
        }
    }

    /// Parse then validate, yielding the value ready to commit.
    pub(crate) fn process(&self, old: &T, raw: T) -> Result<T, CellError> {
        let parsed = self.parse(raw)?;
        self.validate(old, &parsed)?;
        Ok(parsed)
    }
}
