//! JSON Stages
//!
//! Stages for cells holding a `serde_json::Value`, where the raw input may
//! be of any JSON kind. Parsers pass kinds they do not handle through
//! unchanged unless stated otherwise.

use std::fmt;

use serde_json::{Number, Value};

use crate::error::ParseError;
use crate::reactive::Validation;

/// The kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Trim string values; leave every other kind alone.
pub fn trim_strings() -> impl Fn(Value) -> Result<Value, ParseError> + Send + Sync + Clone + 'static
{
    |raw: Value| match raw {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        other => Ok(other),
    }
}

/// Turn numeric strings into numbers.
///
/// Numbers pass through. Strings that are not numbers, and every other
/// kind, fail to parse.
pub fn coerce_number() -> impl Fn(Value) -> Result<Value, ParseError> + Send + Sync + Clone + 'static
{
    |raw: Value| match raw {
        number @ Value::Number(_) => Ok(number),
        Value::String(s) => parse_number(s.trim())
            .map(Value::Number)
            .ok_or_else(|| ParseError::new(format!("{s:?} is not a number"))),
        other => Err(ParseError::new(format!(
            "expected a number, got {}",
            JsonKind::of(&other)
        ))),
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(Number::from(int));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Reject strings that are empty once whitespace is ignored.
pub fn reject_blank_strings(
) -> impl Fn(&Value, &Value) -> Validation + Send + Sync + Clone + 'static {
    |_: &Value, new: &Value| match new {
        Value::String(s) if s.trim().is_empty() => Validation::reject("empty after trim"),
        _ => Validation::Accepted,
    }
}

/// Accept only values of the given kind.
pub fn require_kind(
    kind: JsonKind,
) -> impl Fn(&Value, &Value) -> Validation + Send + Sync + Clone + 'static {
    move |_: &Value, new: &Value| {
        let actual = JsonKind::of(new);
        Validation::check(actual == kind, format!("expected {kind}, got {actual}"))
    }
}
