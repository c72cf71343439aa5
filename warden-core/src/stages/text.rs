//! Text Stages
//!
//! Parse and validation stages for `String` cells.

use crate::error::ParseError;
use crate::reactive::Validation;

/// Strip leading and trailing whitespace.
pub fn trim() -> impl Fn(String) -> Result<String, ParseError> + Send + Sync + Clone + 'static {
    |raw: String| {
        let trimmed = raw.trim();
        if trimmed.len() == raw.len() {
            Ok(raw)
        } else {
            Ok(trimmed.to_string())
        }
    }
}

pub fn lowercase() -> impl Fn(String) -> Result<String, ParseError> + Send + Sync + Clone + 'static
{
    |raw: String| Ok(raw.to_lowercase())
}

/// Replace every run of whitespace with a single space.
pub fn collapse_whitespace(
) -> impl Fn(String) -> Result<String, ParseError> + Send + Sync + Clone + 'static {
    |raw: String| Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Reject strings that are empty once whitespace is ignored.
pub fn non_blank() -> impl Fn(&String, &String) -> Validation + Send + Sync + Clone + 'static {
    |_: &String, new: &String| Validation::check(!new.trim().is_empty(), "empty after trim")
}

/// Reject strings longer than `limit` characters.
pub fn max_chars(
    limit: usize,
) -> impl Fn(&String, &String) -> Validation + Send + Sync + Clone + 'static {
    move |_: &String, new: &String| {
        let count = new.chars().count();
        Validation::check(
            count <= limit,
            format!("must be at most {limit} characters, got {count}"),
        )
    }
}

/// Reject strings containing a character outside `allowed`.
///
/// `description` names the allowed set in the rejection message.
pub fn only_chars<P>(
    allowed: P,
    description: &str,
) -> impl Fn(&String, &String) -> Validation + Send + Sync + Clone + 'static
where
    P: Fn(char) -> bool + Send + Sync + Clone + 'static,
{
    let description = description.to_string();
    move |_: &String, new: &String| match new.chars().find(|c| !allowed(*c)) {
        Some(bad) => Validation::Rejected(format!("{bad:?} is not allowed, expected {description}")),
        None => Validation::Accepted,
    }
}
