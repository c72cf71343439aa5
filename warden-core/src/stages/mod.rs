//! Ready-made Stages
//!
//! Small, stateless parse and validation stages for use with
//! [`CellBuilder`](crate::reactive::CellBuilder). Each function returns a
//! plain closure, so stages compose with hand-written ones freely.
//!
//! - [`text`]: stages for `String` cells.
//! - [`json`]: stages for dynamically typed `serde_json::Value` cells.
//! - This module: generic comparisons for any ordered or comparable type.

pub mod json;
pub mod text;

use std::fmt::Debug;

use crate::reactive::Validation;

/// Reject values below `min`.
pub fn at_least<T>(min: T) -> impl Fn(&T, &T) -> Validation + Send + Sync + Clone + 'static
where
    T: PartialOrd + Debug + Send + Sync + Clone + 'static,
{
    move |_: &T, new: &T| Validation::check(*new >= min, format!("must be at least {min:?}"))
}

/// Reject values above `max`.
pub fn at_most<T>(max: T) -> impl Fn(&T, &T) -> Validation + Send + Sync + Clone + 'static
where
    T: PartialOrd + Debug + Send + Sync + Clone + 'static,
{
    move |_: &T, new: &T| Validation::check(*new <= max, format!("must be at most {max:?}"))
}

/// Accept only values from a fixed list.
pub fn one_of<T, I>(allowed: I) -> impl Fn(&T, &T) -> Validation + Send + Sync + Clone + 'static
where
    T: PartialEq + Debug + Send + Sync + Clone + 'static,
    I: IntoIterator<Item = T>,
{
    let allowed: Vec<T> = allowed.into_iter().collect();
    move |_: &T, new: &T| {
        Validation::check(
            allowed.contains(new),
            format!("must be one of {allowed:?}"),
        )
    }
}

/// Reject writes equal to the current value.
///
/// Cells notify on every committed write, even an identical one; adding
/// this stage turns such writes into rejections instead.
pub fn changed<T>() -> impl Fn(&T, &T) -> Validation + Send + Sync + Clone + 'static
where
    T: PartialEq + Send + Sync + 'static,
{
    |old: &T, new: &T| Validation::check(old != new, "value is unchanged")
}
