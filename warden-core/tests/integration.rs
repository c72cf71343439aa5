//! Integration Tests for Reactive Cells
//!
//! These tests verify that cells, effects, subscriptions and the write
//! pipeline work together correctly.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use warden_core::reactive::{
    Cell, CellId, CollectingSink, DependencyPolicy, Effect, ReactiveContext, Validation,
};
use warden_core::stages::{self, json as json_stages};
use warden_core::{CellError, ParseError};

/// A blank string is trimmed, then rejected, and the cell keeps its number.
#[test]
fn blank_input_is_rejected_after_trim() {
    let sink = CollectingSink::new();
    let cell = Cell::builder(json!(10))
        .parse(json_stages::trim_strings())
        .validate(json_stages::reject_blank_strings())
        .error_sink(sink.clone())
        .build();

    assert!(cell.write(json!("   ")).is_rejected());

    assert_eq!(cell.read(), json!(10));
    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_validation());
    assert_eq!(errors[0].messages(), vec!["empty after trim"]);
}

/// An effect runs on creation and on every write, even an identical one.
#[test]
fn effect_reruns_on_every_committed_write() {
    let cell = Cell::new(0);
    let counter = Arc::new(AtomicI32::new(0));

    let _effect = {
        let reader = cell.clone();
        let counter = counter.clone();
        cell.create_effect(move || {
            reader.read();
            counter.fetch_add(1, Ordering::SeqCst);
        })
    };
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    cell.write(5);
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    cell.write(5);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

/// Subscriptions never run on registration and unsubscribe is idempotent.
#[test]
fn subscribe_then_unsubscribe_twice() {
    let cell = Cell::new(0);
    let calls = Arc::new(AtomicI32::new(0));

    let sub = {
        let calls = calls.clone();
        cell.subscribe(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    cell.write(1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sub.unsubscribe();
    cell.write(2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sub.unsubscribe();
    cell.write(3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Accepted writes are visible through read after the full parse chain.
#[test]
fn write_then_read_returns_parsed_value() {
    let cell = Cell::builder(json!(0))
        .parse(json_stages::trim_strings())
        .parse(json_stages::coerce_number())
        .validate(json_stages::require_kind(json_stages::JsonKind::Number))
        .build();

    for (raw, parsed) in [
        (json!(" 12 "), json!(12)),
        (json!("-3"), json!(-3)),
        (json!(4.5), json!(4.5)),
    ] {
        assert!(cell.write(raw).is_committed());
        assert_eq!(cell.read(), parsed);
    }
}

/// Parse failures leave state and observers alone, exactly like rejections.
#[test]
fn parse_failure_matches_rejection() {
    let sink = CollectingSink::new();
    let cell = Cell::builder(json!(1))
        .parse(json_stages::coerce_number())
        .error_sink(sink.clone())
        .build();
    let runs = Arc::new(AtomicI32::new(0));
    let _effect = {
        let cell = cell.clone();
        let runs = runs.clone();
        Effect::new(move || {
            cell.read();
            runs.fetch_add(1, Ordering::SeqCst);
        })
    };

    assert!(cell.write(json!("one")).is_rejected());

    assert_eq!(cell.read(), json!(1));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(
        sink.errors(),
        vec![CellError::from(ParseError::new(r#""one" is not a number"#))]
    );
}

/// Every failing validator is reported, not just the first.
#[test]
fn all_rejections_reported_together() {
    let sink = CollectingSink::new();
    let cell = Cell::builder(50)
        .validate(stages::at_least(0))
        .validate(|old: &i32, new: &i32| {
            Validation::check((new - old).abs() <= 10, "changes by more than 10")
        })
        .validate(stages::at_most(100))
        .error_sink(sink.clone())
        .build();

    cell.write(-20);

    assert_eq!(cell.read(), 50);
    assert_eq!(
        sink.errors()[0].messages(),
        vec!["must be at least 0", "changes by more than 10"]
    );
}

/// Observers registered O1, O2, O3 run in that order before write returns.
#[test]
fn notification_follows_registration_order() {
    let cell = Cell::new(0);
    let log = Arc::new(Mutex::new(Vec::new()));

    let _o1 = {
        let (cell, log) = (cell.clone(), log.clone());
        Effect::new(move || {
            cell.read();
            log.lock().push("o1");
        })
    };
    let _o2 = {
        let log = log.clone();
        cell.subscribe(move || log.lock().push("o2"))
    };
    let _o3 = {
        let (cell, log) = (cell.clone(), log.clone());
        Effect::new(move || {
            cell.read();
            log.lock().push("o3");
        })
    };
    log.lock().clear();

    cell.write(1);
    assert_eq!(*log.lock(), vec!["o1", "o2", "o3"]);
}

/// Reads without an intervening write agree and register an effect once.
#[test]
fn repeated_reads_are_idempotent() {
    let cell = Cell::new(9);
    let _effect = {
        let cell = cell.clone();
        Effect::new(move || {
            let first = cell.read();
            let second = cell.read();
            assert_eq!(first, second);
        })
    };

    assert_eq!(cell.subscriber_count(), 1);
    assert_eq!(cell.read(), cell.read());
    assert_eq!(cell.subscriber_count(), 1);
}

/// With the default policy an effect leaves cells it stopped reading.
#[test]
fn default_policy_prunes_abandoned_dependencies() {
    let switch = Cell::new(false);
    let a = Cell::new(1);
    let b = Cell::new(2);
    let effect = {
        let (switch, a, b) = (switch.clone(), a.clone(), b.clone());
        Effect::new(move || {
            if switch.read() {
                b.read();
            } else {
                a.read();
            }
        })
    };
    assert_eq!(effect.policy(), DependencyPolicy::Prune);

    switch.write(true);

    assert!(!a.is_subscribed(effect.id()));
    assert!(b.is_subscribed(effect.id()));
}

/// The accumulate policy keeps every subscription ever made.
#[test]
fn accumulate_policy_keeps_abandoned_dependencies() {
    let switch = Cell::new(false);
    let a = Cell::new(1);
    let b = Cell::new(2);
    let runs = Arc::new(AtomicI32::new(0));
    let effect = {
        let (switch, a, b, runs) = (switch.clone(), a.clone(), b.clone(), runs.clone());
        Effect::with_policy(DependencyPolicy::Accumulate, move || {
            runs.fetch_add(1, Ordering::SeqCst);
            if switch.read() {
                b.read();
            } else {
                a.read();
            }
        })
    };

    switch.write(true);
    assert!(a.is_subscribed(effect.id()));

    a.write(3);
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    effect.dispose();
    assert_eq!(a.subscriber_count(), 0);
    assert_eq!(b.subscriber_count(), 0);
    assert_eq!(switch.subscriber_count(), 0);
}

/// A panicking observer aborts the fan-out after the value was committed.
#[test]
fn observer_panic_propagates_after_commit() {
    let cell = Cell::new(0);
    let later = Arc::new(AtomicI32::new(0));

    let _failing = {
        let cell = cell.clone();
        Effect::new(move || {
            if cell.read() == 13 {
                panic!("unlucky value");
            }
        })
    };
    let _later = {
        let later = later.clone();
        cell.subscribe(move || {
            later.fetch_add(1, Ordering::SeqCst);
        })
    };

    let result = catch_unwind(AssertUnwindSafe(|| cell.write(13)));

    assert!(result.is_err());
    assert_eq!(cell.read(), 13);
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert!(!ReactiveContext::is_active());

    cell.write(14);
    assert_eq!(later.load(Ordering::SeqCst), 1);
}

/// An effect may write another cell; the second cell's observers run inside
/// the first write.
#[test]
fn effects_cascade_across_cells() {
    let celsius = Cell::new(0.0_f64);
    let fahrenheit = Cell::new(32.0_f64);

    let convert = {
        let (celsius, fahrenheit) = (celsius.clone(), fahrenheit.clone());
        Effect::new(move || {
            fahrenheit.write(celsius.read() * 9.0 / 5.0 + 32.0);
        })
    };
    let shown = Arc::new(Mutex::new(Vec::new()));
    let _display = {
        let (fahrenheit, shown) = (fahrenheit.clone(), shown.clone());
        Effect::new(move || shown.lock().push(fahrenheit.read()))
    };

    celsius.write(100.0);

    assert_eq!(fahrenheit.read(), 212.0);
    assert_eq!(*shown.lock(), vec![32.0, 212.0]);
    assert!(!fahrenheit.is_subscribed(convert.id()));
}

/// A closure sink sees each rejection with the id of the cell it came from.
#[test]
fn closure_sink_receives_cell_id() {
    let seen: Arc<Mutex<Vec<(u64, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let cell = {
        let seen = seen.clone();
        Cell::builder(Value::Null)
            .label("payload")
            .validate(json_stages::require_kind(json_stages::JsonKind::Object))
            .error_sink(move |id: CellId, err: &CellError| {
                seen.lock().push((id.raw(), err.to_string()))
            })
            .build()
    };

    cell.write(json!([1, 2]));

    assert_eq!(cell.label(), Some("payload"));
    assert_eq!(
        *seen.lock(),
        vec![(
            cell.id().raw(),
            "validation failed: expected object, got array".to_string()
        )]
    );
}

/// An effect that writes a cell it reads re-runs inside itself and ends up
/// observing what its newest run read.
#[test]
fn effect_writing_its_own_dependency_tracks_latest_reads() {
    let stage = Cell::new(0);
    let first = Cell::new("a");
    let second = Cell::new("b");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let effect = {
        let (stage, first, second, seen) =
            (stage.clone(), first.clone(), second.clone(), seen.clone());
        Effect::new(move || {
            if stage.read() == 0 {
                seen.lock().push(first.read());
                stage.write(1);
            } else {
                seen.lock().push(second.read());
            }
        })
    };
    assert_eq!(*seen.lock(), vec!["a", "b"]);
    assert!(second.is_subscribed(effect.id()));

    second.write("c");
    assert_eq!(seen.lock().last(), Some(&"c"));
    assert_eq!(effect.run_count(), 3);
    assert!(!first.is_subscribed(effect.id()));

    effect.dispose();
    assert_eq!(stage.subscriber_count(), 0);
    assert_eq!(second.subscriber_count(), 0);
}

/// A re-run that panics after reading a new cell can still be fully disposed.
#[test]
fn dispose_after_panicking_rerun_leaves_no_entries() {
    let trigger = Cell::new(0);
    let extra = Cell::new(0);
    let effect = {
        let (trigger, extra) = (trigger.clone(), extra.clone());
        Effect::new(move || {
            if trigger.read() == 1 {
                extra.read();
                panic!("failed after reading extra");
            }
        })
    };

    let result = catch_unwind(AssertUnwindSafe(|| trigger.write(1)));
    assert!(result.is_err());
    assert!(extra.is_subscribed(effect.id()));

    effect.dispose();

    assert_eq!(extra.subscriber_count(), 0);
    assert_eq!(trigger.subscriber_count(), 0);
    extra.write(5);
    assert_eq!(effect.run_count(), 1);
}
