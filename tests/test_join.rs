//! Join policy tests
//!
//! Drives `Coordinator::join` and the join wrappers through the public API
//! with branches completing in arbitrary orders.

use converge::{Coordinator, CoordinatorConfig, Join, Outcome, StatusJoin};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Invocation order never changes the result order
#[test]
fn test_join_results_follow_creation_order() {
    init_tracing();
    let coord = Coordinator::<bool, i32>::join(true);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    coord.finalize(move |status, outcome| sink.borrow_mut().push((status, outcome)));

    let c1 = coord.new_callback();
    let c2 = coord.new_callback();
    let c3 = coord.new_callback();

    c2.invoke(true, 1);
    c3.invoke(true, 2);
    c1.invoke(true, 0);

    assert_eq!(*seen.borrow(), vec![(true, Outcome::All(vec![0, 1, 2]))]);
}

/// A single failing branch resolves the join without waiting for the rest
#[test]
fn test_join_failure_short_circuit() {
    init_tracing();
    let join = Join::<&'static str, String>::new("ok");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    join.finalize(move |status, values| sink.borrow_mut().push((status, values)));

    let first = join.new_callback();
    let second = join.new_callback();
    let third = join.new_callback();

    second.invoke("timeout", "ignored".to_string());
    assert_eq!(*seen.borrow(), vec![("timeout", Vec::<String>::new())]);

    first.invoke("ok", "a".to_string());
    third.invoke("ok", "c".to_string());
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(join.coordinator().final_status(), Some("timeout"));
}

/// Finalize with nothing minted completes on the spot
#[test]
fn test_join_empty_set() {
    let join = Join::<bool, u64>::new(true);
    let seen = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    join.finalize(move |status, values| *sink.borrow_mut() = Some((status, values)));
    assert_eq!(*seen.borrow(), Some((true, Vec::new())));
}

/// Outcome decided before finalize is delivered at finalize time
#[test]
fn test_join_completed_before_finalize() {
    let join = Join::<bool, u8>::new(true);
    let a = join.new_callback();
    let b = join.new_callback();
    b.invoke(true, 2);
    a.invoke(true, 1);
    assert!(join.coordinator().is_resolved());
    assert!(!join.is_finalized());

    let seen = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    join.finalize(move |status, values| *sink.borrow_mut() = Some((status, values)));
    assert_eq!(*seen.borrow(), Some((true, vec![1, 2])));
}

/// Tokens can be minted after finalize as long as the join is still open
#[test]
fn test_join_mint_after_finalize() {
    let join = StatusJoin::<i32>::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();

    let early = join.new_callback();
    join.finalize(move |status| sink.borrow_mut().push(status));
    let late = join.new_callback();

    early.invoke(0);
    assert!(seen.borrow().is_empty());
    late.invoke(0);
    assert_eq!(*seen.borrow(), vec![0]);
}

/// Checked minting reports a resolved join instead of panicking
#[test]
fn test_join_try_new_callback_after_failure() -> anyhow::Result<()> {
    let config = CoordinatorConfig::strict().with_name("lookups");
    let join = Join::<bool, i32>::with_config(true, &config)?;
    let token = join.try_new_callback()?;
    token.invoke(false, 0);

    let err = join.try_new_callback().unwrap_err();
    assert_eq!(err.category(), "precondition");
    assert!(err.to_string().contains("lookups"));
    Ok(())
}
