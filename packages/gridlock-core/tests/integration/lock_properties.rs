//! Lock behaviour seen from independent clients sharing one store.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ntest::timeout;
use proptest::prelude::*;

use gridlock_core::clock::SystemClock;
use gridlock_core::schema::TableKind;
use gridlock_core::{
    GridBackend, GridError, LockAcquired, LockCoordinator, LockOptions, LockState, TableClient,
};

use crate::helpers::{strings, Fixture};

#[timeout(1000)]
#[test]
fn test_reentrant_acquire_keeps_cell() {
    let fx = Fixture::user_store();
    let tags = TableKind::Tags.schema();
    let a = fx.session("A");
    let locks = fx.locks();

    assert_eq!(locks.acquire(&a, &tags).unwrap(), LockAcquired::Fresh);
    let writes = fx.grid.write_count();
    assert_eq!(locks.acquire(&a, &tags).unwrap(), LockAcquired::Reentrant);
    assert_eq!(fx.grid.write_count(), writes);
    assert_eq!(
        locks.status(&a, &tags).unwrap(),
        LockState::LockedBy("A".to_string())
    );
}

#[timeout(1000)]
#[test]
fn test_timeout_leaves_holder_in_place() {
    let fx = Fixture::user_store();
    let tags = TableKind::Tags.schema();
    let (a, b) = (fx.session("A"), fx.session("B"));
    let locks = fx.locks();
    locks.acquire(&a, &tags).unwrap();

    let before = fx.clock.elapsed();
    let err = locks.acquire(&b, &tags).unwrap_err();
    let waited = fx.clock.elapsed() - before;

    assert!(waited >= Duration::from_millis(1000) && waited <= Duration::from_millis(1500));
    match err {
        GridError::LockTimeout { holder, .. } => assert_eq!(holder, "A"),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(locks.status(&b, &tags).unwrap().is_held_by(&a.identity));
}

#[timeout(1000)]
#[test]
fn test_release_guard() {
    let fx = Fixture::user_store();
    let tags = TableKind::Tags.schema();
    let (a, b) = (fx.session("A"), fx.session("B"));
    let locks = fx.locks();
    locks.acquire(&a, &tags).unwrap();

    assert!(matches!(
        locks.release(&b, &tags),
        Err(GridError::LockNotOwned { .. })
    ));
    assert!(locks.status(&a, &tags).unwrap().is_held_by(&a.identity));
}

#[timeout(1000)]
#[test]
fn test_tags_scenario() {
    let fx = Fixture::user_store();
    let tags = TableKind::Tags.schema();
    let (a, b) = (fx.session("A"), fx.session("B"));
    fx.grid
        .append_row(&fx.store, &tags.name, &strings(&["t1", "default"]))
        .unwrap();

    // two clients, each with its own coordinator
    let locks_a = fx.locks();
    let locks_b = fx.locks();

    locks_a.acquire(&a, &tags).unwrap();
    assert!(matches!(
        locks_b.acquire(&b, &tags),
        Err(GridError::LockTimeout { .. })
    ));
    locks_a.release(&a, &tags).unwrap();

    let sleeps_before = fx.clock.sleeps().len();
    assert_eq!(locks_b.acquire(&b, &tags).unwrap(), LockAcquired::Fresh);
    assert_eq!(fx.clock.sleeps().len(), sleeps_before);

    let client = TableClient::new(fx.grid.clone(), locks_b);
    let snapshot = client.fetch(&b, &tags);
    assert_eq!(snapshot.column_values("_tag"), vec!["default"]);
}

#[timeout(5000)]
#[test]
fn test_waiting_client_gets_lock_after_release() {
    let fx = Fixture::user_store();
    let tags = TableKind::Tags.schema();
    let (a, b) = (fx.session("A"), fx.session("B"));
    let options = LockOptions {
        timeout: Duration::from_secs(3),
        poll_interval: Duration::from_millis(20),
    };
    let locks_a = LockCoordinator::new(fx.grid.clone(), Arc::new(SystemClock), options);
    let locks_b = locks_a.clone();
    locks_a.acquire(&a, &tags).unwrap();

    let waiter = {
        let tags = tags.clone();
        thread::spawn(move || locks_b.acquire(&b, &tags))
    };
    thread::sleep(Duration::from_millis(100));
    locks_a.release(&a, &tags).unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), LockAcquired::Fresh);
    assert_eq!(
        locks_a.status(&a, &tags).unwrap(),
        LockState::LockedBy("B".to_string())
    );
}

#[timeout(1000)]
#[test]
fn test_outage_during_poll_times_out_without_writes() {
    let fx = Fixture::user_store();
    let tags = TableKind::Tags.schema();
    let a = fx.session("A");
    let locks = fx.locks();
    fx.grid.set_offline(true);
    let writes = fx.grid.write_count();

    assert!(matches!(
        locks.acquire(&a, &tags),
        Err(GridError::LockTimeout { .. })
    ));
    assert_eq!(fx.grid.write_count(), writes);

    fx.grid.set_offline(false);
    assert_eq!(locks.acquire(&a, &tags).unwrap(), LockAcquired::Fresh);
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Acquire(bool),
    Release(bool),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<bool>().prop_map(Step::Acquire),
        any::<bool>().prop_map(Step::Release),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any sequence of acquire/release calls from A and B keeps at most one
    /// holder, and every outcome matches a single-holder state machine.
    #[test]
    fn prop_single_holder(steps in prop::collection::vec(step(), 1..30)) {
        let fx = Fixture::user_store();
        let tags = TableKind::Tags.schema();
        let sessions = [fx.session("A"), fx.session("B")];
        let locks = fx.locks();
        let mut holder: Option<usize> = None;

        for step in steps {
            match step {
                Step::Acquire(first) => {
                    let who = if first { 0 } else { 1 };
                    let result = locks.acquire(&sessions[who], &tags);
                    match holder {
                        None => {
                            prop_assert_eq!(result.unwrap(), LockAcquired::Fresh);
                            holder = Some(who);
                        }
                        Some(h) if h == who => {
                            prop_assert_eq!(result.unwrap(), LockAcquired::Reentrant);
                        }
                        Some(_) => {
                            let timed_out = matches!(result, Err(GridError::LockTimeout { .. }));
                            prop_assert!(timed_out);
                        }
                    }
                }
                Step::Release(first) => {
                    let who = if first { 0 } else { 1 };
                    let result = locks.release(&sessions[who], &tags);
                    if holder == Some(who) {
                        prop_assert!(result.is_ok());
                        holder = None;
                    } else {
                        let rejected = matches!(result, Err(GridError::LockNotOwned { .. }));
                        prop_assert!(rejected);
                    }
                }
            }

            let state = locks.status(&sessions[0], &tags).unwrap();
            let held_by_a = state.is_held_by(&sessions[0].identity);
            let held_by_b = state.is_held_by(&sessions[1].identity);
            prop_assert!(!(held_by_a && held_by_b));
            match holder {
                None => prop_assert_eq!(state, LockState::Unlocked),
                Some(h) => prop_assert!(state.is_held_by(&sessions[h].identity)),
            }
        }
    }
}
