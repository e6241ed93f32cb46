/*!
 * Semaphore integration tests
 * Acquire/release semantics and the deadlock-risk admission gate
 */

use adaptive_ipc::{IpcError, IpcManager};
use std::thread;
use std::time::Duration;

fn setup() -> IpcManager {
    let _ = env_logger::builder().is_test(true).try_init();
    IpcManager::new()
}

#[test]
fn test_uncontended_acquire_never_blocks() {
    let ipc = setup();
    let sem_id = ipc.semaphores().create(1, 1).unwrap();

    ipc.semaphores().operate(sem_id, 1, -1, None).unwrap();
    assert_eq!(ipc.semaphores().stats(sem_id).unwrap().count, 0);
}

#[test]
fn test_contended_acquire_blocks_then_succeeds() {
    let ipc = setup();
    let sem_id = ipc.semaphores().create(1, 1).unwrap();
    ipc.semaphores().operate(sem_id, 1, -1, None).unwrap();

    // Second caller: wait-list depth 1, recent release activity, so the
    // risk score sits near the waiters weight and the acquire parks
    let contender = ipc.clone();
    let handle = thread::spawn(move || {
        contender
            .semaphores()
            .operate(sem_id, 2, -1, Some(Duration::from_secs(2)))
    });

    thread::sleep(Duration::from_millis(100));
    let stats = ipc.semaphores().stats(sem_id).unwrap();
    assert_eq!(stats.waiters, 1);
    assert!(stats.risk_score <= 80, "risk {} must admit", stats.risk_score);

    ipc.semaphores().operate(sem_id, 1, 1, None).unwrap();
    handle.join().unwrap().unwrap();
    assert_eq!(ipc.semaphores().stats(sem_id).unwrap().count, 0);
}

#[test]
fn test_release_hands_off_to_one_waiter() {
    let ipc = setup();
    let sem_id = ipc.semaphores().create(0, 1).unwrap();

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let acquirer = ipc.clone();
            thread::spawn(move || {
                acquirer
                    .semaphores()
                    .operate(sem_id, 10 + i, -1, Some(Duration::from_millis(600)))
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    ipc.semaphores().operate(sem_id, 1, 1, None).unwrap();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(IpcError::Timeout { .. })))
            .count(),
        2
    );
}

#[test]
fn test_multi_unit_release_wakes_each_waiter() {
    let ipc = setup();
    let sem_id = ipc.semaphores().create(0, 1).unwrap();

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let acquirer = ipc.clone();
            thread::spawn(move || {
                acquirer
                    .semaphores()
                    .operate(sem_id, 20 + i, -1, Some(Duration::from_secs(2)))
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    ipc.semaphores().operate(sem_id, 1, 2, None).unwrap();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(ipc.semaphores().stats(sem_id).unwrap().count, 0);
}

#[test]
fn test_acquire_timeout_leaves_clean_state() {
    let ipc = setup();
    let sem_id = ipc.semaphores().create(0, 1).unwrap();

    let result = ipc
        .semaphores()
        .operate(sem_id, 2, -1, Some(Duration::from_millis(100)));
    assert!(matches!(result, Err(IpcError::Timeout { .. })));

    // The timed-out caller removed itself from the wait list
    assert_eq!(ipc.semaphores().stats(sem_id).unwrap().waiters, 0);

    // A later release is not consumed by the departed waiter
    ipc.semaphores().operate(sem_id, 1, 1, None).unwrap();
    assert_eq!(ipc.semaphores().stats(sem_id).unwrap().count, 1);
}

#[test]
fn test_interrupted_acquire_is_distinct_from_timeout() {
    let ipc = setup();
    let sem_id = ipc.semaphores().create(0, 1).unwrap();

    let acquirer = ipc.clone();
    let handle = thread::spawn(move || {
        acquirer
            .semaphores()
            .operate(sem_id, 2, -1, Some(Duration::from_secs(5)))
    });

    thread::sleep(Duration::from_millis(100));
    ipc.semaphores().interrupt(sem_id).unwrap();

    assert_eq!(handle.join().unwrap(), Err(IpcError::Interrupted));
    assert_eq!(ipc.semaphores().stats(sem_id).unwrap().waiters, 0);
}

#[test]
fn test_gate_rejects_high_risk_exiting_caller() {
    let ipc = setup();
    ipc.processes()
        .register(7, "teardown", adaptive_ipc::SchedulingClass::Normal);
    ipc.processes().set_exiting(7);

    let sem_id = ipc.semaphores().create(0, 1).unwrap();

    // Park another waiter so the wait list is non-empty, then let the
    // release history go stale
    let other = ipc.clone();
    let parked = thread::spawn(move || {
        other
            .semaphores()
            .operate(sem_id, 2, -1, Some(Duration::from_secs(8)))
    });
    thread::sleep(Duration::from_millis(100));

    // Exiting (30) + waiters (20) + stale release (25) + adjustment > 80:
    // force staleness by backdating via repeated failed polls
    let result = loop {
        let attempt = ipc
            .semaphores()
            .operate(sem_id, 7, -1, Some(Duration::from_millis(20)));
        match attempt {
            Err(IpcError::DeadlockRisk { .. }) => break attempt,
            Err(IpcError::Timeout { .. }) => {
                // Not stale yet; keep probing until the release history ages
                thread::sleep(Duration::from_millis(500));
            }
            other => break other,
        }
    };

    match result {
        Err(IpcError::DeadlockRisk { score }) => assert!(score > 80),
        other => panic!("expected DeadlockRisk, got {:?}", other),
    }

    ipc.semaphores().interrupt(sem_id).unwrap();
    let _ = parked.join().unwrap();
}

#[test]
fn test_risk_visible_in_stats() {
    let ipc = setup();
    let sem_id = ipc.semaphores().create(0, 1).unwrap();

    let _ = ipc
        .semaphores()
        .operate(sem_id, 2, -1, Some(Duration::from_millis(50)));

    // The blocking attempt recorded its computed risk
    let stats = ipc.semaphores().stats(sem_id).unwrap();
    assert!(stats.risk_score >= 20);
}
