/*!
 * Message queue integration tests
 * Ordering, filtering, and blocking semantics through the public facade
 */

use adaptive_ipc::{IpcError, IpcManager, SchedulingClass, TYPE_WILDCARD};
use std::thread;
use std::time::{Duration, Instant};

fn setup() -> IpcManager {
    let _ = env_logger::builder().is_test(true).try_init();
    IpcManager::new()
}

#[test]
fn test_identical_sends_dequeue_in_order() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    // Two messages with identical priority inputs
    ipc.queues()
        .send(queue_id, 1, 1, vec![0xAA; 4], None)
        .unwrap();
    ipc.queues()
        .send(queue_id, 1, 1, vec![0xBB; 4], None)
        .unwrap();

    let a = ipc.queues().receive(queue_id, 1, 1, false, None).unwrap();
    let b = ipc.queues().receive(queue_id, 1, 1, false, None).unwrap();

    assert_eq!(a.payload, vec![0xAA; 4]);
    assert_eq!(b.payload, vec![0xBB; 4]);
    assert_eq!(a.priority, b.priority);
}

#[test]
fn test_higher_priority_jumps_queue() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    ipc.queues()
        .send(queue_id, 1, 1, b"routine".to_vec(), Some(-10))
        .unwrap();
    ipc.queues()
        .send(queue_id, 1, 1, b"urgent".to_vec(), Some(25))
        .unwrap();

    let first = ipc
        .queues()
        .receive(queue_id, 1, TYPE_WILDCARD, false, None)
        .unwrap();
    assert_eq!(first.payload, b"urgent");
}

#[test]
fn test_elevated_sender_outranks_normal() {
    let ipc = setup();
    ipc.processes().register(2, "render", SchedulingClass::Elevated);
    let queue_id = ipc.queues().create(1).unwrap();

    ipc.queues()
        .send(queue_id, 1, 1, b"normal".to_vec(), None)
        .unwrap();
    ipc.queues()
        .send(queue_id, 2, 1, b"elevated".to_vec(), None)
        .unwrap();

    let first = ipc
        .queues()
        .receive(queue_id, 1, TYPE_WILDCARD, false, None)
        .unwrap();
    assert_eq!(first.payload, b"elevated");
}

#[test]
fn test_wildcard_and_filtered_receive() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    ipc.queues()
        .send(queue_id, 1, 10, b"ten".to_vec(), Some(30))
        .unwrap();
    ipc.queues()
        .send(queue_id, 1, 20, b"twenty".to_vec(), None)
        .unwrap();

    // Filter skips the higher-priority type-10 message without removing it
    let twenty = ipc.queues().receive(queue_id, 1, 20, false, None).unwrap();
    assert_eq!(twenty.mtype, 20);
    assert_eq!(ipc.queues().stats(queue_id).unwrap().length, 1);

    // Wildcard drains what remains
    let ten = ipc
        .queues()
        .receive(queue_id, 1, TYPE_WILDCARD, false, None)
        .unwrap();
    assert_eq!(ten.mtype, 10);
}

#[test]
fn test_nonblocking_empty_queue() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    assert_eq!(
        ipc.queues()
            .receive(queue_id, 1, TYPE_WILDCARD, false, None),
        Err(IpcError::NoMatchingMessage)
    );
}

#[test]
fn test_blocking_receive_times_out() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    let start = Instant::now();
    let result = ipc.queues().receive(
        queue_id,
        1,
        TYPE_WILDCARD,
        true,
        Some(Duration::from_millis(100)),
    );

    assert!(matches!(result, Err(IpcError::Timeout { .. })));
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_blocking_receive_gets_late_message() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    let receiver = ipc.clone();
    let handle = thread::spawn(move || {
        receiver.queues().receive(
            queue_id,
            2,
            7,
            true,
            Some(Duration::from_secs(2)),
        )
    });

    thread::sleep(Duration::from_millis(50));
    ipc.queues()
        .send(queue_id, 1, 7, b"late".to_vec(), None)
        .unwrap();

    let msg = handle.join().unwrap().unwrap();
    assert_eq!(msg.payload, b"late");
    assert_eq!(msg.from, 1);
}

#[test]
fn test_blocking_receive_cancellation() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    let receiver = ipc.clone();
    let handle = thread::spawn(move || {
        receiver.queues().receive(
            queue_id,
            2,
            TYPE_WILDCARD,
            true,
            Some(Duration::from_secs(5)),
        )
    });

    thread::sleep(Duration::from_millis(100));
    let signalled = ipc.queues().interrupt(queue_id).unwrap();
    assert_eq!(signalled, 1);

    // Cancellation is a distinct outcome from timeout
    assert_eq!(handle.join().unwrap(), Err(IpcError::Interrupted));
}

#[test]
fn test_filtered_waiter_not_starved_by_other_type() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    let matching = ipc.clone();
    let matching_handle = thread::spawn(move || {
        matching
            .queues()
            .receive(queue_id, 2, 5, true, Some(Duration::from_secs(2)))
    });
    let other = ipc.clone();
    let other_handle = thread::spawn(move || {
        other
            .queues()
            .receive(queue_id, 3, 6, true, Some(Duration::from_millis(500)))
    });

    thread::sleep(Duration::from_millis(50));
    ipc.queues()
        .send(queue_id, 1, 5, b"for-five".to_vec(), None)
        .unwrap();

    // The type-5 waiter gets the message even though a type-6 waiter was
    // parked alongside it; the type-6 waiter times out
    let msg = matching_handle.join().unwrap().unwrap();
    assert_eq!(msg.payload, b"for-five");
    assert!(matches!(
        other_handle.join().unwrap(),
        Err(IpcError::Timeout { .. })
    ));
}

#[test]
fn test_congested_queue_raises_priority_of_new_sends() {
    let ipc = setup();
    let slow = ipc.queues().create(1).unwrap();

    // Build up a history of slow receives
    for _ in 0..4 {
        ipc.queues()
            .send(slow, 1, 1, b"old".to_vec(), None)
            .unwrap();
    }
    thread::sleep(Duration::from_millis(300));
    for _ in 0..4 {
        ipc.queues()
            .receive(slow, 1, TYPE_WILDCARD, false, None)
            .unwrap();
    }

    // A fresh send into the congested queue gets the congestion boost
    ipc.queues()
        .send(slow, 1, 1, b"boosted".to_vec(), None)
        .unwrap();
    let boosted = ipc
        .queues()
        .receive(slow, 1, TYPE_WILDCARD, false, None)
        .unwrap();

    let fresh = ipc.queues().create(1).unwrap();
    ipc.queues()
        .send(fresh, 1, 1, b"plain".to_vec(), None)
        .unwrap();
    let plain = ipc
        .queues()
        .receive(fresh, 1, TYPE_WILDCARD, false, None)
        .unwrap();

    assert!(boosted.priority > plain.priority);
}

#[test]
fn test_access_pattern_ring_tracks_recent_types() {
    let ipc = setup();
    let queue_id = ipc.queues().create(1).unwrap();

    for mtype in [1u32, 2, 3, 4, 5] {
        ipc.queues()
            .send(queue_id, 1, mtype, vec![0], None)
            .unwrap();
        ipc.queues()
            .receive(queue_id, 1, mtype, false, None)
            .unwrap();
    }

    // The ring holds the last four received types; the oldest fell out
    let mut ring = ipc
        .queues()
        .stats(queue_id)
        .unwrap()
        .recent_types
        .to_vec();
    ring.sort_unstable();
    assert_eq!(ring, vec![2, 3, 4, 5]);
}

#[test]
fn test_priority_clamped_to_tier_range() {
    let ipc = setup();
    ipc.processes().register(4, "rt", SchedulingClass::Realtime);
    let queue_id = ipc.queues().create(1).unwrap();

    ipc.queues()
        .send(queue_id, 4, 1, b"max".to_vec(), Some(i8::MAX))
        .unwrap();
    ipc.queues()
        .send(queue_id, 1, 1, b"min".to_vec(), Some(i8::MIN))
        .unwrap();

    let max = ipc
        .queues()
        .receive(queue_id, 1, TYPE_WILDCARD, false, None)
        .unwrap();
    let min = ipc
        .queues()
        .receive(queue_id, 1, TYPE_WILDCARD, false, None)
        .unwrap();

    assert_eq!(max.priority, 100);
    assert_eq!(min.priority, 0);
}
