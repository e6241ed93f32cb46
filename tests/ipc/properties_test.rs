/*!
 * Property tests
 * Ordering, tie-break, risk monotonicity, and handle round-trips
 */

use adaptive_ipc::{compute_risk, IpcManager, TYPE_WILDCARD};
use proptest::prelude::*;

proptest! {
    /// Dequeue order is descending priority; equal priorities keep send order
    #[test]
    fn prop_dequeue_order_is_priority_then_fifo(
        hints in proptest::collection::vec(-40i8..=40, 1..24),
    ) {
        let ipc = IpcManager::new();
        let queue_id = ipc.queues().create(1).unwrap();

        for (index, hint) in hints.iter().enumerate() {
            ipc.queues()
                .send(
                    queue_id,
                    1,
                    1,
                    (index as u32).to_le_bytes().to_vec(),
                    Some(*hint),
                )
                .unwrap();
        }

        let mut received = Vec::new();
        while let Ok(msg) = ipc.queues().receive(queue_id, 1, TYPE_WILDCARD, false, None) {
            let bytes: [u8; 4] = msg.payload.as_slice().try_into().unwrap();
            received.push((msg.priority, u32::from_le_bytes(bytes)));
        }

        prop_assert_eq!(received.len(), hints.len());
        for pair in received.windows(2) {
            prop_assert!(pair[0].0 >= pair[1].0);
            if pair[0].0 == pair[1].0 {
                // FIFO tie-break: earlier send index dequeues first
                prop_assert!(pair[0].1 < pair[1].1);
            }
        }
    }

    /// Messages with identical priority inputs always dequeue in send order
    #[test]
    fn prop_equal_inputs_are_fifo(count in 2usize..32) {
        let ipc = IpcManager::new();
        let queue_id = ipc.queues().create(1).unwrap();

        for index in 0..count {
            ipc.queues()
                .send(queue_id, 1, 1, (index as u32).to_le_bytes().to_vec(), None)
                .unwrap();
        }

        for expected in 0..count {
            let msg = ipc
                .queues()
                .receive(queue_id, 1, TYPE_WILDCARD, false, None)
                .unwrap();
            let bytes: [u8; 4] = msg.payload.as_slice().try_into().unwrap();
            prop_assert_eq!(u32::from_le_bytes(bytes), expected as u32);
        }
    }

    /// Deeper wait lists never lower the risk score, other inputs fixed
    #[test]
    fn prop_risk_monotone_in_wait_depth(
        exiting in any::<bool>(),
        stale in any::<bool>(),
        adjustment in -10.0f32..=15.0,
        mut depths in proptest::collection::vec(0usize..64, 2..12),
    ) {
        depths.sort_unstable();
        let mut last = compute_risk(exiting, depths[0], stale, adjustment);
        for depth in depths.into_iter().skip(1) {
            let risk = compute_risk(exiting, depth, stale, adjustment);
            prop_assert!(risk >= last);
            last = risk;
        }
    }

    /// Risk scores always land in [0, 100]
    #[test]
    fn prop_risk_bounded(
        exiting in any::<bool>(),
        depth in 0usize..10_000,
        stale in any::<bool>(),
        adjustment in -1000.0f32..=1000.0,
    ) {
        let risk = compute_risk(exiting, depth, stale, adjustment);
        prop_assert!(risk <= 100);
    }

    /// Create-release cycles recycle the same handle indefinitely
    #[test]
    fn prop_handle_round_trip(cycles in 1usize..16) {
        let ipc = IpcManager::new();
        let first = ipc.queues().create(1).unwrap();
        ipc.queues().destroy(first, 1).unwrap();

        for _ in 0..cycles {
            let handle = ipc.queues().create(1).unwrap();
            prop_assert_eq!(handle, first);
            ipc.queues().destroy(handle, 1).unwrap();
        }
    }
}
