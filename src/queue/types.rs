/*!
 * Queue Types
 * Message records, ordering keys, and statistics
 */

use crate::core::types::{Address, MessageType, Pid, Priority, Sequence, Size};
use crate::types::QueueId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;

/// Wildcard type filter: receive matches any message type
pub const TYPE_WILDCARD: MessageType = 0;

/// A message delivered to a receiver; payload ownership has transferred and
/// the queue-side record is already freed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub payload: Vec<u8>,
    pub mtype: MessageType,
    pub priority: Priority,
    pub from: Pid,
}

/// Queued message record; the payload lives in the memory manager until
/// dequeue copies it out
#[derive(Debug)]
pub(super) struct QueueMessage {
    pub seq: Sequence,
    pub mtype: MessageType,
    pub from: Pid,
    pub priority: Priority,
    pub enqueued_at: Instant,
    pub data_address: Address,
    pub data_length: Size,
}

/// Ordering key: ascending map order is descending priority, then insertion
/// order, so the first entry is always the next message to dequeue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct MessageKey {
    pub priority: Priority,
    pub seq: Sequence,
}

impl PartialOrd for MessageKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MessageKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; equal priorities keep FIFO order
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueStats {
    pub id: QueueId,
    pub owner_pid: Pid,
    pub capacity: Size,
    pub length: Size,
    pub avg_wait_ms: u64,
    /// Last four received message types (access-pattern ring)
    pub recent_types: [MessageType; crate::core::limits::PATTERN_RING_SIZE],
    pub closed: bool,
}
