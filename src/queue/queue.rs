/*!
 * Ordered Queue
 * Per-queue state: the ordered message map and the rolling wait window
 */

use super::types::{MessageKey, QueueMessage, TYPE_WILDCARD};
use crate::core::limits::{PATTERN_RING_SIZE, QUEUE_WAIT_WINDOW};
use crate::core::types::{MessageType, Pid, Size};
use crate::types::{IpcError, IpcResult, QueueId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

struct QueueInner {
    messages: BTreeMap<MessageKey, QueueMessage>,
    recent_waits: VecDeque<Duration>,
    /// Last four received message types, oldest overwritten first
    recent_types: [MessageType; PATTERN_RING_SIZE],
    ring_pos: usize,
    closed: bool,
}

/// One priority-ordered queue; content is guarded by the per-object lock
pub(super) struct OrderedQueue {
    pub id: QueueId,
    pub owner: Pid,
    pub capacity: Size,
    inner: Mutex<QueueInner>,
}

impl OrderedQueue {
    pub fn new(id: QueueId, owner: Pid, capacity: Size) -> Self {
        Self {
            id,
            owner,
            capacity,
            inner: Mutex::new(QueueInner {
                messages: BTreeMap::new(),
                recent_waits: VecDeque::with_capacity(QUEUE_WAIT_WINDOW),
                recent_types: [0; PATTERN_RING_SIZE],
                ring_pos: 0,
                closed: false,
            }),
        }
    }

    pub fn push(&self, message: QueueMessage) -> IpcResult<()> {
        let mut inner = self.inner.lock();

        if inner.closed {
            return Err(IpcError::InvalidHandle(format!("queue {} closed", self.id)));
        }
        if inner.messages.len() >= self.capacity {
            return Err(IpcError::ResourceExhausted(format!(
                "queue {} full: {}/{}",
                self.id,
                inner.messages.len(),
                self.capacity
            )));
        }

        let key = MessageKey {
            priority: message.priority,
            seq: message.seq,
        };
        inner.messages.insert(key, message);
        Ok(())
    }

    /// Remove and return the highest-priority message matching `filter`,
    /// skipping non-matching entries without disturbing them. Also returns
    /// how long the message waited, recorded into the rolling window.
    pub fn take_matching(&self, filter: MessageType) -> Option<(QueueMessage, Duration)> {
        let mut inner = self.inner.lock();

        let key = inner
            .messages
            .iter()
            .find(|(_, msg)| filter == TYPE_WILDCARD || msg.mtype == filter)
            .map(|(key, _)| *key)?;

        let message = inner.messages.remove(&key)?;
        let waited = message.enqueued_at.elapsed();

        if inner.recent_waits.len() >= QUEUE_WAIT_WINDOW {
            inner.recent_waits.pop_front();
        }
        inner.recent_waits.push_back(waited);

        let pos = inner.ring_pos;
        inner.recent_types[pos] = message.mtype;
        inner.ring_pos = (pos + 1) % PATTERN_RING_SIZE;

        Some((message, waited))
    }

    /// Snapshot of the last-four-types access pattern ring
    pub fn recent_types(&self) -> [MessageType; PATTERN_RING_SIZE] {
        self.inner.lock().recent_types
    }

    /// Rolling average receive latency over the recent wait window
    pub fn avg_wait(&self) -> Duration {
        let inner = self.inner.lock();
        if inner.recent_waits.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = inner.recent_waits.iter().sum();
        total / inner.recent_waits.len() as u32
    }

    pub fn len(&self) -> Size {
        self.inner.lock().messages.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Mark closed and drain every pending record for payload teardown
    pub fn close_and_drain(&self) -> Vec<QueueMessage> {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let drained = std::mem::take(&mut inner.messages);
        drained.into_values().collect()
    }
}
