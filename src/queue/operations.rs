/*!
 * Queue Operations
 * Send, receive, and interruption
 */

use super::manager::QueueManager;
use super::queue::OrderedQueue;
use super::types::{QueueMessage, ReceivedMessage};
use crate::core::limits::{
    CONGESTION_BOOST, CONGESTION_WAIT_THRESHOLD, DEFAULT_RECEIVE_TIMEOUT, ELEVATED_SENDER_BOOST,
    MAX_MESSAGE_SIZE, MAX_PRIORITY, QUEUE_BASE_PRIORITY, SCORING_PRIORITY_WEIGHT,
    SMALL_PAYLOAD_BOOST, SMALL_PAYLOAD_BYTES,
};
use crate::core::sync::WaitOutcome;
use crate::core::types::{MessageType, Pid, Priority, Size};
use crate::types::{IpcError, IpcResult, QueueId};
use log::debug;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

impl QueueManager {
    /// Send a message to a queue.
    ///
    /// The stored priority combines the base tier, sender scheduling class,
    /// payload size, queue congestion, the scoring context's learned
    /// adjustment, and the caller's hint, clamped to [0, 100].
    pub fn send(
        &self,
        queue_id: QueueId,
        from: Pid,
        mtype: MessageType,
        payload: Vec<u8>,
        priority_hint: Option<i8>,
    ) -> IpcResult<()> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(IpcError::ResourceExhausted(format!(
                "payload size {} exceeds limit {}",
                payload.len(),
                MAX_MESSAGE_SIZE
            )));
        }

        let queue = self.queues.get(queue_id)?;
        let priority = self.compute_priority(&queue, from, payload.len(), priority_hint);

        let address = self
            .memory
            .allocate(payload.len(), from)
            .map_err(|e| IpcError::AllocationFailure(e.to_string()))?;
        if !payload.is_empty() {
            if let Err(e) = self.memory.write_bytes(address, 0, &payload) {
                self.memory.deallocate(address);
                return Err(IpcError::AllocationFailure(e.to_string()));
            }
        }

        let message = QueueMessage {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            mtype,
            from,
            priority,
            enqueued_at: Instant::now(),
            data_address: address,
            data_length: payload.len(),
        };

        if let Err(e) = queue.push(message) {
            self.memory.deallocate(address);
            return Err(e);
        }

        debug!(
            "PID {} sent type {} to queue {} (priority {})",
            from, mtype, queue_id, priority
        );

        // Broadcast: receivers with non-matching filters must not swallow
        // the only wakeup
        self.wait_queue.wake_all(queue_id);
        Ok(())
    }

    /// Receive the highest-priority message matching `type_filter` (0 is the
    /// wildcard). In blocking mode the caller suspends up to `timeout`
    /// (default 60s) and may be interrupted externally.
    pub fn receive(
        &self,
        queue_id: QueueId,
        pid: Pid,
        type_filter: MessageType,
        blocking: bool,
        timeout: Option<Duration>,
    ) -> IpcResult<ReceivedMessage> {
        let start = Instant::now();
        let timeout = timeout.unwrap_or(DEFAULT_RECEIVE_TIMEOUT);
        let deadline = start + timeout;

        loop {
            // Re-resolve each round so a queue destroyed mid-wait surfaces
            // as InvalidHandle instead of a stale reference
            let queue = self.queues.get(queue_id)?;

            if let Some((message, waited)) = queue.take_matching(type_filter) {
                let received = self.claim_payload(message)?;

                // Scoring updates happen outside every object lock
                self.scoring.record_queue_wait(queue_id, waited);
                self.scoring.record_message_pattern(received.mtype);

                debug!(
                    "PID {} received type {} from queue {} (waited {:?})",
                    pid, received.mtype, queue_id, waited
                );
                return Ok(received);
            }

            if !blocking {
                return Err(IpcError::NoMatchingMessage);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Self::timeout_error(start, timeout));
            }

            match self.wait_queue.wait(queue_id, Some(deadline - now)) {
                WaitOutcome::Woken => continue,
                WaitOutcome::TimedOut => return Err(Self::timeout_error(start, timeout)),
                WaitOutcome::Interrupted => return Err(IpcError::Interrupted),
            }
        }
    }

    /// Deliver an external cancellation to every receiver blocked on the
    /// queue; returns the number of waiters signalled
    pub fn interrupt(&self, queue_id: QueueId) -> IpcResult<usize> {
        // Validate the handle so cancelling a released queue is an error
        self.queues.get(queue_id)?;
        Ok(self.wait_queue.interrupt_all(queue_id))
    }

    /// Copy the payload out of the backing store and free the record;
    /// ownership transfers to the receiver
    fn claim_payload(&self, message: QueueMessage) -> IpcResult<ReceivedMessage> {
        let payload = self
            .memory
            .read_bytes(message.data_address, 0, message.data_length)
            .map_err(|e| IpcError::InvalidHandle(format!("message payload lost: {}", e)))?;
        self.memory.deallocate(message.data_address);

        Ok(ReceivedMessage {
            payload,
            mtype: message.mtype,
            priority: message.priority,
            from: message.from,
        })
    }

    fn compute_priority(
        &self,
        queue: &OrderedQueue,
        from: Pid,
        payload_len: Size,
        priority_hint: Option<i8>,
    ) -> Priority {
        let mut score = QUEUE_BASE_PRIORITY;

        if self.processes.is_elevated(from) {
            score += ELEVATED_SENDER_BOOST;
        }
        if payload_len < SMALL_PAYLOAD_BYTES {
            score += SMALL_PAYLOAD_BOOST;
        }
        if queue.avg_wait() > CONGESTION_WAIT_THRESHOLD {
            score += CONGESTION_BOOST;
        }

        let learned = self.scoring.queue_priority_adjustment(queue.id);
        score += (SCORING_PRIORITY_WEIGHT * learned).round() as i32;
        score += i32::from(priority_hint.unwrap_or(0));

        score.clamp(0, MAX_PRIORITY) as Priority
    }

    fn timeout_error(start: Instant, timeout: Duration) -> IpcError {
        IpcError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}
