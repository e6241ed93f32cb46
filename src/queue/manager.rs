/*!
 * Queue Manager
 * Queue lifecycle: create, destroy, stats, and process cleanup
 */

use super::queue::OrderedQueue;
use super::types::QueueStats;
use crate::core::limits::{DEFAULT_QUEUE_DEPTH, MAX_QUEUES};
use crate::core::process::ProcessDirectory;
use crate::core::sync::WaitQueue;
use crate::core::types::{Pid, Size};
use crate::memory::MemoryManager;
use crate::registry::HandleTable;
use crate::scoring::ScoringContext;
use crate::types::{IpcError, IpcResult, ObjectKind, QueueId};
use log::info;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Message queue manager
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of the sequence counter
#[repr(C, align(64))]
pub struct QueueManager {
    pub(super) queues: Arc<HandleTable<Arc<OrderedQueue>>>,
    pub(super) next_seq: Arc<AtomicU64>,
    pub(super) wait_queue: Arc<WaitQueue<QueueId>>,
    pub(super) memory: MemoryManager,
    pub(super) processes: ProcessDirectory,
    pub(super) scoring: Arc<ScoringContext>,
}

impl QueueManager {
    pub fn new(
        memory: MemoryManager,
        processes: ProcessDirectory,
        scoring: Arc<ScoringContext>,
    ) -> Self {
        info!("Queue manager initialized (capacity: {})", MAX_QUEUES);
        Self {
            queues: Arc::new(HandleTable::new(ObjectKind::Queue, MAX_QUEUES)),
            next_seq: Arc::new(AtomicU64::new(1)),
            wait_queue: Arc::new(WaitQueue::new()),
            memory,
            processes,
            scoring,
        }
    }

    /// Create a new queue
    pub fn create(&self, owner: Pid) -> IpcResult<QueueId> {
        let queue_id = self
            .queues
            .insert_with(|id| Arc::new(OrderedQueue::new(id, owner, DEFAULT_QUEUE_DEPTH)))?;

        info!(
            "PID {} created queue {} (depth: {})",
            owner, queue_id, DEFAULT_QUEUE_DEPTH
        );
        Ok(queue_id)
    }

    /// Destroy a queue (owner only), freeing every pending payload
    pub fn destroy(&self, queue_id: QueueId, pid: Pid) -> IpcResult<()> {
        let queue = self.queues.get(queue_id)?;
        if queue.owner != pid {
            return Err(IpcError::InvalidHandle(format!(
                "queue {} not owned by PID {}",
                queue_id, pid
            )));
        }

        self.queues.remove(queue_id)?;
        let drained = queue.close_and_drain();
        let freed = drained.len();
        for message in drained {
            self.memory.deallocate(message.data_address);
        }

        self.scoring.forget_queue(queue_id);
        self.wait_queue.retire(queue_id);

        info!(
            "PID {} destroyed queue {} (freed {} messages)",
            pid, queue_id, freed
        );
        Ok(())
    }

    /// Get queue statistics
    pub fn stats(&self, queue_id: QueueId) -> IpcResult<QueueStats> {
        let queue = self.queues.get(queue_id)?;
        Ok(QueueStats {
            id: queue.id,
            owner_pid: queue.owner,
            capacity: queue.capacity,
            length: queue.len(),
            avg_wait_ms: queue.avg_wait().as_millis() as u64,
            recent_types: queue.recent_types(),
            closed: queue.is_closed(),
        })
    }

    /// Destroy every queue owned by a terminated process
    pub fn cleanup_process(&self, pid: Pid) -> Size {
        let mut freed = 0;
        for queue_id in self.queues.ids() {
            let owned = self
                .queues
                .get(queue_id)
                .map(|queue| queue.owner == pid)
                .unwrap_or(false);
            if owned && self.destroy(queue_id, pid).is_ok() {
                freed += 1;
            }
        }

        if freed > 0 {
            info!("Cleaned up {} queues for PID {}", freed, pid);
        }
        freed
    }
}

impl crate::traits::MessageQueue for QueueManager {
    fn create(&self, owner: Pid) -> IpcResult<QueueId> {
        QueueManager::create(self, owner)
    }

    fn send(
        &self,
        queue_id: QueueId,
        from: Pid,
        mtype: crate::core::types::MessageType,
        payload: Vec<u8>,
        priority_hint: Option<i8>,
    ) -> IpcResult<()> {
        QueueManager::send(self, queue_id, from, mtype, payload, priority_hint)
    }

    fn receive(
        &self,
        queue_id: QueueId,
        pid: Pid,
        type_filter: crate::core::types::MessageType,
        blocking: bool,
        timeout: Option<std::time::Duration>,
    ) -> IpcResult<super::ReceivedMessage> {
        QueueManager::receive(self, queue_id, pid, type_filter, blocking, timeout)
    }

    fn destroy(&self, queue_id: QueueId, pid: Pid) -> IpcResult<()> {
        QueueManager::destroy(self, queue_id, pid)
    }

    fn stats(&self, queue_id: QueueId) -> IpcResult<QueueStats> {
        QueueManager::stats(self, queue_id)
    }
}

impl Clone for QueueManager {
    fn clone(&self) -> Self {
        Self {
            queues: Arc::clone(&self.queues),
            next_seq: Arc::clone(&self.next_seq),
            wait_queue: Arc::clone(&self.wait_queue),
            memory: self.memory.clone(),
            processes: self.processes.clone(),
            scoring: Arc::clone(&self.scoring),
        }
    }
}
