/*!
 * IPC Traits
 * Service interfaces implemented by the concrete managers
 */

use crate::core::types::{MessageType, Pid, Size};
use crate::types::*;
use std::time::Duration;

/// Message queue interface
pub trait MessageQueue: Send + Sync {
    /// Create a new priority-ordered queue
    fn create(&self, owner: Pid) -> IpcResult<QueueId>;

    /// Send a message; the stored priority is computed from the sender
    /// context, payload, queue congestion, and the scoring context
    fn send(
        &self,
        queue_id: QueueId,
        from: Pid,
        mtype: MessageType,
        payload: Vec<u8>,
        priority_hint: Option<i8>,
    ) -> IpcResult<()>;

    /// Receive the highest-priority message matching `type_filter`
    /// (0 is the wildcard); may suspend when `blocking` is set
    fn receive(
        &self,
        queue_id: QueueId,
        pid: Pid,
        type_filter: MessageType,
        blocking: bool,
        timeout: Option<Duration>,
    ) -> IpcResult<crate::queue::ReceivedMessage>;

    /// Destroy a queue (owner only), draining pending payloads
    fn destroy(&self, queue_id: QueueId, pid: Pid) -> IpcResult<()>;

    /// Get queue statistics
    fn stats(&self, queue_id: QueueId) -> IpcResult<crate::queue::QueueStats>;
}

/// Shared memory interface
pub trait SharedMemory: Send + Sync {
    /// Create a segment of `size` bytes (bounded by MAX_SEGMENT_SIZE)
    fn create(&self, size: Size, owner: Pid) -> IpcResult<ShmId>;

    /// Attach, incrementing the reference count
    fn attach(&self, segment_id: ShmId, pid: Pid) -> IpcResult<crate::shm::ShmAttachment>;

    /// Detach, decrementing the reference count; the backing store is
    /// released on the final detach. Detaching an unattached segment is an
    /// error, not a no-op
    fn detach(&self, segment_id: ShmId, pid: Pid) -> IpcResult<()>;

    /// Write into an attached segment
    fn write(&self, segment_id: ShmId, pid: Pid, offset: Size, data: &[u8]) -> IpcResult<()>;

    /// Read from an attached segment
    fn read(&self, segment_id: ShmId, pid: Pid, offset: Size, size: Size) -> IpcResult<Vec<u8>>;

    /// Advisory retention hint from the segment's access heatmap; never
    /// frees or relocates memory itself
    fn predict_access(&self, segment_id: ShmId) -> IpcResult<crate::shm::PredictionHint>;

    /// Get segment statistics
    fn stats(&self, segment_id: ShmId) -> IpcResult<crate::shm::ShmStats>;
}

/// Counting semaphore interface
pub trait CountingSemaphore: Send + Sync {
    /// Create a semaphore with an initial count
    fn create(&self, initial_count: u64, owner: Pid) -> IpcResult<SemId>;

    /// `delta < 0` acquires (may suspend, may be rejected with
    /// DeadlockRisk); `delta > 0` releases and never blocks
    fn operate(
        &self,
        sem_id: SemId,
        pid: Pid,
        delta: i64,
        timeout: Option<Duration>,
    ) -> IpcResult<()>;

    /// Deliver cancellation to blocked acquirers; returns waiters signalled
    fn interrupt(&self, sem_id: SemId) -> IpcResult<usize>;

    /// Destroy a semaphore (owner only)
    fn destroy(&self, sem_id: SemId, pid: Pid) -> IpcResult<()>;

    /// Get semaphore statistics
    fn stats(&self, sem_id: SemId) -> IpcResult<crate::sem::SemStats>;
}

/// Pipe communication interface
pub trait PipeChannel: Send + Sync {
    /// Create a pipe; the initial buffer is sized by the access predictor
    fn create(&self, reader_pid: Pid, writer_pid: Pid) -> IpcResult<crate::pipe::PipeEnds>;

    /// Write to the pipe's write end
    fn write(&self, pipe_id: PipeId, pid: Pid, data: &[u8]) -> IpcResult<Size>;

    /// Read from the pipe's read end; an empty result on a closed pipe is EOF
    fn read(&self, pipe_id: PipeId, pid: Pid, size: Size) -> IpcResult<Vec<u8>>;

    /// Close a pipe endpoint
    fn close(&self, pipe_id: PipeId, pid: Pid) -> IpcResult<()>;

    /// Destroy a pipe
    fn destroy(&self, pipe_id: PipeId) -> IpcResult<()>;

    /// Get pipe statistics
    fn stats(&self, pipe_id: PipeId) -> IpcResult<crate::pipe::PipeStats>;
}

/// Notification descriptor interface
pub trait Notifier: Send + Sync {
    /// Create an event-counter descriptor
    fn create_event(&self, owner: Pid) -> IpcResult<NotifyId>;

    /// Create an interval-timer descriptor
    fn create_timer(&self, owner: Pid, interval: Duration) -> IpcResult<NotifyId>;

    /// Create a signal-mask descriptor
    fn create_signal(&self, owner: Pid, mask: u64) -> IpcResult<NotifyId>;

    /// Destroy a descriptor
    fn destroy(&self, notify_id: NotifyId) -> IpcResult<()>;
}

/// IPC cleanup interface
pub trait IpcCleanup: Send + Sync {
    /// Release all IPC resources held by a terminated process
    fn cleanup_process(&self, pid: Pid) -> Size;

    /// Get global backing-store usage across all managers
    fn global_memory_usage(&self) -> Size;
}
