/*!
 * Adaptive IPC Subsystem
 *
 * Message queues, shared memory, semaphores, pipes, and notification
 * descriptors over shared handle tables, with a lightweight scoring layer
 * biasing message ordering, buffer sizing, and lock-acquisition admission.
 *
 * The deadlock-risk gate and the retention hints are heuristics: they bias
 * decisions, they do not enforce correctness. Callers must not rely on
 * `DeadlockRisk` rejections to prevent all deadlocks.
 */

pub mod core;
pub mod manager;
pub mod memory;
pub mod notify;
pub mod pipe;
pub mod queue;
pub mod registry;
pub mod scoring;
pub mod sem;
pub mod shm;
pub mod traits;
pub mod types;

// Re-exports
pub use crate::core::{ProcessDirectory, ProcessInfo, SchedulingClass};
pub use manager::IpcManager;
pub use memory::{MemoryError, MemoryManager};
pub use notify::{NotifyManager, NotifyStats};
pub use pipe::{PipeEnds, PipeError, PipeManager, PipeStats};
pub use queue::{QueueManager, QueueStats, ReceivedMessage, TYPE_WILDCARD};
pub use registry::allocation_ops;
pub use scoring::{ScoringContext, ScoringSnapshot};
pub use sem::{compute_risk, SemManager, SemStats};
pub use shm::{PredictionHint, ShmAttachment, ShmError, ShmManager, ShmStats};
pub use types::{IpcError, IpcResult, NotifyId, NotifyKind, ObjectKind, PipeId, QueueId, SemId, ShmId};
