/*!
 * IPC Types
 * Handles, object kinds, and the unified error taxonomy
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// IPC operation result
///
/// # Must Use
/// IPC operations can fail and must be handled to prevent resource leaks
pub type IpcResult<T> = Result<T, IpcError>;

/// Queue handle
pub type QueueId = u32;

/// Shared memory segment handle
pub type ShmId = u32;

/// Semaphore handle
pub type SemId = u32;

/// Pipe handle
pub type PipeId = u32;

/// Notification descriptor handle
pub type NotifyId = u32;

/// Object kind owning a registry slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Queue,
    Shmem,
    Semaphore,
    Pipe,
    Notify,
}

impl ObjectKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Queue => "queue",
            ObjectKind::Shmem => "shmem",
            ObjectKind::Semaphore => "semaphore",
            ObjectKind::Pipe => "pipe",
            ObjectKind::Notify => "notify",
        }
    }
}

/// Notification descriptor flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    Event,
    Timer,
    Signal,
}

/// Unified IPC error type
///
/// Every error is returned directly to the caller; there are no internal
/// retries. `DeadlockRisk` and `Timeout` are retryable-with-backoff
/// conditions; `InvalidHandle` and `ResourceExhausted` indicate programming
/// or capacity errors and should be surfaced, not retried blindly.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum IpcError {
    /// Table or buffer capacity reached
    #[error("IPC resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Backing-store allocation failed
    #[error("IPC allocation failure: {0}")]
    AllocationFailure(String),

    /// Handle not present, wrong kind, or object in a state that cannot
    /// service the request
    #[error("invalid IPC handle: {0}")]
    InvalidHandle(String),

    /// Non-blocking receive found no matching message
    #[error("no matching message")]
    NoMatchingMessage,

    /// Blocking operation deadline elapsed
    #[error("IPC operation timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },

    /// Blocking operation cancelled by an external signal
    #[error("blocking IPC operation interrupted")]
    Interrupted,

    /// Semaphore acquire rejected by the admission heuristic.
    ///
    /// Advisory only: the gate estimates risk, it does not prevent
    /// deadlocks. Callers should back off and retry.
    #[error("semaphore acquire rejected: risk score {score} above threshold")]
    DeadlockRisk { score: u8 },
}
