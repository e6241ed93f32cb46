/*!
 * Pipe Types
 * Errors, endpoint descriptors, and statistics
 */

use crate::core::types::{Pid, Size};
use crate::types::{IpcError, PipeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipe error types
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum PipeError {
    /// Pipe not found
    #[error("pipe not found: {0}")]
    NotFound(PipeId),

    /// Caller does not hold this end of the pipe
    #[error("PID {pid} does not hold the {end} end of pipe {id}")]
    WrongEnd {
        id: PipeId,
        pid: Pid,
        end: &'static str,
    },

    /// Pipe closed
    #[error("pipe {0} closed")]
    Closed(PipeId),

    /// Buffer full; backpressure is the caller's concern
    #[error("pipe {0} buffer full")]
    Full(PipeId),

    /// No data buffered
    #[error("pipe {0} empty")]
    Empty(PipeId),

    /// Pipe table capacity reached
    #[error("pipe limit exceeded: {0}")]
    LimitExceeded(String),

    /// Buffer allocation failed
    #[error("pipe buffer allocation failed: {0}")]
    AllocationFailed(String),
}

impl From<PipeError> for IpcError {
    fn from(err: PipeError) -> Self {
        match err {
            PipeError::NotFound(id) => IpcError::InvalidHandle(format!("pipe {} not found", id)),
            PipeError::WrongEnd { id, pid, end } => IpcError::InvalidHandle(format!(
                "PID {} does not hold the {} end of pipe {}",
                pid, end, id
            )),
            PipeError::Closed(id) => IpcError::InvalidHandle(format!("pipe {} closed", id)),
            PipeError::Full(id) => {
                IpcError::ResourceExhausted(format!("pipe {} buffer full", id))
            }
            PipeError::Empty(_) => IpcError::NoMatchingMessage,
            PipeError::LimitExceeded(msg) => IpcError::ResourceExhausted(msg),
            PipeError::AllocationFailed(msg) => IpcError::AllocationFailure(msg),
        }
    }
}

/// Endpoint pair returned by create; descriptors are derived from the handle
/// so either side can be passed to an embedding process table independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeEnds {
    pub id: PipeId,
    pub read_fd: u32,
    pub write_fd: u32,
}

impl PipeEnds {
    pub(super) fn for_pipe(id: PipeId) -> Self {
        Self {
            id,
            read_fd: id * 2,
            write_fd: id * 2 + 1,
        }
    }
}

/// Pipe statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipeStats {
    pub id: PipeId,
    pub reader_pid: Pid,
    pub writer_pid: Pid,
    /// Capacity chosen by the buffer predictor at creation
    pub capacity: Size,
    pub buffered: Size,
    /// Total bytes that have flowed through the pipe
    pub flow_bytes: u64,
    pub closed: bool,
}
