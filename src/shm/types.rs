/*!
 * Shared Memory Types
 * Errors, attachment tokens, hints, and statistics
 */

use crate::core::types::{Address, Pid, Size};
use crate::types::{IpcError, ShmId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shared memory error types
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum ShmError {
    /// Segment not found
    #[error("segment not found: {0}")]
    NotFound(ShmId),

    /// Invalid size
    #[error("invalid segment size: {0}")]
    InvalidSize(String),

    /// Segment size exceeds maximum allowed
    #[error("segment size exceeds limit: requested {requested}, max {max}")]
    SizeExceeded { requested: Size, max: Size },

    /// Access outside the segment bounds
    #[error("invalid range: offset {offset}, len {len}, segment size {segment_size}")]
    InvalidRange {
        offset: Size,
        len: Size,
        segment_size: Size,
    },

    /// Caller is not attached, or the segment has no attachments left
    #[error("PID {pid} not attached to segment {id}")]
    NotAttached { id: ShmId, pid: Pid },

    /// Segment still has live attachments
    #[error("segment {id} busy: {ref_count} attachments")]
    Busy { id: ShmId, ref_count: Size },

    /// Segment table capacity reached
    #[error("segment limit exceeded: {0}")]
    LimitExceeded(String),

    /// Backing-store allocation failed
    #[error("backing allocation failed: {0}")]
    AllocationFailed(String),
}

impl From<ShmError> for IpcError {
    fn from(err: ShmError) -> Self {
        match err {
            ShmError::NotFound(id) => {
                IpcError::InvalidHandle(format!("shmem segment {} not found", id))
            }
            ShmError::InvalidSize(msg) => IpcError::ResourceExhausted(msg),
            ShmError::SizeExceeded { requested, max } => IpcError::ResourceExhausted(format!(
                "segment size exceeds limit: requested {}, max {}",
                requested, max
            )),
            ShmError::InvalidRange {
                offset,
                len,
                segment_size,
            } => IpcError::InvalidHandle(format!(
                "range out of segment: offset {}, len {}, segment size {}",
                offset, len, segment_size
            )),
            ShmError::NotAttached { id, pid } => {
                IpcError::InvalidHandle(format!("PID {} not attached to segment {}", pid, id))
            }
            ShmError::Busy { id, ref_count } => IpcError::InvalidHandle(format!(
                "segment {} still attached ({} references)",
                id, ref_count
            )),
            ShmError::LimitExceeded(msg) => IpcError::ResourceExhausted(msg),
            ShmError::AllocationFailed(msg) => IpcError::AllocationFailure(msg),
        }
    }
}

/// Retention hint from the access heatmap; advisory only, never frees or
/// relocates memory itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionHint {
    Retain,
    Evict,
}

/// Mapped reference handed back by attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShmAttachment {
    pub id: ShmId,
    pub address: Address,
    pub size: Size,
}

/// Shared memory segment statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ShmStats {
    pub id: ShmId,
    pub size: Size,
    pub owner_pid: Pid,
    pub ref_count: Size,
    pub attached_pids: Vec<Pid>,
    pub heatmap_sum: u32,
    pub hint: PredictionHint,
}
