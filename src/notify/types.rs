/*!
 * Notification Types
 * Statistics snapshot
 */

use crate::core::types::Pid;
use crate::types::{NotifyId, NotifyKind};
use serde::{Deserialize, Serialize};

/// Notification descriptor statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotifyStats {
    pub id: NotifyId,
    pub kind: NotifyKind,
    pub owner_pid: Pid,
    /// Pending event count, elapsed timer ticks, or pending signal bits,
    /// depending on the descriptor kind
    pub value: u64,
}
