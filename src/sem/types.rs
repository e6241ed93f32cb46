/*!
 * Semaphore Types
 * Statistics snapshot
 */

use crate::core::types::{Pid, Size};
use crate::types::SemId;
use serde::{Deserialize, Serialize};

/// Semaphore statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SemStats {
    pub id: SemId,
    pub owner_pid: Pid,
    pub count: u64,
    pub waiters: Size,
    /// Risk score computed on the most recent blocking acquisition attempt
    pub risk_score: u8,
    pub last_release_age_ms: u64,
}
