/*!
 * Process Identity Lookup
 * External collaborator supplying identity, scheduling class, and footprint
 * hints consumed by the priority and risk heuristics
 */

use super::types::{Pid, Size};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scheduling class of a registered process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingClass {
    Idle,
    Background,
    Normal,
    Elevated,
    Realtime,
}

impl SchedulingClass {
    /// Elevated and realtime senders receive the priority boost
    #[inline]
    #[must_use]
    pub const fn is_elevated(&self) -> bool {
        matches!(self, SchedulingClass::Elevated | SchedulingClass::Realtime)
    }
}

/// Identity record for one process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub sched_class: SchedulingClass,
    /// Set when the process has begun teardown; acquires from exiting
    /// contexts raise the deadlock-risk score
    pub exiting: bool,
    /// Approximate address-space footprint, used by the pipe buffer predictor
    pub memory_bytes: Size,
}

impl ProcessInfo {
    fn unknown(pid: Pid) -> Self {
        Self {
            pid,
            name: String::new(),
            sched_class: SchedulingClass::Normal,
            exiting: false,
            memory_bytes: 0,
        }
    }
}

/// Process directory
///
/// Lookup-only from the managers' perspective; registration is driven by the
/// embedding process table. Unregistered pids resolve to a normal,
/// non-exiting profile so heuristics degrade to their base values.
pub struct ProcessDirectory {
    processes: Arc<DashMap<Pid, ProcessInfo, RandomState>>,
}

impl ProcessDirectory {
    pub fn new() -> Self {
        Self {
            processes: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    pub fn register(&self, pid: Pid, name: impl Into<String>, sched_class: SchedulingClass) {
        self.processes.insert(
            pid,
            ProcessInfo {
                pid,
                name: name.into(),
                sched_class,
                exiting: false,
                memory_bytes: 0,
            },
        );
    }

    pub fn deregister(&self, pid: Pid) {
        self.processes.remove(&pid);
    }

    pub fn set_exiting(&self, pid: Pid) {
        if let Some(mut info) = self.processes.get_mut(&pid) {
            info.exiting = true;
        }
    }

    pub fn set_memory_footprint(&self, pid: Pid, bytes: Size) {
        if let Some(mut info) = self.processes.get_mut(&pid) {
            info.memory_bytes = bytes;
        }
    }

    /// Resolve a pid to its identity record, defaulting unknown pids
    #[must_use]
    pub fn lookup(&self, pid: Pid) -> ProcessInfo {
        self.processes
            .get(&pid)
            .map(|info| info.clone())
            .unwrap_or_else(|| ProcessInfo::unknown(pid))
    }

    #[inline]
    #[must_use]
    pub fn is_elevated(&self, pid: Pid) -> bool {
        self.processes
            .get(&pid)
            .map(|info| info.sched_class.is_elevated())
            .unwrap_or(false)
    }

    #[inline]
    #[must_use]
    pub fn is_exiting(&self, pid: Pid) -> bool {
        self.processes
            .get(&pid)
            .map(|info| info.exiting)
            .unwrap_or(false)
    }

    #[inline]
    #[must_use]
    pub fn memory_footprint(&self, pid: Pid) -> Size {
        self.processes
            .get(&pid)
            .map(|info| info.memory_bytes)
            .unwrap_or(0)
    }
}

impl Default for ProcessDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ProcessDirectory {
    fn clone(&self) -> Self {
        Self {
            processes: Arc::clone(&self.processes),
        }
    }
}
