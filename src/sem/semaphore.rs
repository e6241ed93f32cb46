/*!
 * Semaphore Object
 * Count, waiter list, and release-pattern record behind the per-object lock
 */

use crate::core::types::Pid;
use crate::types::SemId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

// Release intervals kept for the risk estimator
const RELEASE_PATTERN_WINDOW: usize = 8;

pub(super) struct SemInner {
    pub count: u64,
    /// FIFO list of blocked acquirers; entries are removed by the waiting
    /// thread itself, under this lock, whatever way its wait ended
    pub waiters: VecDeque<Pid>,
    pub last_release: Instant,
    pub release_intervals: VecDeque<Duration>,
    pub last_risk: u8,
    /// Set when the admission gate rejected the latest attempt; consumed by
    /// the next release to grade the gate's prediction
    pub gate_rejected: bool,
}

impl SemInner {
    /// Mean of the recorded release intervals, if any
    pub fn mean_release_interval(&self) -> Option<Duration> {
        if self.release_intervals.is_empty() {
            return None;
        }
        let total: Duration = self.release_intervals.iter().sum();
        Some(total / self.release_intervals.len() as u32)
    }

    pub fn record_release(&mut self, interval: Duration) {
        if self.release_intervals.len() >= RELEASE_PATTERN_WINDOW {
            self.release_intervals.pop_front();
        }
        self.release_intervals.push_back(interval);
        self.last_release = Instant::now();
    }
}

pub(super) struct Semaphore {
    pub id: SemId,
    pub owner: Pid,
    pub inner: Mutex<SemInner>,
}

impl Semaphore {
    pub fn new(id: SemId, owner: Pid, initial_count: u64) -> Self {
        Self {
            id,
            owner,
            inner: Mutex::new(SemInner {
                count: initial_count,
                waiters: VecDeque::new(),
                last_release: Instant::now(),
                release_intervals: VecDeque::new(),
                last_risk: 0,
                gate_rejected: false,
            }),
        }
    }
}
