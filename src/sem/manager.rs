/*!
 * Semaphore Manager
 * Acquire/release operations with the deadlock-risk admission gate
 */

use super::semaphore::Semaphore;
use super::types::SemStats;
use crate::core::limits::{
    DEFAULT_ACQUIRE_TIMEOUT, MAX_SEMAPHORES, RELEASE_STALENESS_THRESHOLD, RISK_EXITING_WEIGHT,
    RISK_REJECT_THRESHOLD, RISK_STALE_RELEASE_WEIGHT, RISK_WAITERS_WEIGHT,
};
use crate::core::process::ProcessDirectory;
use crate::core::sync::WaitOutcome;
use crate::core::sync::WaitQueue;
use crate::core::types::{Pid, Size};
use crate::registry::HandleTable;
use crate::scoring::ScoringContext;
use crate::types::{IpcError, IpcResult, ObjectKind, SemId};
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Heuristic deadlock-risk score for one blocking acquisition attempt.
///
/// `wait_list_depth` counts the prospective waiter itself. The score is
/// advisory admission control, not a correctness guarantee: false positives
/// and false negatives are both possible and acceptable.
#[must_use]
pub fn compute_risk(
    caller_exiting: bool,
    wait_list_depth: usize,
    release_stale: bool,
    adjustment: f32,
) -> u8 {
    let mut risk = 0i32;
    if caller_exiting {
        risk += RISK_EXITING_WEIGHT;
    }
    if wait_list_depth > 0 {
        risk += RISK_WAITERS_WEIGHT;
    }
    if release_stale {
        risk += RISK_STALE_RELEASE_WEIGHT;
    }
    risk += adjustment.round() as i32;
    risk.clamp(0, 100) as u8
}

/// Semaphore manager
pub struct SemManager {
    semaphores: Arc<HandleTable<Arc<Semaphore>>>,
    wait_queue: Arc<WaitQueue<SemId>>,
    processes: ProcessDirectory,
    scoring: Arc<ScoringContext>,
}

impl SemManager {
    pub fn new(processes: ProcessDirectory, scoring: Arc<ScoringContext>) -> Self {
        info!(
            "Semaphore manager initialized (capacity: {}, risk threshold: {})",
            MAX_SEMAPHORES, RISK_REJECT_THRESHOLD
        );
        Self {
            semaphores: Arc::new(HandleTable::new(ObjectKind::Semaphore, MAX_SEMAPHORES)),
            wait_queue: Arc::new(WaitQueue::new()),
            processes,
            scoring,
        }
    }

    /// Create a semaphore with an initial count
    pub fn create(&self, initial_count: u64, owner: Pid) -> IpcResult<SemId> {
        let sem_id = self
            .semaphores
            .insert_with(|id| Arc::new(Semaphore::new(id, owner, initial_count)))?;

        info!(
            "PID {} created semaphore {} (count: {})",
            owner, sem_id, initial_count
        );
        Ok(sem_id)
    }

    /// Perform a semaphore operation: `delta < 0` acquires and may block,
    /// `delta > 0` releases and never blocks, `delta == 0` is a no-op
    pub fn operate(
        &self,
        sem_id: SemId,
        pid: Pid,
        delta: i64,
        timeout: Option<Duration>,
    ) -> IpcResult<()> {
        if delta > 0 {
            self.release(sem_id, delta as u64)
        } else if delta < 0 {
            self.acquire(sem_id, pid, delta.unsigned_abs(), timeout)
        } else {
            Ok(())
        }
    }

    fn release(&self, sem_id: SemId, units: u64) -> IpcResult<()> {
        let sem = self.semaphores.get(sem_id)?;

        let (interval, gate_rejected) = {
            let mut inner = sem.inner.lock();
            inner.count = inner.count.saturating_add(units);
            let interval = inner.last_release.elapsed();
            inner.record_release(interval);
            let rejected = std::mem::take(&mut inner.gate_rejected);
            (interval, rejected)
        };

        // Release-pattern record feeds future risk estimates only
        self.scoring.record_release_pattern(interval, gate_rejected);

        // One handoff per released unit, never a broadcast
        for _ in 0..units {
            self.wait_queue.wake_one(sem_id);
        }

        debug!("Released {} unit(s) on semaphore {}", units, sem_id);
        Ok(())
    }

    fn acquire(
        &self,
        sem_id: SemId,
        pid: Pid,
        units: u64,
        timeout: Option<Duration>,
    ) -> IpcResult<()> {
        let start = Instant::now();
        let timeout = timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT);
        let deadline = start + timeout;

        loop {
            let sem = self.semaphores.get(sem_id)?;

            // Fast path and risk inputs under the object lock
            let (depth, since_release, mean_interval) = {
                let mut inner = sem.inner.lock();
                if inner.count >= units {
                    inner.count -= units;
                    return Ok(());
                }
                (
                    inner.waiters.len(),
                    inner.last_release.elapsed(),
                    inner.mean_release_interval(),
                )
            };

            // The scoring lock is only taken after the object lock is
            // dropped; the depth counts this prospective waiter
            let adjustment = self
                .scoring
                .risk_adjustment(depth + 1, since_release, mean_interval);
            let risk = compute_risk(
                self.processes.is_exiting(pid),
                depth + 1,
                since_release > RELEASE_STALENESS_THRESHOLD,
                adjustment,
            );

            let now = Instant::now();
            {
                let mut inner = sem.inner.lock();
                inner.last_risk = risk;

                if risk > RISK_REJECT_THRESHOLD {
                    inner.gate_rejected = true;
                    debug!(
                        "Rejected acquire on semaphore {} for PID {} (risk {})",
                        sem_id, pid, risk
                    );
                    return Err(IpcError::DeadlockRisk { score: risk });
                }

                // Re-check under the same lock before parking; a release may
                // have landed while the score was computed
                if inner.count >= units {
                    inner.count -= units;
                    return Ok(());
                }

                if now >= deadline {
                    return Err(Self::timeout_error(start, timeout));
                }
                inner.waiters.push_back(pid);
            }

            let outcome = self.wait_queue.wait(sem_id, Some(deadline - now));

            // Leave the wait list under the object lock, whatever way the
            // wait ended, so wake delivery never observes a stale entry
            {
                let mut inner = sem.inner.lock();
                if let Some(position) = inner.waiters.iter().position(|waiter| *waiter == pid) {
                    inner.waiters.remove(position);
                }
            }

            match outcome {
                WaitOutcome::Woken => continue,
                WaitOutcome::TimedOut => return Err(Self::timeout_error(start, timeout)),
                WaitOutcome::Interrupted => return Err(IpcError::Interrupted),
            }
        }
    }

    /// Deliver an external cancellation to every blocked acquirer
    pub fn interrupt(&self, sem_id: SemId) -> IpcResult<usize> {
        self.semaphores.get(sem_id)?;
        Ok(self.wait_queue.interrupt_all(sem_id))
    }

    /// Destroy a semaphore (owner only); blocked acquirers are interrupted
    pub fn destroy(&self, sem_id: SemId, pid: Pid) -> IpcResult<()> {
        let sem = self.semaphores.get(sem_id)?;
        if sem.owner != pid {
            return Err(IpcError::InvalidHandle(format!(
                "semaphore {} not owned by PID {}",
                sem_id, pid
            )));
        }

        self.semaphores.remove(sem_id)?;
        self.wait_queue.retire(sem_id);
        info!("PID {} destroyed semaphore {}", pid, sem_id);
        Ok(())
    }

    /// Get semaphore statistics
    pub fn stats(&self, sem_id: SemId) -> IpcResult<SemStats> {
        let sem = self.semaphores.get(sem_id)?;
        let inner = sem.inner.lock();
        Ok(SemStats {
            id: sem.id,
            owner_pid: sem.owner,
            count: inner.count,
            waiters: inner.waiters.len(),
            risk_score: inner.last_risk,
            last_release_age_ms: inner.last_release.elapsed().as_millis() as u64,
        })
    }

    /// Destroy every semaphore owned by a terminated process
    pub fn cleanup_process(&self, pid: Pid) -> Size {
        let mut freed = 0;
        for sem_id in self.semaphores.ids() {
            let owned = self
                .semaphores
                .get(sem_id)
                .map(|sem| sem.owner == pid)
                .unwrap_or(false);
            if owned && self.destroy(sem_id, pid).is_ok() {
                freed += 1;
            }
        }

        if freed > 0 {
            info!("Cleaned up {} semaphores for PID {}", freed, pid);
        }
        freed
    }

    fn timeout_error(start: Instant, timeout: Duration) -> IpcError {
        IpcError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

impl crate::traits::CountingSemaphore for SemManager {
    fn create(&self, initial_count: u64, owner: Pid) -> IpcResult<SemId> {
        SemManager::create(self, initial_count, owner)
    }

    fn operate(
        &self,
        sem_id: SemId,
        pid: Pid,
        delta: i64,
        timeout: Option<Duration>,
    ) -> IpcResult<()> {
        SemManager::operate(self, sem_id, pid, delta, timeout)
    }

    fn interrupt(&self, sem_id: SemId) -> IpcResult<usize> {
        SemManager::interrupt(self, sem_id)
    }

    fn destroy(&self, sem_id: SemId, pid: Pid) -> IpcResult<()> {
        SemManager::destroy(self, sem_id, pid)
    }

    fn stats(&self, sem_id: SemId) -> IpcResult<SemStats> {
        SemManager::stats(self, sem_id)
    }
}

impl Clone for SemManager {
    fn clone(&self) -> Self {
        Self {
            semaphores: Arc::clone(&self.semaphores),
            wait_queue: Arc::clone(&self.wait_queue),
            processes: self.processes.clone(),
            scoring: Arc::clone(&self.scoring),
        }
    }
}
