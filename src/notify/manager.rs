/*!
 * Notification Manager
 *
 * Thin pass-throughs: descriptors hold their counter/mask/interval state and
 * delegate wake delivery to the wait-queue primitive and tick computation to
 * the monotonic clock. The only responsibility this subsystem adds is
 * recording creation events into the scoring context's pattern statistics.
 */

use super::types::NotifyStats;
use crate::core::limits::MAX_NOTIFY_DESCRIPTORS;
use crate::core::sync::WaitQueue;
use crate::core::types::{Pid, Size};
use crate::registry::HandleTable;
use crate::scoring::ScoringContext;
use crate::types::{IpcError, IpcResult, NotifyId, NotifyKind, ObjectKind};
use log::info;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

enum Body {
    Event {
        counter: AtomicU64,
    },
    Timer {
        interval: Duration,
        armed_at: Mutex<Instant>,
    },
    Signal {
        mask: u64,
        pending: AtomicU64,
    },
}

struct Descriptor {
    id: NotifyId,
    owner: Pid,
    body: Body,
}

impl Descriptor {
    fn kind(&self) -> NotifyKind {
        match self.body {
            Body::Event { .. } => NotifyKind::Event,
            Body::Timer { .. } => NotifyKind::Timer,
            Body::Signal { .. } => NotifyKind::Signal,
        }
    }
}

/// Notification descriptor manager
pub struct NotifyManager {
    descriptors: Arc<HandleTable<Arc<Descriptor>>>,
    wait_queue: Arc<WaitQueue<NotifyId>>,
    scoring: Arc<ScoringContext>,
}

impl NotifyManager {
    pub fn new(scoring: Arc<ScoringContext>) -> Self {
        info!(
            "Notification manager initialized (capacity: {})",
            MAX_NOTIFY_DESCRIPTORS
        );
        Self {
            descriptors: Arc::new(HandleTable::new(
                ObjectKind::Notify,
                MAX_NOTIFY_DESCRIPTORS,
            )),
            wait_queue: Arc::new(WaitQueue::new()),
            scoring,
        }
    }

    /// Create an event-counter descriptor
    pub fn create_event(&self, owner: Pid) -> IpcResult<NotifyId> {
        self.create(owner, Body::Event {
            counter: AtomicU64::new(0),
        })
    }

    /// Create an interval-timer descriptor armed at creation
    pub fn create_timer(&self, owner: Pid, interval: Duration) -> IpcResult<NotifyId> {
        self.create(owner, Body::Timer {
            interval,
            armed_at: Mutex::new(Instant::now()),
        })
    }

    /// Create a signal-mask descriptor; only signals in `mask` are recorded
    pub fn create_signal(&self, owner: Pid, mask: u64) -> IpcResult<NotifyId> {
        self.create(owner, Body::Signal {
            mask,
            pending: AtomicU64::new(0),
        })
    }

    fn create(&self, owner: Pid, body: Body) -> IpcResult<NotifyId> {
        let id = self
            .descriptors
            .insert_with(|id| Arc::new(Descriptor { id, owner, body }))?;

        let kind = self.descriptors.get(id)?.kind();
        self.scoring.record_descriptor_creation(kind);
        info!("PID {} created {:?} descriptor {}", owner, kind, id);
        Ok(id)
    }

    /// Add to an event counter and hand delivery to the wake primitive
    pub fn signal_event(&self, id: NotifyId, amount: u64) -> IpcResult<()> {
        match &self.lookup(id, NotifyKind::Event)?.body {
            Body::Event { counter } => {
                counter.fetch_add(amount, Ordering::AcqRel);
                self.wait_queue.wake_all(id);
                Ok(())
            }
            _ => unreachable!(),
        }
    }

    /// Drain an event counter without blocking
    pub fn consume_event(&self, id: NotifyId) -> IpcResult<u64> {
        match &self.lookup(id, NotifyKind::Event)?.body {
            Body::Event { counter } => Ok(counter.swap(0, Ordering::AcqRel)),
            _ => unreachable!(),
        }
    }

    /// Whole intervals elapsed since the timer was armed; tick computation
    /// is the monotonic clock's, nothing is scheduled here
    pub fn timer_ticks(&self, id: NotifyId) -> IpcResult<u64> {
        match &self.lookup(id, NotifyKind::Timer)?.body {
            Body::Timer { interval, armed_at } => {
                if interval.is_zero() {
                    return Ok(0);
                }
                let elapsed = armed_at.lock().elapsed();
                Ok((elapsed.as_nanos() / interval.as_nanos()) as u64)
            }
            _ => unreachable!(),
        }
    }

    /// Re-arm a timer at the current instant
    pub fn rearm_timer(&self, id: NotifyId) -> IpcResult<()> {
        match &self.lookup(id, NotifyKind::Timer)?.body {
            Body::Timer { armed_at, .. } => {
                *armed_at.lock() = Instant::now();
                Ok(())
            }
            _ => unreachable!(),
        }
    }

    /// Record a signal if the mask admits it; returns whether it was recorded
    pub fn raise_signal(&self, id: NotifyId, signal: u32) -> IpcResult<bool> {
        match &self.lookup(id, NotifyKind::Signal)?.body {
            Body::Signal { mask, pending } => {
                let bit = 1u64 << (signal % 64);
                if mask & bit == 0 {
                    return Ok(false);
                }
                pending.fetch_or(bit, Ordering::AcqRel);
                self.wait_queue.wake_all(id);
                Ok(true)
            }
            _ => unreachable!(),
        }
    }

    /// Drain the pending signal bits without blocking
    pub fn take_signals(&self, id: NotifyId) -> IpcResult<u64> {
        match &self.lookup(id, NotifyKind::Signal)?.body {
            Body::Signal { pending, .. } => Ok(pending.swap(0, Ordering::AcqRel)),
            _ => unreachable!(),
        }
    }

    /// Destroy a descriptor
    pub fn destroy(&self, id: NotifyId) -> IpcResult<()> {
        self.descriptors.remove(id)?;
        self.wait_queue.retire(id);
        info!("Destroyed notification descriptor {}", id);
        Ok(())
    }

    /// Get descriptor statistics
    pub fn stats(&self, id: NotifyId) -> IpcResult<NotifyStats> {
        let descriptor = self.descriptors.get(id)?;
        let value = match &descriptor.body {
            Body::Event { counter } => counter.load(Ordering::Acquire),
            Body::Timer { .. } => self.timer_ticks(id)?,
            Body::Signal { pending, .. } => pending.load(Ordering::Acquire),
        };
        Ok(NotifyStats {
            id: descriptor.id,
            kind: descriptor.kind(),
            owner_pid: descriptor.owner,
            value,
        })
    }

    /// Destroy every descriptor owned by a terminated process
    pub fn cleanup_process(&self, pid: Pid) -> Size {
        let mut freed = 0;
        for id in self.descriptors.ids() {
            let owned = self
                .descriptors
                .get(id)
                .map(|descriptor| descriptor.owner == pid)
                .unwrap_or(false);
            if owned && self.destroy(id).is_ok() {
                freed += 1;
            }
        }
        freed
    }

    fn lookup(&self, id: NotifyId, expected: NotifyKind) -> IpcResult<Arc<Descriptor>> {
        let descriptor = self.descriptors.get(id)?;
        if descriptor.kind() != expected {
            return Err(IpcError::InvalidHandle(format!(
                "descriptor {} is {:?}, not {:?}",
                id,
                descriptor.kind(),
                expected
            )));
        }
        Ok(descriptor)
    }
}

impl crate::traits::Notifier for NotifyManager {
    fn create_event(&self, owner: Pid) -> IpcResult<NotifyId> {
        NotifyManager::create_event(self, owner)
    }

    fn create_timer(&self, owner: Pid, interval: Duration) -> IpcResult<NotifyId> {
        NotifyManager::create_timer(self, owner, interval)
    }

    fn create_signal(&self, owner: Pid, mask: u64) -> IpcResult<NotifyId> {
        NotifyManager::create_signal(self, owner, mask)
    }

    fn destroy(&self, notify_id: NotifyId) -> IpcResult<()> {
        NotifyManager::destroy(self, notify_id)
    }
}

impl Clone for NotifyManager {
    fn clone(&self) -> Self {
        Self {
            descriptors: Arc::clone(&self.descriptors),
            wait_queue: Arc::clone(&self.wait_queue),
            scoring: Arc::clone(&self.scoring),
        }
    }
}
