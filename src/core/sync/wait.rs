/*!
 * Wait Queue
 *
 * Keyed suspend/wake primitive consumed by the blocking receive and acquire
 * paths. One slot per key; a slot carries a condvar plus a count of pending
 * wake tokens.
 *
 * Tokens are sticky: a wake delivered between a caller's predicate check and
 * its park is retained and consumed by the next `wait`, so wakeups are never
 * lost. The cost is an occasional spurious wakeup, which callers absorb by
 * rechecking their predicate.
 */

use crate::core::limits::WAKE_TOKEN_CAP;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a `wait` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A wake token was consumed
    Woken,
    /// The timeout elapsed with no wake
    TimedOut,
    /// An external cancellation was delivered while parked
    Interrupted,
}

/// Result of a wake call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// At least this many waiters were notified
    Woken(usize),
    /// No waiter was parked; the token is retained for the next arrival
    NoWaiters,
}

struct SlotState {
    wake_tokens: usize,
    interrupt_epoch: u64,
}

struct WaitSlot {
    state: Mutex<SlotState>,
    condvar: Condvar,
    waiters: AtomicUsize,
}

impl WaitSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                wake_tokens: 0,
                interrupt_epoch: 0,
            }),
            condvar: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }
}

/// Generic wait queue keyed by object handle
pub struct WaitQueue<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    slots: DashMap<K, Arc<WaitSlot>, RandomState>,
}

impl<K> WaitQueue<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::with_hasher(RandomState::new()),
        }
    }

    fn slot(&self, key: K) -> Arc<WaitSlot> {
        self.slots
            .entry(key)
            .or_insert_with(|| Arc::new(WaitSlot::new()))
            .clone()
    }

    /// Park the calling thread until a wake token, interruption, or timeout.
    ///
    /// `None` waits without bound; the blocking IPC paths always pass their
    /// bounded deadline instead.
    pub fn wait(&self, key: K, timeout: Option<Duration>) -> WaitOutcome {
        let slot = self.slot(key);
        let deadline = timeout.map(|t| Instant::now() + t);

        slot.waiters.fetch_add(1, Ordering::Relaxed);
        let mut state = slot.state.lock();
        let entry_epoch = state.interrupt_epoch;

        let outcome = loop {
            if state.interrupt_epoch != entry_epoch {
                break WaitOutcome::Interrupted;
            }
            if state.wake_tokens > 0 {
                state.wake_tokens -= 1;
                break WaitOutcome::Woken;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        break WaitOutcome::TimedOut;
                    }
                    if slot.condvar.wait_until(&mut state, deadline).timed_out() {
                        // One last look: a wake or interrupt may have landed
                        // exactly at the deadline
                        if state.interrupt_epoch != entry_epoch {
                            break WaitOutcome::Interrupted;
                        }
                        if state.wake_tokens > 0 {
                            state.wake_tokens -= 1;
                            break WaitOutcome::Woken;
                        }
                        break WaitOutcome::TimedOut;
                    }
                }
                None => slot.condvar.wait(&mut state),
            }
        };

        drop(state);
        slot.waiters.fetch_sub(1, Ordering::Relaxed);
        outcome
    }

    /// Deposit one wake token and notify a single parked waiter
    pub fn wake_one(&self, key: K) -> WakeResult {
        let slot = self.slot(key);
        let waiting = slot.waiters.load(Ordering::Relaxed);
        {
            let mut state = slot.state.lock();
            if state.wake_tokens < WAKE_TOKEN_CAP {
                state.wake_tokens += 1;
            }
        }
        slot.condvar.notify_one();
        if waiting == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(1)
        }
    }

    /// Notify every parked waiter, one token each
    pub fn wake_all(&self, key: K) -> WakeResult {
        let slot = self.slot(key);
        let waiting = slot.waiters.load(Ordering::Relaxed);
        {
            let mut state = slot.state.lock();
            state.wake_tokens = (state.wake_tokens + waiting.max(1)).min(WAKE_TOKEN_CAP);
        }
        slot.condvar.notify_all();
        if waiting == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(waiting)
        }
    }

    /// Deliver cancellation to every waiter currently parked on `key`.
    ///
    /// Waiters observe the epoch bump under the slot lock, so interruption is
    /// atomic with respect to wake delivery: a waiter returns either Woken
    /// (token consumed) or Interrupted, never both.
    pub fn interrupt_all(&self, key: K) -> usize {
        let slot = self.slot(key);
        let waiting = slot.waiters.load(Ordering::Relaxed);
        {
            let mut state = slot.state.lock();
            state.interrupt_epoch += 1;
        }
        slot.condvar.notify_all();
        waiting
    }

    /// Approximate count of parked waiters, for diagnostics and risk inputs
    #[must_use]
    pub fn waiter_count(&self, key: K) -> usize {
        self.slots
            .get(&key)
            .map(|slot| slot.waiters.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Drop the slot for a destroyed object after interrupting its waiters
    pub fn retire(&self, key: K) {
        self.interrupt_all(key);
        self.slots.remove(&key);
    }
}

impl<K> Default for WaitQueue<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
