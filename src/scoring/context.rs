/*!
 * Scoring Context
 *
 * Process-wide heuristic state behind a single transient lock: fixed linear
 * weight/bias vectors with bounded reinforcement nudging. Consulted for
 * message priority adjustments, deadlock-risk adjustments, and pipe buffer
 * prediction; fed by receive wait samples, release patterns, and descriptor
 * creation events.
 *
 * This is deliberately not a trainable model. Scores are auditable linear
 * combinations, and every adjustment is clamped so the scoring term alone
 * can never push a priority or risk value out of its range.
 *
 * Lock discipline: the internal mutex is acquired only for the duration of
 * one read or update and is never held while an object lock is taken.
 */

use crate::core::limits::{
    CONGESTION_WAIT_THRESHOLD, DEFAULT_PIPE_CAPACITY, LARGE_FOOTPRINT_BYTES, MAX_PIPE_CAPACITY,
    MIN_PIPE_CAPACITY, PATTERN_RING_SIZE, RELEASE_STALENESS_THRESHOLD, RISK_ADJUST_MAX,
    RISK_ADJUST_MIN,
};
use crate::core::types::{MessageType, Size};
use crate::types::{NotifyKind, QueueId};
use ahash::RandomState;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Length of the weight and bias vectors
pub const SCORE_DIMENSIONS: usize = 8;

// Per-queue priority adjustments stay inside this band; at the 0.3 weight of
// the priority formula that is at most ±6 tiers
const QUEUE_ADJUST_LIMIT: f32 = 20.0;

// Smoothing factor for the rolling accuracy estimate
const ACCURACY_EMA_ALPHA: f32 = 0.05;

struct ScoringState {
    weights: [f32; SCORE_DIMENSIONS],
    biases: [f32; SCORE_DIMENSIONS],
    sample_count: u64,
    accuracy_estimate: f32,
    queue_adjustments: HashMap<QueueId, f32, RandomState>,
    recent_types: [MessageType; PATTERN_RING_SIZE],
    ring_pos: usize,
    descriptor_counts: [u64; 3],
}

/// Serializable view of the scoring state, for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringSnapshot {
    pub sample_count: u64,
    pub accuracy_estimate: f32,
    pub tracked_queues: usize,
    pub recent_types: [MessageType; PATTERN_RING_SIZE],
    pub event_descriptors: u64,
    pub timer_descriptors: u64,
    pub signal_descriptors: u64,
}

/// Shared scoring context
pub struct ScoringContext {
    state: Mutex<ScoringState>,
}

impl ScoringContext {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScoringState {
                // Fixed seed coefficients, front-loaded: the leading features
                // (queue depth, staleness) dominate each linear combination
                weights: [0.35, 0.25, 0.15, 0.10, 0.06, 0.04, 0.03, 0.02],
                biases: [0.0; SCORE_DIMENSIONS],
                sample_count: 0,
                accuracy_estimate: 0.5,
                queue_adjustments: HashMap::with_hasher(RandomState::new()),
                recent_types: [0; PATTERN_RING_SIZE],
                ring_pos: 0,
                descriptor_counts: [0; 3],
            }),
        }
    }

    /// Current learned priority adjustment for a queue, in
    /// [-QUEUE_ADJUST_LIMIT, QUEUE_ADJUST_LIMIT]
    #[must_use]
    pub fn queue_priority_adjustment(&self, queue_id: QueueId) -> f32 {
        self.state
            .lock()
            .queue_adjustments
            .get(&queue_id)
            .copied()
            .unwrap_or(0.0)
    }

    /// Feed one observed receive latency back into the per-queue adjustment.
    ///
    /// Long waits nudge the queue's adjustment up so its future messages
    /// score higher; short waits decay it back toward zero.
    pub fn record_queue_wait(&self, queue_id: QueueId, waited: Duration) {
        let congested = waited > CONGESTION_WAIT_THRESHOLD;
        let mut state = self.state.lock();

        let adjustment = state.queue_adjustments.entry(queue_id).or_insert(0.0);
        if congested {
            *adjustment = (*adjustment + 1.5).min(QUEUE_ADJUST_LIMIT);
        } else {
            *adjustment = (*adjustment * 0.9).max(-QUEUE_ADJUST_LIMIT);
        }

        // Treat "the message waited under the congestion threshold" as a
        // correct prediction for the rolling accuracy figure
        let correct = if congested { 0.0 } else { 1.0 };
        state.accuracy_estimate += ACCURACY_EMA_ALPHA * (correct - state.accuracy_estimate);
        state.sample_count += 1;
    }

    /// Shift a received message type into the pattern ring
    pub fn record_message_pattern(&self, mtype: MessageType) {
        let mut state = self.state.lock();
        let pos = state.ring_pos;
        state.recent_types[pos] = mtype;
        state.ring_pos = (pos + 1) % PATTERN_RING_SIZE;
        state.sample_count += 1;
    }

    /// Heuristic adjustment added to the static deadlock-risk sum, clamped
    /// to [RISK_ADJUST_MIN, RISK_ADJUST_MAX].
    ///
    /// Weights are kept non-negative so the estimate stays monotone in the
    /// waiter-depth feature.
    #[must_use]
    pub fn risk_adjustment(
        &self,
        waiters: usize,
        since_last_release: Duration,
        mean_release_interval: Option<Duration>,
    ) -> f32 {
        let staleness = RELEASE_STALENESS_THRESHOLD.as_secs_f32();
        let mut features = [0.0f32; SCORE_DIMENSIONS];
        features[0] = (waiters.min(8) as f32) / 8.0;
        features[1] = (since_last_release.as_secs_f32() / staleness).min(2.0) / 2.0;
        features[2] = mean_release_interval
            .map(|d| (d.as_secs_f32() / staleness).min(1.0))
            .unwrap_or(0.5);

        let state = self.state.lock();
        let raw: f32 = features
            .iter()
            .zip(state.weights.iter().zip(state.biases.iter()))
            .map(|(x, (w, b))| x * w + b)
            .sum();

        (raw * RISK_ADJUST_MAX).clamp(RISK_ADJUST_MIN, RISK_ADJUST_MAX)
    }

    /// Feed a release-pattern observation back into the risk coefficients.
    ///
    /// `gate_rejected` records whether the admission gate fired for the
    /// attempt that preceded this release; a rejection followed by a prompt
    /// release was a false positive and decays the leading weight slightly.
    pub fn record_release_pattern(&self, interval: Duration, gate_rejected: bool) {
        let prompt = interval < RELEASE_STALENESS_THRESHOLD;
        let mut state = self.state.lock();

        if gate_rejected && prompt {
            state.weights[0] = (state.weights[0] - 0.01).max(0.0);
        } else if !gate_rejected && !prompt {
            state.weights[0] = (state.weights[0] + 0.01).min(1.0);
        }

        let correct = if gate_rejected == !prompt { 1.0 } else { 0.0 };
        state.accuracy_estimate += ACCURACY_EMA_ALPHA * (correct - state.accuracy_estimate);
        state.sample_count += 1;
    }

    /// Predicted initial pipe buffer size for a creator with the given
    /// address-space footprint, clamped to the pipe capacity bounds
    #[must_use]
    pub fn predict_buffer_size(&self, footprint: Size) -> Size {
        let predicted = if footprint >= LARGE_FOOTPRINT_BYTES {
            DEFAULT_PIPE_CAPACITY * 4
        } else if footprint >= LARGE_FOOTPRINT_BYTES / 4 {
            DEFAULT_PIPE_CAPACITY * 2
        } else {
            DEFAULT_PIPE_CAPACITY
        };

        self.state.lock().sample_count += 1;
        predicted.clamp(MIN_PIPE_CAPACITY, MAX_PIPE_CAPACITY)
    }

    /// Record a notification descriptor creation for pattern statistics
    pub fn record_descriptor_creation(&self, kind: NotifyKind) {
        let mut state = self.state.lock();
        let slot = match kind {
            NotifyKind::Event => 0,
            NotifyKind::Timer => 1,
            NotifyKind::Signal => 2,
        };
        state.descriptor_counts[slot] += 1;
        state.sample_count += 1;
    }

    /// Drop the learned adjustment for a destroyed queue
    pub fn forget_queue(&self, queue_id: QueueId) {
        self.state.lock().queue_adjustments.remove(&queue_id);
    }

    #[must_use]
    pub fn snapshot(&self) -> ScoringSnapshot {
        let state = self.state.lock();
        ScoringSnapshot {
            sample_count: state.sample_count,
            accuracy_estimate: state.accuracy_estimate,
            tracked_queues: state.queue_adjustments.len(),
            recent_types: state.recent_types,
            event_descriptors: state.descriptor_counts[0],
            timer_descriptors: state.descriptor_counts[1],
            signal_descriptors: state.descriptor_counts[2],
        }
    }
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self::new()
    }
}
