/*!
 * Subsystem Limits and Tunables
 *
 * Centralized location for all capacities, weights, and thresholds.
 * Values include rationale comments; heuristic weights are fixed
 * coefficients, not trained parameters.
 */

use std::time::Duration;

// =============================================================================
// HANDLE TABLE CAPACITIES
// =============================================================================

/// Maximum live message queues
pub const MAX_QUEUES: usize = 256;

/// Maximum live shared memory segments
pub const MAX_SEGMENTS: usize = 128;

/// Maximum live semaphores
pub const MAX_SEMAPHORES: usize = 256;

/// Maximum live pipes
pub const MAX_PIPES: usize = 256;

/// Maximum live notification descriptors
pub const MAX_NOTIFY_DESCRIPTORS: usize = 256;

// =============================================================================
// MESSAGE QUEUE LIMITS
// =============================================================================

/// Maximum message payload size (1MB)
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default per-queue depth before send fails with ResourceExhausted
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

/// Rolling window of per-queue wait samples used for the congestion boost
pub const QUEUE_WAIT_WINDOW: usize = 16;

/// Ring of recent message types fed to the scoring context
pub const PATTERN_RING_SIZE: usize = 4;

// =============================================================================
// PRIORITY HEURISTIC
// =============================================================================

/// Every message starts here before boosts are applied
pub const QUEUE_BASE_PRIORITY: i32 = 50;

/// Boost when the sender's scheduling class is elevated
pub const ELEVATED_SENDER_BOOST: i32 = 20;

/// Boost for payloads below SMALL_PAYLOAD_BYTES (latency-sensitive traffic)
pub const SMALL_PAYLOAD_BOOST: i32 = 10;

/// Payload size under which SMALL_PAYLOAD_BOOST applies
pub const SMALL_PAYLOAD_BYTES: usize = 128;

/// Boost when the queue's rolling average wait exceeds the congestion threshold
pub const CONGESTION_BOOST: i32 = 15;

/// Rolling-average wait above which a queue counts as congested
pub const CONGESTION_WAIT_THRESHOLD: Duration = Duration::from_millis(250);

/// Weight applied to the scoring context's learned per-queue adjustment
pub const SCORING_PRIORITY_WEIGHT: f32 = 0.3;

/// Priority tiers are clamped to [0, MAX_PRIORITY]
pub const MAX_PRIORITY: i32 = 100;

// =============================================================================
// DEADLOCK RISK HEURISTIC
// =============================================================================

/// Risk contribution when the acquiring process is exiting
pub const RISK_EXITING_WEIGHT: i32 = 30;

/// Risk contribution when the wait list is non-empty
pub const RISK_WAITERS_WEIGHT: i32 = 20;

/// Risk contribution when the last release is older than the staleness threshold
pub const RISK_STALE_RELEASE_WEIGHT: i32 = 25;

/// Acquires scoring above this are rejected with DeadlockRisk before parking
pub const RISK_REJECT_THRESHOLD: u8 = 80;

/// Elapsed-since-release above which a semaphore counts as stale
pub const RELEASE_STALENESS_THRESHOLD: Duration = Duration::from_secs(5);

/// Scoring context risk adjustments are clamped to this range
pub const RISK_ADJUST_MIN: f32 = -10.0;
pub const RISK_ADJUST_MAX: f32 = 15.0;

// =============================================================================
// SHARED MEMORY LIMITS
// =============================================================================

/// Maximum segment size (16MB)
pub const MAX_SEGMENT_SIZE: usize = 16 * 1024 * 1024;

/// Buckets in the per-segment access heatmap
pub const HEATMAP_BUCKETS: usize = 16;

/// Heatmap sum above which predict_access returns Retain
pub const HEATMAP_RETAIN_THRESHOLD: u32 = 64;

/// Every N recorded accesses the heatmap is halved, keeping it rolling
pub const HEATMAP_DECAY_INTERVAL: u64 = 256;

// =============================================================================
// PIPE LIMITS
// =============================================================================

/// Smallest predicted pipe buffer (one page)
pub const MIN_PIPE_CAPACITY: usize = 4096;

/// Default pipe buffer when no prediction signal is available (64KB)
pub const DEFAULT_PIPE_CAPACITY: usize = 65536;

/// Maximum pipe buffer (1MB)
pub const MAX_PIPE_CAPACITY: usize = 1024 * 1024;

/// Callers with footprints above this get the large buffer tier
pub const LARGE_FOOTPRINT_BYTES: usize = 64 * 1024 * 1024;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Default blocking receive timeout
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default blocking acquire timeout
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// MEMORY
// =============================================================================

/// Simulated memory pool backing all IPC allocations (512MB)
pub const DEFAULT_MEMORY_POOL: usize = 512 * 1024 * 1024;

/// Pending wake tokens per wait slot saturate here; spurious wakeups beyond
/// this are absorbed by predicate-recheck loops
pub const WAKE_TOKEN_CAP: usize = 1024;
