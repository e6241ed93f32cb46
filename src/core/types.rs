/*!
 * Core Types
 * Common type aliases used across the subsystem
 */

/// Process ID type
pub type Pid = u32;

/// Address type for memory operations (simulated address space)
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Timestamp in microseconds since an arbitrary monotonic origin
pub type Timestamp = u64;

/// Message priority tier (0-100, higher dequeues first)
pub type Priority = u8;

/// Message type selector; `0` is the wildcard filter
pub type MessageType = u32;

/// Monotonic per-queue insertion sequence, used for FIFO tie-breaks
pub type Sequence = u64;
