/*!
 * Synchronization Primitives
 * Keyed wait/wake used by the blocking IPC paths
 */

mod wait;

pub use wait::{WaitOutcome, WaitQueue, WakeResult};
