/*!
 * Core Module
 * Shared types, limits, process identity, and synchronization primitives
 */

pub mod limits;
pub mod process;
pub mod sync;
pub mod types;

pub use process::{ProcessDirectory, ProcessInfo, SchedulingClass};
pub use sync::{WaitOutcome, WaitQueue, WakeResult};
