/*!
 * Semaphore Manager
 * Counting semaphores gated by a heuristic deadlock-risk score
 */

mod manager;
mod semaphore;
mod types;

pub use manager::{compute_risk, SemManager};
pub use types::SemStats;
