/*!
 * Memory Module
 * Scoped allocator with tracked regions and unified accounting
 */

mod manager;

pub use manager::{MemoryError, MemoryManager};
