/*!
 * Registry Module
 * Capacity-bounded handle tables shared by every manager
 */

mod table;

pub use table::{allocation_ops, HandleTable};
