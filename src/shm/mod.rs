/*!
 * Shared Memory Manager
 * Reference-counted segments with access heatmaps and retention hints
 */

mod manager;
mod segment;
mod types;

pub use manager::ShmManager;
pub use types::{PredictionHint, ShmAttachment, ShmError, ShmStats};
