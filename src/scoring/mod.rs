/*!
 * Scoring Module
 * Shared heuristic state consulted by every manager
 */

mod context;

pub use context::{ScoringContext, ScoringSnapshot, SCORE_DIMENSIONS};
