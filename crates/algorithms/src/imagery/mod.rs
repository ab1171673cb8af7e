//! Imagery analysis algorithms
//!
//! - Normalized difference: generic two-band index, NDVI
//! - Threshold: index to 0/1 mask with no-data preserved

mod indices;
mod threshold;

pub use indices::{ndvi, normalized_difference, Ndvi};
pub use threshold::{threshold, Threshold, ThresholdParams};
