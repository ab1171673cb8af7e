//! Reductions over pixel values
//!
//! - Per-pixel median across a stack of co-registered rasters
//! - Percentiles of a raster's valid values

mod median;
mod percentile;

pub use median::{median, median_of_stack};
pub use percentile::{percentile, percentile_of_values};
