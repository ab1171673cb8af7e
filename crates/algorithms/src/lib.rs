//! # greensat algorithms
//!
//! Per-raster kernels used by the green-space pipeline.
//!
//! ## Available Algorithm Categories
//!
//! - **cloud**: cloud displacement index, cloud condition, directional
//!   distance transform for shadow projection
//! - **morphology**: binary erosion / dilation of 0/1 masks
//! - **resample**: nearest / max resampling onto a target grid
//! - **imagery**: normalized difference, NDVI, thresholding
//! - **statistics**: per-pixel median over a stack, percentiles

pub mod cloud;
pub mod imagery;
pub mod mask;
pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod resample;
pub mod statistics;

mod common;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cloud::{
        cloud_condition, cloud_displacement_index, directional_distance, shadow_projection_angle,
        CloudParams,
    };
    pub use crate::imagery::{ndvi, normalized_difference, threshold, Ndvi, Threshold, ThresholdParams};
    pub use crate::morphology::{clean_mask, dilate, erode, Dilate, Erode, MorphologyParams, StructuringElement};
    pub use crate::resample::{resample, Resampling};
    pub use crate::statistics::{median, median_of_stack, percentile, percentile_of_values};
    pub use greensat_core::prelude::*;
}
