//! # greensat core
//!
//! Core types, traits and I/O for the greensat green-space pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform` / `GridSpec`: georeferencing and snapped working grids
//! - `CRS`: EPSG-coded coordinate reference systems with UTM/WGS84 projection
//! - `Region`: named city boundary polygons and their rasterization
//! - Native GeoTIFF reading and writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::{Projector, CRS};
pub use error::{Error, Result};
pub use raster::{Extent, GeoTransform, GridSpec, Raster, RasterElement};
pub use vector::Region;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Extent, GeoTransform, GridSpec, Raster, RasterElement};
    pub use crate::vector::Region;
    pub use crate::Algorithm;
}

/// Core trait for the per-raster stages of the pipeline.
///
/// Stages are pure functions that transform input rasters according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
