//! Raster data structures and working grids

mod element;
mod extent;
mod geotransform;
mod grid;
mod grid_spec;
mod neighborhood;

pub use element::RasterElement;
pub use extent::Extent;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use grid_spec::{GridSpec, GridWindow};
pub use neighborhood::Neighborhood;
