//! # greensat pipeline
//!
//! Green-space rasters from Sentinel-2: per-scene cloud and shadow masking,
//! a median composite over a date range, NDVI, a threshold, and one
//! clipped GeoTIFF per city.
//!
//! Cities are organized in groups sharing a threshold (and optionally a
//! date range). Within a group every city runs independently, so one city
//! failing does not stop the others; the outcome of each is collected in a
//! [`RunReport`].
//!
//! ```text
//! catalog ──select──▶ SR ⋈ probability ⋈ L1C ──mask──▶ median ──▶ NDVI ──▶ ≥ t ──▶ GeoTIFF
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod masker;
pub mod report;
pub mod run;

pub use compositor::{check_bands, composite, Composite};
pub use config::{
    CollectionSpec, CollectionsConfig, CompositeConfig, CrsChoice, ExportConfig, GroupConfig, MaskBands,
    MaskingConfig, MissingAzimuthPolicy, PipelineConfig, RegionConfig,
};
pub use error::{PipelineError, Result};
pub use export::{export_grid, export_region, ExportArtifact, ExportContext, ExportMetadata};
pub use masker::{mask_scene, MaskWindow, SceneMask};
pub use report::{RegionReport, RegionStatus, RunReport, SceneCounts};
pub use run::{green_space, prepare_scenes, run, Pipeline, PreparedScenes};
