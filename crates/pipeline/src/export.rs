//! Per-city export of the green-space raster

use crate::config::{ExportConfig, RegionConfig};
use crate::error::{PipelineError, Result};
use greensat_algorithms::mask::{self, NODATA};
use greensat_algorithms::resample::{resample, Resampling};
use greensat_core::io::write_mask_geotiff;
use greensat_core::vector::rasterize_mask;
use greensat_core::{GridSpec, Raster, Region, CRS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Export grid of `region`: its bounding box in `crs` snapped to `scale`.
///
/// Fails with [`PipelineError::Export`] when the grid holds more than
/// `max_pixels` cells.
pub fn export_grid(region: &Region, crs: CRS, config: &ExportConfig) -> Result<GridSpec> {
    let extent = region.projected_extent(&crs)?;
    let grid = GridSpec::covering(&extent, config.scale, crs)?;
    let pixels = grid.len() as u64;
    if pixels > config.max_pixels {
        return Err(PipelineError::Export {
            region: region.name().to_string(),
            reason: format!("{} pixels exceed the cap of {}", pixels, config.max_pixels),
        });
    }
    Ok(grid)
}

/// Sidecar written next to each exported raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub description: String,
    pub region: String,
    pub crs: String,
    pub scale: f64,
    /// `[min_x, min_y, max_x, max_y]` in `crs`
    pub extent: [f64; 4],
    pub rows: usize,
    pub cols: usize,
    pub threshold: f64,
    pub date_range: String,
    pub green_pixels: usize,
    pub not_green_pixels: usize,
    pub nodata_pixels: usize,
    pub scenes: Vec<String>,
}

/// Files written for one region
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub raster: PathBuf,
    pub sidecar: PathBuf,
    pub metadata: ExportMetadata,
}

/// Run facts recorded in the sidecar
#[derive(Debug, Clone, Default)]
pub struct ExportContext {
    pub threshold: f64,
    pub date_range: String,
    pub scenes: Vec<String>,
}

/// Write `green` for one region to `<output>/<folder>/<prefix>.tif` plus a
/// JSON sidecar.
///
/// `green` is resampled onto the export grid when it lies on another grid.
/// Pixels outside the region polygon become no-data when clipping is on.
pub fn export_region(
    green: &Raster<u8>,
    region: &Region,
    region_config: &RegionConfig,
    crs: CRS,
    config: &ExportConfig,
    output: &Path,
    context: &ExportContext,
) -> Result<ExportArtifact> {
    let grid = export_grid(region, crs, config)?;
    let mut raster = if green.grid().as_ref() == Some(&grid) {
        green.clone()
    } else {
        resample(green, &grid, Resampling::Nearest)?
    };

    if config.clip_to_region {
        let inside = rasterize_mask(&region.project(&crs)?, &grid);
        for (v, &flag) in raster.data_mut().iter_mut().zip(inside.data().iter()) {
            if !mask::is_set(flag) {
                *v = NODATA;
            }
        }
    }
    raster.set_nodata(Some(NODATA));

    let export_error = |reason: String| PipelineError::Export {
        region: region.name().to_string(),
        reason,
    };
    let dir = output.join(&config.folder);
    std::fs::create_dir_all(&dir).map_err(|e| export_error(format!("cannot create {}: {}", dir.display(), e)))?;

    let path = dir.join(format!("{}.tif", region_config.file_name_prefix));
    write_mask_geotiff(&raster, &path).map_err(|e| export_error(format!("cannot write {}: {}", path.display(), e)))?;

    let extent = grid.extent();
    let metadata = ExportMetadata {
        description: region_config.description.clone(),
        region: region.name().to_string(),
        crs: crs.identifier(),
        scale: config.scale,
        extent: [extent.min_x, extent.min_y, extent.max_x, extent.max_y],
        rows: grid.rows(),
        cols: grid.cols(),
        threshold: context.threshold,
        date_range: context.date_range.clone(),
        green_pixels: raster.count_where(|v| v == mask::SET),
        not_green_pixels: raster.count_where(|v| v == mask::CLEAR),
        nodata_pixels: raster.count_where(|v| !mask::is_valid(v)),
        scenes: context.scenes.clone(),
    };

    let sidecar = dir.join(format!("{}.json", region_config.file_name_prefix));
    std::fs::write(&sidecar, serde_json::to_string_pretty(&metadata)?)
        .map_err(|e| export_error(format!("cannot write {}: {}", sidecar.display(), e)))?;

    tracing::info!(
        "{}: wrote {} ({}x{}, {} green)",
        region.name(),
        path.display(),
        grid.cols(),
        grid.rows(),
        metadata.green_pixels
    );
    Ok(ExportArtifact {
        raster: path,
        sidecar,
        metadata,
    })
}
