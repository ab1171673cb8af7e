//! Per-scene cloud and cloud-shadow masking
//!
//! Cloud test, erosion and dilation run at the morphology scale (20 m); the
//! cleaned mask is coarsened to the shadow scale (100 m) and searched toward
//! the sun. Both grids are windows around the region padded by the reach of
//! each step, so clouds just outside a region still mask its edge.

use crate::config::{MaskingConfig, MissingAzimuthPolicy};
use crate::error::{PipelineError, Result};
use greensat_algorithms::cloud::{cloud_condition, cloud_displacement_index, directional_distance, shadow_projection_angle};
use greensat_algorithms::mask::{self, CLEAR, SET};
use greensat_algorithms::morphology::clean_mask;
use greensat_algorithms::resample::{resample, Resampling};
use greensat_catalog::{BandStore, Scene};
use greensat_core::{Extent, GridSpec, Raster, CRS};
use greensat_parallel::TiledProcessor;

/// Working grids of the masker around one region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskWindow {
    /// Cloud test and morphology grid
    pub morphology: GridSpec,
    /// Shadow search grid
    pub shadow: GridSpec,
}

impl MaskWindow {
    /// Windows covering `extent` (in `crs`) plus the reach of the mask.
    pub fn around(extent: &Extent, crs: CRS, config: &MaskingConfig) -> Result<Self> {
        let shadow_pad = config.shadow_reach();
        let morphology_pad = shadow_pad + config.morphology_reach();
        Ok(Self {
            morphology: GridSpec::covering(&extent.buffered(morphology_pad), config.morphology_scale, crs)?,
            shadow: GridSpec::covering(&extent.buffered(shadow_pad), config.shadow_scale, crs)?,
        })
    }
}

/// Where a scene's pixels are cloud or cloud shadow
#[derive(Debug, Clone)]
pub struct SceneMask {
    pub scene_id: String,
    /// Cleaned 0/1 cloud mask on the morphology grid
    pub cloud: Raster<u8>,
    /// Steps to the nearest cloud toward the sun on the shadow grid, NaN
    /// where no cloud is within reach. `None` when the scene has no solar
    /// azimuth.
    pub shadow: Option<Raster<f64>>,
}

impl SceneMask {
    /// Whether the shadow search was skipped
    pub fn shadow_skipped(&self) -> bool {
        self.shadow.is_none()
    }

    /// 0/1 validity of the scene on `grid`: 1 where the pixel is neither
    /// cloud nor within shadow reach of one.
    pub fn validity_on(&self, grid: &GridSpec) -> Result<Raster<u8>> {
        let cloud = resample(&self.cloud, grid, Resampling::Nearest)?;
        let shadow = match &self.shadow {
            Some(distance) => Some(resample(distance, grid, Resampling::Nearest)?),
            None => None,
        };

        let mut validity: Raster<u8> = Raster::on_grid(grid, SET);
        let cloud_data = cloud.data();
        for ((row, col), v) in validity.data_mut().indexed_iter_mut() {
            let clouded = mask::is_set(cloud_data[(row, col)]);
            let shadowed = shadow
                .as_ref()
                .is_some_and(|s| s.data()[(row, col)].is_finite());
            if clouded || shadowed {
                *v = CLEAR;
            }
        }
        Ok(validity)
    }

    /// Fraction of the morphology grid flagged as cloud
    pub fn cloud_fraction(&self) -> f64 {
        let valid = self.cloud.count_where(mask::is_valid);
        if valid == 0 {
            return 0.0;
        }
        self.cloud.count_where(mask::is_set) as f64 / valid as f64
    }
}

/// `band` of `scene` resampled onto `grid`, read only for the grid's
/// footprint. Cells the band does not reach are NaN.
///
/// Any failure to find or read the band is a [`PipelineError::MaskingInput`]
/// for that scene.
pub(crate) fn band_on(scene: &Scene, band: &str, store: &dyn BandStore, grid: &GridSpec) -> Result<Raster<f64>> {
    let unusable = |reason: String| PipelineError::MaskingInput {
        scene: scene.id.clone(),
        reason,
    };
    let href = scene.band(band).map_err(|e| unusable(e.to_string()))?;
    let source = store
        .load_window(href, grid)
        .map_err(|e| unusable(format!("band {}: {}", band, e)))?;
    match source {
        Some(source) => Ok(resample(&source, grid, Resampling::Nearest)?),
        None => {
            let mut empty = Raster::on_grid(grid, f64::NAN);
            empty.set_nodata(Some(f64::NAN));
            Ok(empty)
        }
    }
}

/// Mask one joined scene on `window`.
///
/// A scene without solar azimuth is masked for clouds only, or rejected
/// with [`PipelineError::MaskingInput`] under
/// [`MissingAzimuthPolicy::DropScene`]. A scene whose masking bands are
/// missing or unreadable is rejected the same way.
pub fn mask_scene(scene: &Scene, store: &dyn BandStore, window: &MaskWindow, config: &MaskingConfig) -> Result<SceneMask> {
    let azimuth = scene.solar_azimuth();
    if azimuth.is_none() && config.missing_azimuth == MissingAzimuthPolicy::DropScene {
        return Err(PipelineError::MaskingInput {
            scene: scene.id.clone(),
            reason: "no solar azimuth".to_string(),
        });
    }

    let bands = &config.bands;
    let on_grid = |band: &str| band_on(scene, band, store, &window.morphology);
    let b7 = on_grid(&bands.red_edge)?;
    let b8 = on_grid(&bands.nir)?;
    let b8a = on_grid(&bands.nir_narrow)?;
    let cirrus = on_grid(&bands.cirrus)?;
    let probability = on_grid(&bands.probability)?;

    let radius = config.cdi_radius;
    let cdi: Raster<f64> = TiledProcessor::new(config.tile_size, radius).map_with_tile(&b8a, |tile, b8a_tile| {
        cloud_displacement_index(&b7.window(&tile.halo)?, &b8.window(&tile.halo)?, b8a_tile, radius)
    })?;

    let condition = cloud_condition(&probability, &cdi, &cirrus, &config.cloud)?;
    let (erosion, dilation) = (config.erosion_radius, config.dilation_radius);
    let cloud: Raster<u8> = TiledProcessor::new(config.tile_size, erosion + dilation)
        .map(&condition, |tile| clean_mask(tile, erosion, dilation))?;

    let shadow = match azimuth {
        Some(azimuth) => {
            let coarse = resample(&cloud, &window.shadow, config.shadow_resampling)?;
            let angle = shadow_projection_angle(azimuth);
            Some(directional_distance(&coarse, angle, config.shadow_search)?)
        }
        None => {
            tracing::warn!("scene {} has no solar azimuth, masking clouds only", scene.id);
            None
        }
    };

    let mask = SceneMask {
        scene_id: scene.id.clone(),
        cloud,
        shadow,
    };
    tracing::debug!("scene {}: {:.1}% cloud", scene.id, mask.cloud_fraction() * 100.0);
    Ok(mask)
}
