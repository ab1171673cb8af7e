//! Run orchestration
//!
//! Groups run one after another. Within a group each region selects, joins,
//! masks, composites and exports on its own, and the regions fan out in
//! parallel. A region that fails is recorded in the report; the others
//! carry on.

use crate::compositor::{check_bands, composite, Composite};
use crate::config::{CompositeConfig, GroupConfig, PipelineConfig, RegionConfig, CLOUD_PROBABILITY_NAMESPACE, L1C_NAMESPACE};
use crate::error::{PipelineError, Result};
use crate::export::{export_grid, export_region, ExportContext};
use crate::masker::{mask_scene, MaskWindow};
use crate::report::{RegionReport, RegionStatus, RunReport, SceneCounts};
use greensat_algorithms::imagery::{ndvi, threshold};
use greensat_algorithms::statistics::percentile;
use greensat_catalog::{index_join, select, BandStore, BoundaryStore, Catalog, CatalogError, DateRange, Scene};
use greensat_core::vector::rasterize_mask;
use greensat_core::{Raster, Region, CRS};
use greensat_parallel::{ParallelStrategy, ProcessingMode};
use tracing::{info, warn};

/// Joined scenes of one region, ready for masking
#[derive(Debug, Clone, Default)]
pub struct PreparedScenes {
    pub scenes: Vec<Scene>,
    pub counts: SceneCounts,
}

/// Select the three collections over `region` and `range` and join them:
/// surface reflectance ⋈ cloud probability ⋈ L1C.
///
/// No surface reflectance scene, or none surviving the joins, is a
/// [`PipelineError::DataAvailability`].
pub fn prepare_scenes(config: &PipelineConfig, catalog: &Catalog, region: &Region, range: &DateRange) -> Result<PreparedScenes> {
    let collections = &config.collections;
    let pick = |collection: &crate::config::CollectionSpec| -> Result<Vec<Scene>> {
        let scenes = select(catalog.items(&collection.name)?, &collection.name, region, range, &collection.bands);
        info!("{}: {} scene(s) from {} in {}", region.name(), scenes.len(), collection.name, range);
        Ok(scenes)
    };
    let sr = pick(&collections.surface_reflectance)?;
    let probability = pick(&collections.cloud_probability)?;
    let toa = pick(&collections.toa)?;

    let no_data = |reason: String| PipelineError::DataAvailability {
        region: region.name().to_string(),
        reason,
    };
    if sr.is_empty() {
        return Err(no_data(format!("no {} scene in {}", collections.surface_reflectance.name, range)));
    }

    let mut counts = SceneCounts {
        selected: sr.len(),
        ..SceneCounts::default()
    };
    let with_probability = index_join(sr, &probability, CLOUD_PROBABILITY_NAMESPACE, config.join_mode)?;
    let joined = index_join(with_probability.scenes, &toa, L1C_NAMESPACE, config.join_mode)?;
    counts.joined = joined.scenes.len();

    if joined.scenes.is_empty() {
        return Err(no_data(format!("none of {} scene(s) has all companion scenes", counts.selected)));
    }
    Ok(PreparedScenes {
        scenes: joined.scenes,
        counts,
    })
}

/// NDVI of a composite and its green-space mask (1 where NDVI ≥ `value`,
/// 255 where NDVI is no-data)
pub fn green_space(composite: &Composite, config: &CompositeConfig, value: f64) -> Result<(Raster<f64>, Raster<u8>)> {
    let index = ndvi(composite.band(&config.nir)?, composite.band(&config.red)?)?;
    let green = threshold(&index, value)?;
    Ok((index, green))
}

/// A configured run over a catalog, band store and boundary store
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    catalog: &'a Catalog,
    store: &'a dyn BandStore,
    boundaries: &'a BoundaryStore,
    mode: ProcessingMode,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        catalog: &'a Catalog,
        store: &'a dyn BandStore,
        boundaries: &'a BoundaryStore,
    ) -> Self {
        Self {
            config,
            catalog,
            store,
            boundaries,
            mode: ProcessingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Run every group. Only an invalid configuration fails the whole run.
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate()?;
        let mut report = RunReport::default();
        for group in &self.config.groups {
            report.regions.extend(self.run_group(group));
        }
        info!(
            "run finished: {} exported, {} failed",
            report.exported().count(),
            report.failed().count()
        );
        Ok(report)
    }

    /// Run one group, regions in parallel
    pub fn run_group(&self, group: &GroupConfig) -> Vec<RegionReport> {
        info!("group {}: {} region(s), threshold {}", group.name, group.regions.len(), group.threshold);
        self.mode
            .par_map(group.regions.iter().collect(), |region| self.run_region(group, region))
    }

    fn run_region(&self, group: &GroupConfig, region_config: &RegionConfig) -> RegionReport {
        let mut counts = SceneCounts::default();
        match self.export_one(group, region_config, &mut counts) {
            Ok(report) => report,
            Err(e) => {
                warn!("{}: {}", region_config.name, e);
                RegionReport::failed(&group.name, &region_config.name, counts, &e)
            }
        }
    }

    fn export_one(&self, group: &GroupConfig, region_config: &RegionConfig, counts: &mut SceneCounts) -> Result<RegionReport> {
        let (region, crs) = self.load_region(region_config)?;
        let range = self.config.date_range_for(group);
        let composite = self.composite_region(&region, crs, &range, counts)?;
        let (_, green) = green_space(&composite, &self.config.composite, group.threshold)?;

        let context = ExportContext {
            threshold: group.threshold,
            date_range: range.to_string(),
            scenes: composite.scene_ids.clone(),
        };
        let artifact = export_region(
            &green,
            &region,
            region_config,
            crs,
            &self.config.export,
            &self.config.output,
            &context,
        )?;

        let m = &artifact.metadata;
        Ok(RegionReport {
            group: group.name.clone(),
            region: region_config.name.clone(),
            status: RegionStatus::Exported,
            error_kind: None,
            error: None,
            output: Some(artifact.raster.clone()),
            sidecar: Some(artifact.sidecar.clone()),
            scenes: *counts,
            green_pixels: m.green_pixels,
            valid_pixels: m.green_pixels + m.not_green_pixels,
            nodata_pixels: m.nodata_pixels,
        })
    }

    /// Boundary of a configured region and its target CRS
    pub fn load_region(&self, region_config: &RegionConfig) -> Result<(Region, CRS)> {
        let region = match self.boundaries.load(&region_config.name, &region_config.boundary) {
            Ok(region) => region,
            Err(CatalogError::BoundaryNotFound { id, path }) => {
                return Err(PipelineError::config(format!(
                    "unknown region {}: boundary {} not found at {}",
                    region_config.name,
                    id,
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let crs = region_config.crs.resolve(&region)?;
        Ok((region, crs))
    }

    /// Selected and joined scenes of a region
    pub fn scenes(&self, region: &Region, range: &DateRange) -> Result<PreparedScenes> {
        prepare_scenes(self.config, self.catalog, region, range)
    }

    /// Median composite of a region on its export grid
    pub fn composite_region(&self, region: &Region, crs: CRS, range: &DateRange, counts: &mut SceneCounts) -> Result<Composite> {
        let grid = export_grid(region, crs, &self.config.export)?;
        let prepared = self.scenes(region, range)?;
        *counts = prepared.counts;

        let masking = &self.config.masking;
        let window = MaskWindow::around(&grid.extent(), crs, masking)?;
        let masked = self.mode.par_map(prepared.scenes, |scene| {
            let mask = mask_scene(&scene, self.store, &window, masking)
                .and_then(|mask| check_bands(&scene, self.store, &grid, &self.config.composite).map(|_| mask));
            (scene, mask)
        });

        let mut kept = Vec::with_capacity(masked.len());
        for (scene, mask) in masked {
            match mask {
                Ok(mask) => {
                    counts.masked += 1;
                    if mask.shadow_skipped() {
                        counts.shadow_skipped += 1;
                    }
                    kept.push((scene, Some(mask)));
                }
                Err(e @ PipelineError::MaskingInput { .. }) => {
                    warn!("{}: dropping scene: {}", region.name(), e);
                    counts.dropped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        if kept.is_empty() {
            return Err(PipelineError::DataAvailability {
                region: region.name().to_string(),
                reason: format!("all {} joined scene(s) were dropped during masking", counts.joined),
            });
        }

        info!(
            "{}: compositing {} scene(s) on a {}x{} grid",
            region.name(),
            kept.len(),
            grid.cols(),
            grid.rows()
        );
        composite(&kept, self.store, &grid, &self.config.composite, self.mode)
    }

    /// Percentile `p` of a region's NDVI inside its boundary
    pub fn calibrate(&self, group: &GroupConfig, region_config: &RegionConfig, p: f64) -> Result<Option<f64>> {
        let (region, crs) = self.load_region(region_config)?;
        let range = self.config.date_range_for(group);
        let mut counts = SceneCounts::default();
        let composite = self.composite_region(&region, crs, &range, &mut counts)?;
        let (index, _) = green_space(&composite, &self.config.composite, group.threshold)?;
        let inside = rasterize_mask(&region.project(&crs)?, &composite.grid);
        Ok(percentile(&index, Some(&inside), p)?)
    }
}

/// Run the whole configuration
pub fn run(config: &PipelineConfig, catalog: &Catalog, store: &dyn BandStore, boundaries: &BoundaryStore) -> Result<RunReport> {
    Pipeline::new(config, catalog, store, boundaries).run()
}
