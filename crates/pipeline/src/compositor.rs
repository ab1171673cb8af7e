//! Median composite of masked scenes
//!
//! The composite grid is processed tile by tile. For each tile every scene's
//! validity is computed once, then each band is read for just that tile's
//! footprint, its cloud and shadow pixels are dropped, and the remaining
//! observations are reduced to their median. Memory follows the tile size,
//! which never changes the result.

use crate::config::CompositeConfig;
use crate::error::{PipelineError, Result};
use crate::masker::{band_on, SceneMask};
use greensat_algorithms::mask;
use greensat_algorithms::statistics::median_of_stack;
use greensat_catalog::{BandStore, Scene};
use greensat_core::raster::GridWindow;
use greensat_core::{GridSpec, Raster};
use greensat_parallel::{ProcessingMode, TiledProcessor};
use std::collections::BTreeMap;

/// Per-band medians over a grid
#[derive(Debug, Clone)]
pub struct Composite {
    pub grid: GridSpec,
    /// `<band>_median` to its raster; NaN where no scene had a valid pixel
    pub bands: BTreeMap<String, Raster<f64>>,
    /// Scenes that were reduced
    pub scene_ids: Vec<String>,
}

impl Composite {
    /// Name of the median of `band`
    pub fn median_name(band: &str) -> String {
        format!("{}_median", band)
    }

    /// Median of `band` (the source band name, e.g. `"B8"`)
    pub fn band(&self, band: &str) -> Result<&Raster<f64>> {
        let name = Self::median_name(band);
        self.bands
            .get(&name)
            .ok_or_else(|| PipelineError::config(format!("composite has no band {}", name)))
    }
}

/// Check that every composite band of `scene` can be read on `grid`.
///
/// Reads a single pixel's worth of each band. Fails with
/// [`PipelineError::MaskingInput`] so the caller can drop the scene before
/// compositing.
pub fn check_bands(scene: &Scene, store: &dyn BandStore, grid: &GridSpec, config: &CompositeConfig) -> Result<()> {
    let corner = grid.window(&GridWindow::new(0, 0, 1, 1));
    for band in &config.bands {
        band_on(scene, band, store, &corner)?;
    }
    Ok(())
}

/// Reduce `scenes` to per-pixel medians on `grid`.
///
/// `scenes` pairs each scene with its mask; a scene without mask
/// contributes all its pixels.
pub fn composite(
    scenes: &[(Scene, Option<SceneMask>)],
    store: &dyn BandStore,
    grid: &GridSpec,
    config: &CompositeConfig,
    mode: ProcessingMode,
) -> Result<Composite> {
    if scenes.is_empty() {
        return Err(PipelineError::DataAvailability {
            region: format!("{}x{} grid in {}", grid.cols(), grid.rows(), grid.crs()),
            reason: "no scenes to composite".to_string(),
        });
    }
    let processor = TiledProcessor::new(config.tile_size, 0).with_mode(mode);

    let medians = processor.assemble_layers(grid, config.bands.len(), |_, tile| -> Result<Vec<Raster<f64>>> {
        let validity = scenes
            .iter()
            .map(|(_, mask)| mask.as_ref().map(|m| m.validity_on(tile)).transpose())
            .collect::<Result<Vec<_>>>()?;

        config
            .bands
            .iter()
            .map(|band| -> Result<Raster<f64>> {
                let layers = scenes
                    .iter()
                    .zip(&validity)
                    .map(|((scene, _), valid)| masked_layer(scene, band, store, tile, valid.as_ref()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(median_of_stack(&layers)?)
            })
            .collect()
    })?;

    let mut bands = BTreeMap::new();
    for (band, median) in config.bands.iter().zip(medians) {
        tracing::debug!(
            "{}: {} of {} pixels observed",
            Composite::median_name(band),
            median.count_where(|v| !v.is_nan()),
            median.len()
        );
        bands.insert(Composite::median_name(band), median);
    }

    Ok(Composite {
        grid: *grid,
        bands,
        scene_ids: scenes.iter().map(|(s, _)| s.id.clone()).collect(),
    })
}

/// `band` of `scene` on `tile`, NaN where it has no data or `validity`
/// rejects the pixel
fn masked_layer(
    scene: &Scene,
    band: &str,
    store: &dyn BandStore,
    tile: &GridSpec,
    validity: Option<&Raster<u8>>,
) -> Result<Raster<f64>> {
    let mut layer = band_on(scene, band, store, tile)?;
    let nodata = layer.nodata();

    for ((row, col), v) in layer.data_mut().indexed_iter_mut() {
        let rejected = validity.is_some_and(|valid| !mask::is_set(valid.data()[(row, col)]));
        if rejected || nodata.is_some_and(|nd| *v == nd) {
            *v = f64::NAN;
        }
    }
    layer.set_nodata(Some(f64::NAN));
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use greensat_algorithms::mask::{CLEAR, SET};
    use greensat_catalog::MemoryStore;
    use greensat_core::{Extent, CRS};
    use std::collections::{BTreeMap, HashMap};

    fn grid() -> GridSpec {
        GridSpec::covering(
            &Extent::new(440_000.0, 4_600_000.0, 440_090.0, 4_600_060.0),
            10.0,
            CRS::from_epsg(32616),
        )
        .unwrap()
    }

    fn scene(id: &str) -> Scene {
        Scene {
            id: id.to_string(),
            collection: "COPERNICUS/S2_SR".to_string(),
            datetime: "2020-07-04T16:48:49Z".parse().unwrap(),
            bbox: Extent::new(-88.0, 41.0, -87.0, 42.0),
            epsg: Some(32616),
            properties: HashMap::new(),
            bands: [("B4", format!("{}/B4", id)), ("B8", format!("{}/B8", id))]
                .into_iter()
                .map(|(b, h)| (b.to_string(), h))
                .collect::<BTreeMap<_, _>>(),
            companions: Vec::new(),
        }
    }

    fn config() -> CompositeConfig {
        CompositeConfig {
            bands: vec!["B4".into(), "B8".into()],
            tile_size: 4,
            ..CompositeConfig::default()
        }
    }

    fn store(values: &[(&str, f64)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (id, v) in values {
            store.insert(format!("{}/B4", id), Raster::on_grid(&grid(), *v));
            store.insert(format!("{}/B8", id), Raster::on_grid(&grid(), *v * 3.0));
        }
        store
    }

    #[test]
    fn test_median_across_scenes() {
        let store = store(&[("a", 100.0), ("b", 400.0), ("c", 200.0)]);
        let scenes: Vec<_> = ["a", "b", "c"].iter().map(|id| (scene(id), None)).collect();
        let out = composite(&scenes, &store, &grid(), &config(), ProcessingMode::Sequential).unwrap();

        assert_eq!(out.scene_ids, vec!["a", "b", "c"]);
        let b4 = out.band("B4").unwrap();
        assert_eq!(b4.shape(), (6, 9));
        assert!(b4.data().iter().all(|&v| v == 200.0));
        assert!(out.band("B8").unwrap().data().iter().all(|&v| v == 600.0));
        assert!(out.band("B2").is_err());
    }

    #[test]
    fn test_masked_pixels_are_excluded() {
        let store = store(&[("a", 100.0), ("b", 300.0)]);
        let g = grid();
        // scene b is cloud over the left three columns
        let mut cloud = Raster::on_grid(&g, CLEAR);
        for r in 0..g.rows() {
            for c in 0..3 {
                cloud.set(r, c, SET).unwrap();
            }
        }
        let mask_b = SceneMask {
            scene_id: "b".into(),
            cloud,
            shadow: None,
        };
        let scenes = vec![(scene("a"), None), (scene("b"), Some(mask_b))];
        let out = composite(&scenes, &store, &g, &config(), ProcessingMode::Parallel).unwrap();
        let b4 = out.band("B4").unwrap();
        assert_eq!(b4.get(2, 1).unwrap(), 100.0);
        assert_eq!(b4.get(2, 5).unwrap(), 200.0);
    }

    #[test]
    fn test_fully_masked_pixel_is_nodata() {
        let store = store(&[("a", 100.0)]);
        let g = grid();
        let mut cloud = Raster::on_grid(&g, CLEAR);
        cloud.set(0, 0, SET).unwrap();
        let mask = SceneMask {
            scene_id: "a".into(),
            cloud,
            shadow: None,
        };
        let out = composite(&[(scene("a"), Some(mask))], &store, &g, &config(), ProcessingMode::Sequential).unwrap();
        let b8 = out.band("B8").unwrap();
        assert!(b8.get(0, 0).unwrap().is_nan());
        assert_eq!(b8.get(0, 1).unwrap(), 300.0);
    }

    #[test]
    fn test_tile_size_does_not_change_result() {
        let mut store = MemoryStore::new();
        let g = grid();
        for (k, id) in ["a", "b", "c", "d"].iter().enumerate() {
            let mut r = Raster::on_grid(&g, 0.0);
            for ((row, col), v) in r.data_mut().indexed_iter_mut() {
                *v = ((row * 31 + col * 17 + k * 7) % 23) as f64;
            }
            store.insert(format!("{}/B4", id), r.clone());
            store.insert(format!("{}/B8", id), r);
        }
        let scenes: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| (scene(id), None)).collect();
        let whole = composite(
            &scenes,
            &store,
            &g,
            &CompositeConfig { tile_size: 100, ..config() },
            ProcessingMode::Sequential,
        )
        .unwrap();
        let tiled = composite(&scenes, &store, &g, &CompositeConfig { tile_size: 2, ..config() }, ProcessingMode::Parallel).unwrap();
        assert_eq!(whole.band("B4").unwrap().data(), tiled.band("B4").unwrap().data());
    }

    #[test]
    fn test_missing_band_is_reported() {
        let store = store(&[("a", 100.0)]);
        let mut s = scene("a");
        s.bands.remove("B8");
        assert!(matches!(
            composite(&[(s, None)], &store, &grid(), &config(), ProcessingMode::Sequential),
            Err(PipelineError::MaskingInput { .. })
        ));
    }

    #[test]
    fn test_empty_scene_set_is_data_availability() {
        let store = MemoryStore::new();
        let err = composite(&[], &store, &grid(), &config(), ProcessingMode::Sequential).unwrap_err();
        assert_eq!(err.kind(), "data_availability");
    }

    #[test]
    fn test_check_bands() {
        let store = store(&[("a", 100.0)]);
        assert!(check_bands(&scene("a"), &store, &grid(), &config()).is_ok());

        // href present in the scene but absent from the store
        let err = check_bands(&scene("b"), &store, &grid(), &config()).unwrap_err();
        match err {
            PipelineError::MaskingInput { scene, reason } => {
                assert_eq!(scene, "b");
                assert!(reason.contains("B4"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_band_smaller_than_grid_is_nodata_outside() {
        let g = grid();
        // band covers only the left half of the grid
        let left = g.window(&GridWindow::new(0, 0, g.rows(), 4));
        let mut store = MemoryStore::new();
        store.insert("a/B4", Raster::on_grid(&left, 100.0));
        store.insert("a/B8", Raster::on_grid(&left, 300.0));

        let out = composite(&[(scene("a"), None)], &store, &g, &config(), ProcessingMode::Sequential).unwrap();
        let b4 = out.band("B4").unwrap();
        assert_eq!(b4.get(3, 1).unwrap(), 100.0);
        assert!(b4.get(3, 7).unwrap().is_nan());
    }
}
