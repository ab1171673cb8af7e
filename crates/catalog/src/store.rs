//! Band loading.

use crate::cache::BandCache;
use crate::error::{CatalogError, Result};
use greensat_core::io::{read_geotiff, read_geotiff_window};
use greensat_core::{GridSpec, Raster};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Anything that can resolve an asset href to a decoded band.
pub trait BandStore: Send + Sync {
    /// Load the band at `href`.
    fn load(&self, href: &str) -> Result<Arc<Raster<f64>>>;

    /// Load the part of the band at `href` that covers `grid`, at the
    /// band's own resolution. `None` when the band does not reach `grid`.
    fn load_window(&self, href: &str, grid: &GridSpec) -> Result<Option<Raster<f64>>> {
        cut(&*self.load(href)?, grid)
    }
}

/// Window of an in-memory band covering `grid`
fn cut(band: &Raster<f64>, grid: &GridSpec) -> Result<Option<Raster<f64>>> {
    let source = band
        .grid()
        .ok_or_else(|| greensat_core::Error::UnsupportedCrs("band has no CRS".to_string()))?;
    match grid.source_window(&source)? {
        Some(window) => Ok(Some(band.window(&window)?)),
        None => Ok(None),
    }
}

/// Default number of decoded bands kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Single-band GeoTIFFs on disk, relative hrefs resolved against `root`.
pub struct GeoTiffStore {
    root: PathBuf,
    cache: Mutex<BandCache>,
}

impl GeoTiffStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_capacity(root, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(root: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(BandCache::new(capacity)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path an href points at.
    pub fn resolve(&self, href: &str) -> PathBuf {
        let href = href.strip_prefix("file://").unwrap_or(href);
        let path = Path::new(href);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Number of decoded bands currently held.
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl BandStore for GeoTiffStore {
    fn load(&self, href: &str) -> Result<Arc<Raster<f64>>> {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(href) {
                return Ok(hit);
            }
        }

        let path = self.resolve(href);
        if !path.exists() {
            return Err(CatalogError::BandNotFound(path.display().to_string()));
        }
        tracing::debug!("reading band {}", path.display());
        let raster = Arc::new(read_geotiff::<f64, _>(&path)?);

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(href.to_string(), Arc::clone(&raster));
        }
        Ok(raster)
    }

    /// Cuts from a cached band when there is one, otherwise decodes only the
    /// chunks under `grid`. Windows are not cached.
    fn load_window(&self, href: &str, grid: &GridSpec) -> Result<Option<Raster<f64>>> {
        let hit = self.cache.lock().ok().and_then(|mut cache| cache.get(href));
        if let Some(band) = hit {
            return cut(&band, grid);
        }

        let path = self.resolve(href);
        if !path.exists() {
            return Err(CatalogError::BandNotFound(path.display().to_string()));
        }
        Ok(read_geotiff_window::<f64, _>(&path, grid)?)
    }
}

/// Bands held in memory, keyed by href.
#[derive(Default)]
pub struct MemoryStore {
    bands: HashMap<String, Arc<Raster<f64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, href: impl Into<String>, raster: Raster<f64>) {
        self.bands.insert(href.into(), Arc::new(raster));
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

impl BandStore for MemoryStore {
    fn load(&self, href: &str) -> Result<Arc<Raster<f64>>> {
        self.bands
            .get(href)
            .cloned()
            .ok_or_else(|| CatalogError::BandNotFound(href.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        store.insert("a/B4", Raster::filled(2, 2, 0.5));
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("a/B4").unwrap().get(1, 1).unwrap(), 0.5);
        assert!(matches!(store.load("a/B8"), Err(CatalogError::BandNotFound(_))));
    }

    #[test]
    fn test_resolve() {
        let store = GeoTiffStore::new("/data/s2");
        assert_eq!(store.resolve("x/B4.tif"), PathBuf::from("/data/s2/x/B4.tif"));
        assert_eq!(store.resolve("/abs/B4.tif"), PathBuf::from("/abs/B4.tif"));
        assert_eq!(store.resolve("file:///abs/B4.tif"), PathBuf::from("/abs/B4.tif"));
    }

    #[test]
    fn test_missing_file() {
        let store = GeoTiffStore::new("/nonexistent-greensat-root");
        assert!(matches!(store.load("B4.tif"), Err(CatalogError::BandNotFound(_))));
        assert_eq!(store.cached(), 0);
    }

    fn band_grid() -> GridSpec {
        GridSpec::covering(
            &greensat_core::Extent::new(440_000.0, 4_630_000.0, 442_000.0, 4_632_000.0),
            20.0,
            greensat_core::CRS::from_epsg(32616),
        )
        .unwrap()
    }

    fn tile_grid() -> GridSpec {
        GridSpec::covering(
            &greensat_core::Extent::new(440_500.0, 4_631_000.0, 440_700.0, 4_631_200.0),
            10.0,
            greensat_core::CRS::from_epsg(32616),
        )
        .unwrap()
    }

    #[test]
    fn test_memory_store_window() {
        let mut store = MemoryStore::new();
        store.insert("s1/B8", Raster::on_grid(&band_grid(), 3000.0));

        let part = store.load_window("s1/B8", &tile_grid()).unwrap().unwrap();
        assert_eq!(part.shape(), (12, 12));
        assert_eq!(part.crs().map(|c| c.epsg()), Some(32616));

        let far = GridSpec::covering(
            &greensat_core::Extent::new(600_000.0, 4_631_000.0, 600_100.0, 4_631_100.0),
            10.0,
            greensat_core::CRS::from_epsg(32616),
        )
        .unwrap();
        assert!(store.load_window("s1/B8", &far).unwrap().is_none());
    }

    #[test]
    fn test_window_read_bypasses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let band = Raster::on_grid(&band_grid(), 3000.0);
        greensat_core::io::write_geotiff(&band, dir.path().join("B8.tif")).unwrap();

        let store = GeoTiffStore::new(dir.path());
        let part = store.load_window("B8.tif", &tile_grid()).unwrap().unwrap();
        assert_eq!(part.shape(), (12, 12));
        assert_eq!(part.get(0, 0).unwrap(), 3000.0);
        assert_eq!(store.cached(), 0);

        // once the whole band is cached, windows are cut from it
        store.load("B8.tif").unwrap();
        let cut = store.load_window("B8.tif", &tile_grid()).unwrap().unwrap();
        assert_eq!(cut.data(), part.data());
        assert_eq!(cut.grid(), part.grid());
        assert_eq!(store.cached(), 1);
    }

    #[test]
    fn test_window_of_missing_file() {
        let store = GeoTiffStore::new("/nonexistent-greensat-root");
        assert!(matches!(
            store.load_window("B4.tif", &tile_grid()),
            Err(CatalogError::BandNotFound(_))
        ));
    }
}
