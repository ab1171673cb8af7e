//! LRU cache of decoded band rasters.

use greensat_core::Raster;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU cache keyed by band path, holding shared decoded rasters.
pub struct BandCache {
    inner: LruCache<String, Arc<Raster<f64>>>,
}

impl BandCache {
    /// Create a new cache with the given capacity (number of rasters).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(cap),
        }
    }

    /// Get a cached raster, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<Arc<Raster<f64>>> {
        self.inner.get(key).cloned()
    }

    /// Insert a raster into the cache.
    pub fn insert(&mut self, key: String, raster: Arc<Raster<f64>>) {
        self.inner.put(key, raster);
    }

    /// Number of rasters currently cached.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop all cached rasters.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
