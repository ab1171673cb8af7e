//! Named region boundaries.
//!
//! A boundary id such as `EJLSAMultiCity/Seattle_CityBounds` is looked up as
//! `<root>/EJLSAMultiCity/Seattle_CityBounds.geojson`. Boundaries inserted in
//! memory take precedence over files.

use crate::error::{CatalogError, Result};
use greensat_core::Region;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct BoundaryStore {
    root: Option<PathBuf>,
    overrides: HashMap<String, Region>,
}

impl BoundaryStore {
    /// Store backed by GeoJSON files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            overrides: HashMap::new(),
        }
    }

    /// Store with no backing directory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Register a boundary under `id`.
    pub fn insert(&mut self, id: impl Into<String>, region: Region) {
        self.overrides.insert(id.into(), region);
    }

    /// File a boundary id maps to.
    pub fn path_for(&self, id: &str) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(format!("{}.geojson", id.trim_start_matches('/'))))
    }

    /// Load boundary `id` as a region called `name`.
    pub fn load(&self, name: &str, id: &str) -> Result<Region> {
        if let Some(region) = self.overrides.get(id) {
            return Ok(Region::new(name, region.geometry().clone()));
        }
        let not_found = |path: PathBuf| CatalogError::BoundaryNotFound {
            id: id.to_string(),
            path,
        };
        let path = self.path_for(id).ok_or_else(|| not_found(PathBuf::new()))?;
        if !path.exists() {
            return Err(not_found(path));
        }
        tracing::debug!("loading boundary {} from {}", id, path.display());
        Ok(Region::from_geojson_file(name, &path)?)
    }
}
