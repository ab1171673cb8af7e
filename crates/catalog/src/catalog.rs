//! Catalog manifest: collection name to item collection

use crate::error::{CatalogError, Result};
use crate::stac_models::{StacItem, StacItemCollection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Sentinel-2 top-of-atmosphere collection (B7, B8, B8A, B10)
pub const S2_TOA: &str = "COPERNICUS/S2";
/// Sentinel-2 cloud probability collection
pub const S2_CLOUD_PROBABILITY: &str = "COPERNICUS/S2_CLOUD_PROBABILITY";
/// Sentinel-2 surface reflectance collection (B2, B3, B4, B5)
pub const S2_SR: &str = "COPERNICUS/S2_SR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    collections: BTreeMap<String, StacItemCollection>,
}

/// Collections of scene items, plus the directory their asset hrefs are
/// relative to.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    root: PathBuf,
    collections: BTreeMap<String, StacItemCollection>,
}

impl Catalog {
    /// Load a manifest file. Asset hrefs resolve against its directory.
    pub fn from_manifest<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&text).map_err(|source| CatalogError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        tracing::debug!(
            "loaded catalog {} with {} collection(s)",
            path.display(),
            manifest.collections.len()
        );
        Ok(Self {
            root,
            collections: manifest.collections,
        })
    }

    /// Empty catalog rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            collections: BTreeMap::new(),
        }
    }

    /// Add or replace a collection
    pub fn insert(&mut self, name: impl Into<String>, items: Vec<StacItem>) {
        self.collections.insert(name.into(), StacItemCollection::new(items));
    }

    /// Write the manifest to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let manifest = Manifest {
            collections: self.collections.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
        Ok(())
    }

    /// Directory asset hrefs are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Items of a collection
    pub fn items(&self, collection: &str) -> Result<&[StacItem]> {
        self.collections
            .get(collection)
            .map(|c| c.features.as_slice())
            .ok_or_else(|| CatalogError::UnknownCollection(collection.to_string()))
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"collections": {"COPERNICUS/S2_SR": {"features": [
                {"id": "a", "bbox": [0, 0, 1, 1], "properties": {"datetime": "2020-06-02T00:00:00Z"},
                 "assets": {"B4": {"href": "a/B4.tif"}}}
            ]}}}"#,
        )
        .unwrap();

        let catalog = Catalog::from_manifest(&path).unwrap();
        assert_eq!(catalog.root(), dir.path());
        assert_eq!(catalog.items(S2_SR).unwrap().len(), 1);
        assert!(matches!(catalog.items(S2_TOA), Err(CatalogError::UnknownCollection(_))));

        let copy = dir.path().join("copy.json");
        catalog.save(&copy).unwrap();
        let again = Catalog::from_manifest(&copy).unwrap();
        assert_eq!(again.collection_names().collect::<Vec<_>>(), vec![S2_SR]);
    }

    #[test]
    fn test_bad_manifest_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Catalog::from_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
