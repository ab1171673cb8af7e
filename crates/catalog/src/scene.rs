//! Scenes: one acquisition with its selected bands

use crate::error::{CatalogError, Result};
use crate::stac_models::{StacItem, SOLAR_AZIMUTH_PROPERTY};
use chrono::{DateTime, Utc};
use greensat_core::Extent;
use std::collections::{BTreeMap, HashMap};

/// A selected acquisition. After a join it also carries the bands of its
/// companions from the other collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Scene key, identical across collections for one acquisition
    pub id: String,
    /// Collection the scene was selected from
    pub collection: String,
    /// Acquisition time
    pub datetime: DateTime<Utc>,
    /// Footprint bounding box in WGS84
    pub bbox: Extent,
    /// Native projection of the bands
    pub epsg: Option<u32>,
    /// Item metadata
    pub properties: HashMap<String, serde_json::Value>,
    /// Band name to asset href
    pub bands: BTreeMap<String, String>,
    /// Namespaces of the scenes joined onto this one
    pub companions: Vec<String>,
}

impl Scene {
    /// Build a scene from a catalog item keeping only `bands` (all assets
    /// when `bands` is empty).
    pub fn from_item(item: &StacItem, collection: &str, bands: &[String]) -> Result<Self> {
        let invalid = |reason: &str| CatalogError::InvalidItem {
            id: item.id.clone(),
            reason: reason.to_string(),
        };
        let datetime = item.datetime().ok_or_else(|| invalid("missing or malformed datetime"))?;
        let bbox = item.extent().ok_or_else(|| invalid("missing or malformed bbox"))?;

        let selected: BTreeMap<String, String> = if bands.is_empty() {
            item.assets
                .iter()
                .map(|(k, a)| (k.clone(), a.href.clone()))
                .collect()
        } else {
            bands
                .iter()
                .map(|band| {
                    item.asset(band)
                        .map(|a| (band.clone(), a.href.clone()))
                        .ok_or_else(|| CatalogError::MissingBand {
                            scene: item.id.clone(),
                            band: band.clone(),
                        })
                })
                .collect::<Result<_>>()?
        };

        let mut properties = item.properties.extra.clone();
        if let Some(az) = item.solar_azimuth() {
            properties.insert(SOLAR_AZIMUTH_PROPERTY.to_string(), az.into());
        }

        Ok(Self {
            id: item.id.clone(),
            collection: collection.to_string(),
            datetime,
            bbox,
            epsg: item.epsg(),
            properties,
            bands: selected,
            companions: Vec::new(),
        })
    }

    /// Href of `band`
    pub fn band(&self, band: &str) -> Result<&str> {
        self.bands
            .get(band)
            .map(String::as_str)
            .ok_or_else(|| CatalogError::MissingBand {
                scene: self.id.clone(),
                band: band.to_string(),
            })
    }

    pub fn has_band(&self, band: &str) -> bool {
        self.bands.contains_key(band)
    }

    /// Mean solar azimuth in degrees clockwise from north
    pub fn solar_azimuth(&self) -> Option<f64> {
        self.properties
            .get(SOLAR_AZIMUTH_PROPERTY)
            .and_then(|v| v.as_f64())
            .filter(|v| v.is_finite())
    }
}
