//! STAC (SpatioTemporal Asset Catalog) data types.
//!
//! Lightweight serde models for the item collections in a catalog manifest,
//! covering what the pipeline needs: scene id, bbox, acquisition datetime,
//! solar geometry, projection and per-band assets.

use chrono::{DateTime, Utc};
use greensat_core::Extent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Property holding the mean solar azimuth of a Sentinel-2 granule, degrees
/// clockwise from north.
pub const SOLAR_AZIMUTH_PROPERTY: &str = "MEAN_SOLAR_AZIMUTH_ANGLE";

fn feature_collection() -> String {
    "FeatureCollection".to_string()
}

fn feature() -> String {
    "Feature".to_string()
}

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type", default = "feature_collection")]
    pub type_: String,

    pub features: Vec<StacItem>,
}

impl StacItemCollection {
    pub fn new(features: Vec<StacItem>) -> Self {
        Self {
            type_: feature_collection(),
            features,
        }
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature): one acquisition in one collection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type", default = "feature")]
    pub type_: String,

    /// Scene identifier, shared by the same acquisition across collections.
    pub id: String,

    /// Bounding box `[west, south, east, north]` in WGS84.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    /// Assets keyed by band name (`B2`, `B8A`, `probability`, ...).
    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,
}

impl StacItem {
    /// Get an asset by key.
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// Get the EPSG code from the `proj:epsg` property, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.properties
            .extra
            .get("proj:epsg")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
    }

    /// Bounding box as an extent, if present and well formed.
    pub fn extent(&self) -> Option<Extent> {
        match self.bbox.as_deref() {
            Some(&[w, s, e, n]) if w <= e && s <= n => Some(Extent::new(w, s, e, n)),
            _ => None,
        }
    }

    /// Parsed acquisition time.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.properties
            .datetime
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Mean solar azimuth, if the item carries it.
    pub fn solar_azimuth(&self) -> Option<f64> {
        self.properties.mean_solar_azimuth_angle
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// RFC 3339 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Mean solar azimuth angle (Sentinel-2 granule metadata).
    #[serde(rename = "MEAN_SOLAR_AZIMUTH_ANGLE", skip_serializing_if = "Option::is_none")]
    pub mean_solar_azimuth_angle: Option<f64>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    /// Path of the single-band GeoTIFF, relative to the manifest directory
    /// unless absolute.
    pub href: String,

    /// Media type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// All other asset fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl StacAsset {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            type_: None,
            extra: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "20200704T163901_20200704T164859_T16TDM",
      "bbox": [-88.18, 41.44, -86.85, 42.45],
      "properties": {
        "datetime": "2020-07-04T16:49:12Z",
        "MEAN_SOLAR_AZIMUTH_ANGLE": 146.2,
        "proj:epsg": 32616,
        "CLOUDY_PIXEL_PERCENTAGE": 12.5
      },
      "assets": {
        "B4": {"href": "S2_SR/T16TDM/B4.tif", "type": "image/tiff; application=geotiff"},
        "B8": {"href": "S2_SR/T16TDM/B8.tif"}
      }
    },
    {
      "id": "20200709T163901_20200709T164601_T16TDM",
      "properties": {"datetime": "2020-07-09T16:49:05+00:00"},
      "assets": {}
    }
  ]
}"#;

    #[test]
    fn parse_item_collection() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(col.type_, "FeatureCollection");
        assert_eq!(col.len(), 2);
        // type defaults when omitted
        assert_eq!(col.features[1].type_, "Feature");
    }

    #[test]
    fn parse_properties() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        let item = &col.features[0];
        assert_eq!(item.solar_azimuth(), Some(146.2));
        assert_eq!(item.epsg(), Some(32616));
        assert!(item.properties.extra.contains_key("CLOUDY_PIXEL_PERCENTAGE"));
        assert_eq!(item.datetime().unwrap().to_rfc3339(), "2020-07-04T16:49:12+00:00");
    }

    #[test]
    fn missing_fields_are_none() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        let item = &col.features[1];
        assert!(item.extent().is_none());
        assert!(item.solar_azimuth().is_none());
        assert!(item.epsg().is_none());
        assert!(item.datetime().is_some());
    }

    #[test]
    fn asset_lookup() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        let item = &col.features[0];
        assert_eq!(item.asset("B4").unwrap().href, "S2_SR/T16TDM/B4.tif");
        assert!(item.asset("B4").unwrap().type_.as_ref().unwrap().contains("geotiff"));
        assert!(item.asset("B10").is_none());
    }

    #[test]
    fn malformed_bbox_is_rejected() {
        let mut col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        let item = &mut col.features[0];
        item.bbox = Some(vec![1.0, 2.0, 0.0, 3.0]);
        assert!(item.extent().is_none());
        item.bbox = Some(vec![1.0, 2.0, 3.0]);
        assert!(item.extent().is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        let text = serde_json::to_string(&col).unwrap();
        let back: StacItemCollection = serde_json::from_str(&text).unwrap();
        assert_eq!(back.features[0].solar_azimuth(), Some(146.2));
        assert_eq!(back.features[0].epsg(), Some(32616));
    }
}
