//! Vector data: named region boundaries and their rasterization

mod rasterize;

pub use rasterize::rasterize_mask;

use crate::crs::{Projector, CRS};
use crate::error::{Error, Result};
use crate::raster::Extent;
use geo::{BoundingRect, Centroid, Intersects, MapCoords};
use geo_types::{Coord, Geometry, MultiPolygon, Polygon, Rect};
use geojson::GeoJson;
use std::path::Path;

/// A named area of interest (a city boundary) held in WGS84 lon/lat.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    name: String,
    geometry: MultiPolygon<f64>,
}

impl Region {
    /// Create a region from a WGS84 multipolygon
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Axis-aligned rectangle region, handy for tests and quick runs
    pub fn from_bbox(name: impl Into<String>, bbox: Extent) -> Self {
        let rect = Rect::new(
            Coord { x: bbox.min_x, y: bbox.min_y },
            Coord { x: bbox.max_x, y: bbox.max_y },
        );
        Self::new(name, MultiPolygon(vec![rect.to_polygon()]))
    }

    /// Parse a GeoJSON document (FeatureCollection, Feature or bare Geometry).
    ///
    /// All polygonal geometries are merged into one multipolygon; anything
    /// else is rejected.
    pub fn from_geojson_str(name: impl Into<String>, text: &str) -> Result<Self> {
        let geojson: GeoJson = text.parse()?;
        let mut polygons = Vec::new();

        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in fc.features {
                    if let Some(geometry) = feature.geometry {
                        collect_polygons(Geometry::try_from(geometry)?, &mut polygons)?;
                    }
                }
            }
            GeoJson::Feature(feature) => {
                if let Some(geometry) = feature.geometry {
                    collect_polygons(Geometry::try_from(geometry)?, &mut polygons)?;
                }
            }
            GeoJson::Geometry(geometry) => {
                collect_polygons(Geometry::try_from(geometry)?, &mut polygons)?;
            }
        }

        if polygons.is_empty() {
            return Err(Error::Geometry("boundary contains no polygons".to_string()));
        }
        Ok(Self::new(name, MultiPolygon(polygons)))
    }

    /// Load a GeoJSON boundary file
    pub fn from_geojson_file<P: AsRef<Path>>(name: impl Into<String>, path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_geojson_str(name, &text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Boundary in WGS84
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// WGS84 bounding box
    pub fn extent(&self) -> Result<Extent> {
        self.geometry
            .bounding_rect()
            .map(rect_extent)
            .ok_or_else(|| Error::Geometry(format!("region {} is empty", self.name)))
    }

    /// Whether the boundary touches a WGS84 bounding box
    pub fn intersects_extent(&self, extent: &Extent) -> bool {
        let rect = Rect::new(
            Coord { x: extent.min_x, y: extent.min_y },
            Coord { x: extent.max_x, y: extent.max_y },
        );
        self.geometry.intersects(&rect)
    }

    /// Boundary reprojected into `crs`
    pub fn project(&self, crs: &CRS) -> Result<MultiPolygon<f64>> {
        let projector = Projector::new(&CRS::wgs84(), crs)?;
        if projector.is_identity() {
            return Ok(self.geometry.clone());
        }
        Ok(self.geometry.map_coords(move |c| {
            let (x, y) = projector.project(c.x, c.y);
            Coord { x, y }
        }))
    }

    /// Bounding box of the boundary once projected into `crs`
    pub fn projected_extent(&self, crs: &CRS) -> Result<Extent> {
        self.project(crs)?
            .bounding_rect()
            .map(rect_extent)
            .ok_or_else(|| Error::Geometry(format!("region {} is empty", self.name)))
    }

    /// UTM zone containing the boundary centroid
    pub fn auto_crs(&self) -> Result<CRS> {
        let centroid = self
            .geometry
            .centroid()
            .ok_or_else(|| Error::Geometry(format!("region {} has no centroid", self.name)))?;
        Ok(CRS::utm_for(centroid.x(), centroid.y()))
    }
}

fn rect_extent(rect: Rect<f64>) -> Extent {
    Extent::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                collect_polygons(g, out)?;
            }
        }
        other => {
            return Err(Error::Geometry(format!(
                "expected polygonal boundary, found {}",
                geometry_kind(&other)
            )))
        }
    }
    Ok(())
}

fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Triangle(_) => "Triangle",
        _ => "geometry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"NAME": "Chicago"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-87.9, 41.6], [-87.5, 41.6], [-87.5, 42.0], [-87.9, 42.0], [-87.9, 41.6]]]
            }
        }]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let region = Region::from_geojson_str("Chicago", SQUARE).unwrap();
        assert_eq!(region.name(), "Chicago");
        assert_eq!(region.geometry().0.len(), 1);
        let e = region.extent().unwrap();
        assert_relative_eq!(e.min_x, -87.9);
        assert_relative_eq!(e.max_y, 42.0);
    }

    #[test]
    fn test_reject_non_polygon() {
        let text = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#;
        assert!(Region::from_geojson_str("pt", text).is_err());
    }

    #[test]
    fn test_auto_crs_picks_centroid_zone() {
        let region = Region::from_geojson_str("Chicago", SQUARE).unwrap();
        assert_eq!(region.auto_crs().unwrap().epsg(), 32616);
    }

    #[test]
    fn test_projected_extent_is_metric() {
        let region = Region::from_geojson_str("Chicago", SQUARE).unwrap();
        let e = region.projected_extent(&CRS::from_epsg(32616)).unwrap();
        // ~0.4 deg of longitude at 42N is ~33 km
        assert!(e.width() > 30_000.0 && e.width() < 36_000.0);
        assert!(e.height() > 43_000.0 && e.height() < 46_000.0);
    }

    #[test]
    fn test_intersects_extent() {
        let region = Region::from_geojson_str("Chicago", SQUARE).unwrap();
        assert!(region.intersects_extent(&Extent::new(-88.0, 41.0, -87.8, 41.7)));
        assert!(!region.intersects_extent(&Extent::new(-80.0, 41.0, -79.0, 42.0)));
    }
}
