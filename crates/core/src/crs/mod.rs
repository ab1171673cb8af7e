//! Coordinate Reference System handling
//!
//! The pipeline only needs EPSG-coded systems: WGS84 geographic (4326) for
//! boundaries and scene footprints, and UTM north/south zones (326xx/327xx)
//! for working grids and exports.

mod utm;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use utm::{utm_to_wgs84, utm_zone_for, wgs84_to_utm};

/// Coordinate Reference System identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// UTM zone CRS (EPSG:326zz north, 327zz south)
    pub fn utm(zone: u32, north: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(Error::UnsupportedCrs(format!("UTM zone {}", zone)));
        }
        Ok(Self::from_epsg(if north { 32600 + zone } else { 32700 + zone }))
    }

    /// UTM zone containing a WGS84 point
    pub fn utm_for(lon: f64, lat: f64) -> Self {
        let zone = utm_zone_for(lon);
        Self::from_epsg(if lat >= 0.0 { 32600 + zone } else { 32700 + zone })
    }

    /// Get EPSG code
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn is_geographic(&self) -> bool {
        self.epsg == 4326
    }

    /// UTM zone info: `Some((zone, is_north))`
    pub fn utm_zone(&self) -> Option<(u32, bool)> {
        if (32601..=32660).contains(&self.epsg) {
            Some((self.epsg - 32600, true))
        } else if (32701..=32760).contains(&self.epsg) {
            Some((self.epsg - 32700, false))
        } else {
            None
        }
    }

    /// Whether points can be projected to and from this CRS
    pub fn is_supported(&self) -> bool {
        self.is_geographic() || self.utm_zone().is_some()
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Accepts `"EPSG:32616"`, `"epsg:32616"` or a bare `"32616"`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        let epsg: u32 = code
            .parse()
            .map_err(|_| Error::UnsupportedCrs(s.to_string()))?;
        let crs = CRS::from_epsg(epsg);
        if !crs.is_supported() {
            return Err(Error::UnsupportedCrs(s.to_string()));
        }
        Ok(crs)
    }
}

impl TryFrom<String> for CRS {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CRS> for String {
    fn from(crs: CRS) -> Self {
        crs.identifier()
    }
}

/// Projection kind behind a supported CRS
#[derive(Debug, Clone, Copy, PartialEq)]
enum Projection {
    Geographic,
    Utm { zone: u32, north: bool },
}

impl Projection {
    fn of(crs: &CRS) -> Result<Self> {
        if crs.is_geographic() {
            Ok(Projection::Geographic)
        } else if let Some((zone, north)) = crs.utm_zone() {
            Ok(Projection::Utm { zone, north })
        } else {
            Err(Error::UnsupportedCrs(crs.identifier()))
        }
    }

    fn to_wgs84(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::Utm { zone, north } => utm_to_wgs84(x, y, zone, north),
        }
    }

    fn from_wgs84(self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
        }
    }
}

/// Point transformation between two supported CRSs (through WGS84).
///
/// `Projector` is `Copy`, so it can be captured by the `Copy` closures that
/// `geo::MapCoords` requires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    from: Projection,
    to: Projection,
    identity: bool,
}

impl Projector {
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        Ok(Self {
            from: Projection::of(from)?,
            to: Projection::of(to)?,
            identity: from == to,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transform one point
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        if self.identity {
            return (x, y);
        }
        let (lon, lat) = self.from.to_wgs84(x, y);
        self.to.from_wgs84(lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_parse() {
        let crs: CRS = "EPSG:32616".parse().unwrap();
        assert_eq!(crs.epsg(), 32616);
        assert_eq!(crs.utm_zone(), Some((16, true)));
        assert_eq!(crs.identifier(), "EPSG:32616");
        assert_eq!("4326".parse::<CRS>().unwrap(), CRS::wgs84());
    }

    #[test]
    fn test_crs_parse_rejects_unsupported() {
        assert!("EPSG:3857".parse::<CRS>().is_err());
        assert!("EPSG:32600".parse::<CRS>().is_err());
        assert!("UTM16".parse::<CRS>().is_err());
    }

    #[test]
    fn test_crs_serde_as_string() {
        let json = serde_json::to_string(&CRS::from_epsg(32611)).unwrap();
        assert_eq!(json, "\"EPSG:32611\"");
        let back: CRS = serde_json::from_str(&json).unwrap();
        assert_eq!(back.epsg(), 32611);
        assert!(serde_json::from_str::<CRS>("\"EPSG:9999\"").is_err());
    }

    #[test]
    fn test_utm_for_point() {
        // Chicago
        assert_eq!(CRS::utm_for(-87.63, 41.88).epsg(), 32616);
        // Los Angeles
        assert_eq!(CRS::utm_for(-118.24, 34.05).epsg(), 32611);
        // Buenos Aires
        assert_eq!(CRS::utm_for(-58.38, -34.60).epsg(), 32721);
    }

    #[test]
    fn test_projector_between_zones_roundtrip() {
        let a = CRS::from_epsg(32616);
        let b = CRS::from_epsg(32615);
        let fwd = Projector::new(&a, &b).unwrap();
        let back = Projector::new(&b, &a).unwrap();
        let (x, y) = fwd.project(448_000.0, 4_636_000.0);
        let (x2, y2) = back.project(x, y);
        // Zone 15 is ~5 degrees away, series truncation stays well under 10 cm
        assert!((x2 - 448_000.0).abs() < 0.1);
        assert!((y2 - 4_636_000.0).abs() < 0.1);
    }

    #[test]
    fn test_projector_identity() {
        let crs = CRS::from_epsg(32616);
        let p = Projector::new(&crs, &crs).unwrap();
        assert!(p.is_identity());
        assert_eq!(p.project(1.0, 2.0), (1.0, 2.0));
    }
}
