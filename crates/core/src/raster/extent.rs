//! Axis-aligned extents in map units

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the units of some CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Build from a `[west, south, east, north]` array (STAC / GeoJSON order)
    pub fn from_bbox(bbox: [f64; 4]) -> Self {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether the extent has no area (or is inverted)
    pub fn is_empty(&self) -> bool {
        !(self.max_x > self.min_x && self.max_y > self.min_y)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Smallest extent covering both
    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow the extent by `distance` on every side
    pub fn buffered(&self, distance: f64) -> Extent {
        Extent::new(
            self.min_x - distance,
            self.min_y - distance,
            self.max_x + distance,
            self.max_y + distance,
        )
    }

    /// Envelope of a set of points; `None` when the iterator is empty
    pub fn enclosing<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Extent> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut ext = Extent::new(x0, y0, x0, y0);
        for (x, y) in iter {
            ext.min_x = ext.min_x.min(x);
            ext.min_y = ext.min_y.min(y);
            ext.max_x = ext.max_x.max(x);
            ext.max_y = ext.max_y.max(y);
        }
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Extent::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Extent::new(11.0, 11.0, 15.0, 15.0)));
    }

    #[test]
    fn test_enclosing() {
        let ext = Extent::enclosing(vec![(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]).unwrap();
        assert_eq!(ext, Extent::new(-2.0, -1.0, 4.0, 5.0));
        assert!(Extent::enclosing(Vec::new()).is_none());
    }

    #[test]
    fn test_buffered_union() {
        let a = Extent::new(0.0, 0.0, 1.0, 1.0).buffered(1.0);
        assert_eq!(a, Extent::new(-1.0, -1.0, 2.0, 2.0));
        let u = a.union(&Extent::new(5.0, 5.0, 6.0, 6.0));
        assert_eq!(u, Extent::new(-1.0, -1.0, 6.0, 6.0));
    }
}
