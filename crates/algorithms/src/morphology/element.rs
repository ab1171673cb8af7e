//! Structuring elements for mask erosion and dilation

use greensat_core::raster::Neighborhood;
use greensat_core::{Error, Result};

/// Neighborhood shape of a morphology pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuringElement {
    /// Square of side 2r + 1
    Square(usize),
    /// Plus-shaped, arms of length r
    Cross(usize),
    /// Cells within Euclidean distance r of the centre
    Disk(usize),
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::Disk(1)
    }
}

impl StructuringElement {
    pub fn validate(&self) -> Result<()> {
        if self.radius() == 0 {
            return Err(Error::InvalidParameter {
                name: "radius",
                value: "0".to_string(),
                reason: "structuring element radius must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn radius(&self) -> usize {
        match *self {
            StructuringElement::Square(r) | StructuringElement::Cross(r) | StructuringElement::Disk(r) => r,
        }
    }

    /// (dr, dc) offsets of the active cells, centre included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        match *self {
            StructuringElement::Square(r) => Neighborhood::Square(r).offsets(),
            StructuringElement::Disk(r) => Neighborhood::Circle(r).offsets(),
            StructuringElement::Cross(r) => {
                let r = r as isize;
                let mut offsets = vec![(0, 0)];
                for d in (-r..=r).filter(|&d| d != 0) {
                    offsets.push((d, 0));
                    offsets.push((0, d));
                }
                offsets
            }
        }
    }

    /// Active cells as horizontal runs `(dr, dc_start, dc_end)`, inclusive.
    ///
    /// Lets the mask kernels test a whole run with one prefix-sum lookup.
    pub fn row_spans(&self) -> Vec<(isize, isize, isize)> {
        let mut offsets = self.offsets();
        offsets.sort_unstable();
        let mut spans: Vec<(isize, isize, isize)> = Vec::new();
        for (dr, dc) in offsets {
            match spans.last_mut() {
                Some(last) if last.0 == dr && last.2 + 1 == dc => last.2 = dc,
                _ => spans.push((dr, dc, dc)),
            }
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_offsets() {
        let offsets = StructuringElement::Square(1).offsets();
        assert_eq!(offsets.len(), 9);
        assert!(offsets.contains(&(-1, -1)));
        assert!(offsets.contains(&(1, 1)));
    }

    #[test]
    fn test_cross_offsets() {
        let offsets = StructuringElement::Cross(2).offsets();
        assert_eq!(offsets.len(), 9);
        assert!(offsets.contains(&(0, 0)));
        assert!(offsets.contains(&(-2, 0)));
        assert!(offsets.contains(&(0, 2)));
        assert!(!offsets.contains(&(1, 1)));
    }

    #[test]
    fn test_disk_excludes_corners() {
        let offsets = StructuringElement::Disk(3).offsets();
        assert!(offsets.contains(&(3, 0)));
        assert!(offsets.contains(&(2, 2)));
        assert!(!offsets.contains(&(3, 3)));
    }

    #[test]
    fn test_row_spans_cover_offsets() {
        for se in [
            StructuringElement::Square(2),
            StructuringElement::Disk(16),
            StructuringElement::Cross(3),
        ] {
            let covered: usize = se.row_spans().iter().map(|&(_, a, b)| (b - a + 1) as usize).sum();
            assert_eq!(covered, se.offsets().len());
        }
        // one run per row for convex shapes
        assert_eq!(StructuringElement::Disk(16).row_spans().len(), 33);
        assert_eq!(StructuringElement::Cross(3).row_spans().len(), 7);
    }

    #[test]
    fn test_validate_zero_radius() {
        assert!(StructuringElement::Square(0).validate().is_err());
        assert!(StructuringElement::Disk(0).validate().is_err());
        assert!(StructuringElement::Disk(16).validate().is_ok());
    }
}
