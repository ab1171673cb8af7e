//! Neighborhood shapes for focal raster operations

/// Defines a neighborhood pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// Square neighborhood of given radius (side = 2r + 1)
    Square(usize),
    /// Circular neighborhood of given radius (in cells)
    Circle(usize),
}

impl Neighborhood {
    /// Get the radius of the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Square(r) | Neighborhood::Circle(r) => *r,
        }
    }

    /// Get the size of the neighborhood (width and height)
    pub fn size(&self) -> usize {
        self.radius() * 2 + 1
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Square(r) => {
                let r = *r as isize;
                dr.abs() <= r && dc.abs() <= r
            }
            Neighborhood::Circle(r) => {
                let r = *r as f64;
                let dist = ((dr * dr + dc * dc) as f64).sqrt();
                dist <= r
            }
        }
    }

    /// Relative (row, col) positions in this neighborhood, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::new();

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_offsets() {
        assert_eq!(Neighborhood::Square(1).offsets().len(), 9);
        assert_eq!(Neighborhood::Square(3).offsets().len(), 49);
        // Circle(1): center + 4 cardinal
        assert_eq!(Neighborhood::Circle(1).offsets().len(), 5);
    }

    #[test]
    fn test_circle_excludes_far_corners() {
        let c = Neighborhood::Circle(3);
        assert!(c.contains(3, 0));
        assert!(!c.contains(3, 3));
        assert_eq!(c.size(), 7);
    }
}
