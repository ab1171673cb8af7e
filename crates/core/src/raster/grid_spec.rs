//! Working grids snapped to a global lattice
//!
//! Every grid built by [`GridSpec::covering`] has its origin on an integer
//! multiple of its scale, so two grids with the same CRS and scale are
//! windows into one shared lattice and their pixels coincide exactly.

use crate::crs::{Projector, CRS};
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform};

/// Georeferenced grid definition (no data)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    crs: CRS,
}

/// Rectangular block of cells inside a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub row_offset: usize,
    pub col_offset: usize,
    pub rows: usize,
    pub cols: usize,
}

impl GridWindow {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self { row_offset, col_offset, rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GridSpec {
    pub fn new(transform: GeoTransform, rows: usize, cols: usize, crs: CRS) -> Self {
        Self { transform, rows, cols, crs }
    }

    /// Smallest snapped grid of square `scale` pixels covering `extent`.
    ///
    /// A degenerate extent (a point or a line) still yields one pixel.
    pub fn covering(extent: &Extent, scale: f64, crs: CRS) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::InvalidParameter {
                name: "scale",
                value: scale.to_string(),
                reason: "grid scale must be a positive number of map units".into(),
            });
        }
        if !(extent.max_x >= extent.min_x && extent.max_y >= extent.min_y) {
            return Err(Error::InvalidParameter {
                name: "extent",
                value: format!("{:?}", extent),
                reason: "extent is inverted or not finite".into(),
            });
        }

        let min_x = (extent.min_x / scale).floor() * scale;
        let max_x = (extent.max_x / scale).ceil() * scale;
        let min_y = (extent.min_y / scale).floor() * scale;
        let max_y = (extent.max_y / scale).ceil() * scale;

        let cols = (((max_x - min_x) / scale).round() as usize).max(1);
        let rows = (((max_y - min_y) / scale).round() as usize).max(1);

        Ok(Self::new(GeoTransform::north_up(min_x, max_y, scale), rows, cols, crs))
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn crs(&self) -> CRS {
        self.crs
    }

    /// Pixel size in map units
    pub fn scale(&self) -> f64 {
        self.transform.cell_size()
    }

    pub fn extent(&self) -> Extent {
        self.transform.bounds(self.cols, self.rows)
    }

    /// Map coordinates of a pixel center
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Pixel containing `(x, y)`, if inside the grid
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.transform.pixel_at(x, y, self.rows, self.cols)
    }

    /// The whole grid as a window
    pub fn full_window(&self) -> GridWindow {
        GridWindow::new(0, 0, self.rows, self.cols)
    }

    /// Sub-grid covering `window`
    pub fn window(&self, window: &GridWindow) -> GridSpec {
        let (x, y) = self
            .transform
            .pixel_to_geo_corner(window.col_offset, window.row_offset);
        let mut transform = self.transform;
        transform.origin_x = x;
        transform.origin_y = y;
        GridSpec::new(transform, window.rows, window.cols, self.crs)
    }
    /// Window of `source` that covers this grid's footprint.
    ///
    /// The outline of this grid is projected into the source CRS and padded
    /// by one source pixel, so every pixel center of this grid samples
    /// inside the window. `None` when the footprints do not overlap.
    pub fn source_window(&self, source: &GridSpec) -> Result<Option<GridWindow>> {
        let projector = Projector::new(&self.crs, &source.crs)?;
        let src = source.transform;

        let steps = |n: usize| n.clamp(1, EDGE_SAMPLES);
        let (col_steps, row_steps) = (steps(self.cols), steps(self.rows));
        let mut outline = Vec::with_capacity(2 * (col_steps + row_steps + 2));
        for i in 0..=col_steps {
            let col = i as f64 * self.cols as f64 / col_steps as f64;
            outline.push((col, 0.0));
            outline.push((col, self.rows as f64));
        }
        for j in 0..=row_steps {
            let row = j as f64 * self.rows as f64 / row_steps as f64;
            outline.push((0.0, row));
            outline.push((self.cols as f64, row));
        }

        let (mut c_min, mut c_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut r_min, mut r_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for (col, row) in outline {
            let x = self.transform.origin_x + col * self.transform.pixel_width;
            let y = self.transform.origin_y + row * self.transform.pixel_height;
            let (sx, sy) = projector.project(x, y);
            let (pc, pr) = src.geo_to_pixel(sx, sy);
            c_min = c_min.min(pc);
            c_max = c_max.max(pc);
            r_min = r_min.min(pr);
            r_max = r_max.max(pr);
        }
        if !(c_min.is_finite() && c_max.is_finite() && r_min.is_finite() && r_max.is_finite()) {
            return Ok(None);
        }

        let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
        let c0 = clamp(c_min.floor() - 1.0, source.cols);
        let c1 = clamp(c_max.ceil() + 1.0, source.cols);
        let r0 = clamp(r_min.floor() - 1.0, source.rows);
        let r1 = clamp(r_max.ceil() + 1.0, source.rows);
        if c0 >= c1 || r0 >= r1 {
            return Ok(None);
        }
        Ok(Some(GridWindow::new(r0, c0, r1 - r0, c1 - c0)))
    }
}

/// Points sampled along each edge of a grid outline
const EDGE_SAMPLES: usize = 32;
