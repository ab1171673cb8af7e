//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform, GridSpec, GridWindow, RasterElement};
use ndarray::{s, Array2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS).
///
/// # Example
///
/// ```ignore
/// use greensat_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(100, 100);
/// raster.set(10, 20, 0.42)?;
/// let value = raster.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster laid out on `grid`, filled with `value`
    pub fn on_grid(grid: &GridSpec, value: T) -> Self {
        let mut raster = Self::filled(grid.rows(), grid.cols(), value);
        raster.transform = *grid.transform();
        raster.crs = Some(grid.crs());
        raster
    }

    /// Create a zeroed raster with the same metadata but different data type
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs,
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs,
            nodata: self.nodata,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map extent covered by the raster
    pub fn bounds(&self) -> Extent {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// The grid this raster is laid out on, if it carries a CRS
    pub fn grid(&self) -> Option<GridSpec> {
        let crs = self.crs?;
        Some(GridSpec::new(self.transform, self.rows(), self.cols(), crs))
    }

    /// Copy of the cells inside `window`, georeferenced at the window origin
    pub fn window(&self, window: &GridWindow) -> Result<Raster<T>> {
        self.check_window(window)?;
        let data = self
            .data
            .slice(s![
                window.row_offset..window.row_offset + window.rows,
                window.col_offset..window.col_offset + window.cols
            ])
            .to_owned();
        let (x, y) = self
            .transform
            .pixel_to_geo_corner(window.col_offset, window.row_offset);
        let mut transform = self.transform;
        transform.origin_x = x;
        transform.origin_y = y;
        Ok(Raster {
            data,
            transform,
            crs: self.crs,
            nodata: self.nodata,
        })
    }

    /// Write the `from` block of `src` into this raster at `(row, col)`
    pub fn paste(&mut self, src: &Raster<T>, from: &GridWindow, row: usize, col: usize) -> Result<()> {
        src.check_window(from)?;
        self.check_window(&GridWindow::new(row, col, from.rows, from.cols))?;
        let block = src.data.slice(s![
            from.row_offset..from.row_offset + from.rows,
            from.col_offset..from.col_offset + from.cols
        ]);
        self.data
            .slice_mut(s![row..row + from.rows, col..col + from.cols])
            .assign(&block);
        Ok(())
    }

    fn check_window(&self, window: &GridWindow) -> Result<()> {
        let (rows, cols) = self.shape();
        if window.row_offset + window.rows > rows || window.col_offset + window.cols > cols {
            return Err(Error::IndexOutOfBounds {
                row: window.row_offset + window.rows,
                col: window.col_offset + window.cols,
                rows,
                cols,
            });
        }
        Ok(())
    }

    // Coordinate conversion

    /// Convert pixel coordinates to the map coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert map coordinates to fractional pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// Value of the pixel containing `(x, y)`, `None` outside the raster
    pub fn sample(&self, x: f64, y: f64) -> Option<T> {
        let (rows, cols) = self.shape();
        let (r, c) = self.transform.pixel_at(x, y, rows, cols)?;
        Some(unsafe { self.get_unchecked(r, c) })
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells satisfying `pred`
    pub fn count_where<F: Fn(T) -> bool>(&self, pred: F) -> usize {
        self.data.iter().filter(|&&v| pred(v)).count()
    }

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_and_paste() {
        let mut raster: Raster<f64> = Raster::from_vec((0..12).map(f64::from).collect(), 3, 4).unwrap();
        raster.set_transform(GeoTransform::north_up(100.0, 200.0, 10.0));

        let w = raster.window(&GridWindow::new(1, 2, 2, 2)).unwrap();
        assert_eq!(w.get(0, 0).unwrap(), 6.0);
        assert_eq!(w.transform().origin_x, 120.0);
        assert_eq!(w.transform().origin_y, 190.0);
        assert!(raster.window(&GridWindow::new(2, 2, 2, 2)).is_err());

        let mut blank: Raster<f64> = Raster::new(3, 4);
        blank.paste(&w, &GridWindow::new(0, 0, 2, 2), 0, 0).unwrap();
        assert_eq!(blank.get(1, 1).unwrap(), 11.0);
        assert!(blank.paste(&w, &GridWindow::new(0, 0, 2, 2), 2, 3).is_err());
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f64> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
        assert!(raster.grid().is_none());
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_sample_by_map_coordinates() {
        let mut raster: Raster<f64> = Raster::new(4, 4);
        raster.set_transform(GeoTransform::north_up(1000.0, 2000.0, 10.0));
        raster.set(1, 2, 7.0).unwrap();
        assert_eq!(raster.sample(1025.0, 1985.0), Some(7.0));
        assert_eq!(raster.sample(999.0, 1985.0), None);
    }

    #[test]
    fn test_raster_statistics_skip_nan() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f64).unwrap();
            }
        }
        raster.set(0, 0, f64::NAN).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
    }
}
