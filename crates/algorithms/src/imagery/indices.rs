//! Spectral vegetation indices
//!
//! Indices operate on single-band rasters (one band per raster) that share
//! a grid.

use crate::common::{build_output, check_dimensions, is_nodata_f64};
use crate::maybe_rayon::*;
use greensat_core::raster::Raster;
use greensat_core::{Algorithm, Error, Result};

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Pixels where the bands sum to zero or either is nodata are set to NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum == 0.0 {
                    continue;
                }

                *out = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, data, f64::NAN)
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Reflectances are used as given, no scaling is applied. For non-negative
/// reflectances the result lies in [-1, 1].
///
/// # Arguments
/// * `nir` - Near-infrared band (Sentinel-2 B8)
/// * `red` - Red band (Sentinel-2 B4)
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// NDVI over a (NIR, Red) pair
#[derive(Debug, Clone, Default)]
pub struct Ndvi;

impl Algorithm for Ndvi {
    type Input = (Raster<f64>, Raster<f64>);
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "NDVI"
    }

    fn description(&self) -> &'static str {
        "Normalized difference vegetation index (NIR - Red) / (NIR + Red)"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        let (nir, red) = input;
        ndvi(&nir, &red)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use greensat_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_ndvi_dense_vegetation() {
        let nir = make_band(3, 3, 3000.0);
        let red = make_band(3, 3, 1000.0);
        let out = ndvi(&nir, &red).unwrap();
        assert_relative_eq!(out.get(1, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_ndvi_equal_bands_is_zero() {
        let b = make_band(2, 2, 1000.0);
        assert_eq!(ndvi(&b, &b).unwrap().get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_ndvi_zero_sum_is_nodata() {
        let zero = make_band(2, 2, 0.0);
        let out = ndvi(&zero, &zero).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_ndvi_range() {
        let values = [0.0, 1.0, 17.0, 250.0, 999.0, 4000.0, 10000.0];
        for &n in &values {
            for &r in &values {
                let out = ndvi(&make_band(1, 1, n), &make_band(1, 1, r)).unwrap();
                let v = out.get(0, 0).unwrap();
                if n + r == 0.0 {
                    assert!(v.is_nan());
                } else {
                    assert!((-1.0..=1.0).contains(&v), "ndvi({}, {}) = {}", n, r, v);
                }
            }
        }
    }

    #[test]
    fn test_nodata_propagates() {
        let mut nir = make_band(2, 2, 3000.0);
        nir.set(0, 1, f64::NAN).unwrap();
        let out = Ndvi.execute((nir, make_band(2, 2, 1000.0)), ()).unwrap();
        assert!(out.get(0, 1).unwrap().is_nan());
        assert_relative_eq!(out.get(1, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(ndvi(&make_band(2, 2, 1.0), &make_band(3, 2, 1.0)).is_err());
    }
}
