//! Cloud Displacement Index (Frantz et al., 2018)
//!
//! The Sentinel-2 NIR bands B7, B8 and B8A are sensed at slightly different
//! times, so elevated clouds appear displaced between them while ground
//! features do not. With ratios `R8 = B8 / B8A` and `R7 = B7 / B8A` and their
//! local variances `V8`, `V7`:
//!
//! `CDI = (V7 - V8) / (V7 + V8)`
//!
//! Clouds give strongly negative values, bright ground stays near or above 0.

use crate::common::{build_output, check_dimensions, is_nodata_f64};
use crate::maybe_rayon::*;
use greensat_core::raster::Raster;
use greensat_core::{Algorithm, Error, Result};

/// Parameters for the CDI
#[derive(Debug, Clone)]
pub struct CdiParams {
    /// Variance window radius (window side = 2 * radius + 1)
    pub radius: usize,
}

impl Default for CdiParams {
    fn default() -> Self {
        Self { radius: 3 }
    }
}

/// CDI algorithm over (B7, B8, B8A)
#[derive(Debug, Clone, Default)]
pub struct CloudDisplacementIndex;

impl Algorithm for CloudDisplacementIndex {
    type Input = (Raster<f64>, Raster<f64>, Raster<f64>);
    type Output = Raster<f64>;
    type Params = CdiParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "CloudDisplacementIndex"
    }

    fn description(&self) -> &'static str {
        "Sentinel-2 cloud displacement index from B7/B8/B8A variance ratios"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (b7, b8, b8a) = input;
        cloud_displacement_index(&b7, &b8, &b8a, params.radius)
    }
}

/// Summed-area tables of count, sum and sum of squares of the valid cells
struct Moments {
    stride: usize,
    count: Vec<f64>,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Moments {
    fn new(values: &[f64], rows: usize, cols: usize) -> Self {
        let stride = cols + 1;
        let size = (rows + 1) * stride;
        let mut count = vec![0.0; size];
        let mut sum = vec![0.0; size];
        let mut sum_sq = vec![0.0; size];

        for row in 0..rows {
            let (mut rc, mut rs, mut rq) = (0.0, 0.0, 0.0);
            for col in 0..cols {
                let v = values[row * cols + col];
                if !v.is_nan() {
                    rc += 1.0;
                    rs += v;
                    rq += v * v;
                }
                let i = (row + 1) * stride + col + 1;
                let above = row * stride + col + 1;
                count[i] = count[above] + rc;
                sum[i] = sum[above] + rs;
                sum_sq[i] = sum_sq[above] + rq;
            }
        }
        Self { stride, count, sum, sum_sq }
    }

    fn rect(table: &[f64], stride: usize, r0: usize, c0: usize, r1: usize, c1: usize) -> f64 {
        table[r1 * stride + c1] - table[r0 * stride + c1] - table[r1 * stride + c0] + table[r0 * stride + c0]
    }

    /// Population variance over rows `r0..r1`, cols `c0..c1` (exclusive ends)
    fn variance(&self, r0: usize, c0: usize, r1: usize, c1: usize) -> Option<f64> {
        let n = Self::rect(&self.count, self.stride, r0, c0, r1, c1);
        if n < 1.0 {
            return None;
        }
        let s = Self::rect(&self.sum, self.stride, r0, c0, r1, c1);
        let q = Self::rect(&self.sum_sq, self.stride, r0, c0, r1, c1);
        let mean = s / n;
        Some((q / n - mean * mean).max(0.0))
    }
}

fn band_ratio(num: &Raster<f64>, den: &Raster<f64>) -> Vec<f64> {
    let (nd_num, nd_den) = (num.nodata(), den.nodata());
    num.data()
        .iter()
        .zip(den.data().iter())
        .map(|(&n, &d)| {
            if is_nodata_f64(n, nd_num) || is_nodata_f64(d, nd_den) || d == 0.0 {
                f64::NAN
            } else {
                n / d
            }
        })
        .collect()
}

/// Compute the cloud displacement index.
///
/// Variances use the valid cells of the `(2 * radius + 1)²` window clipped
/// to the raster. Cells with no-data input or zero total variance are NaN.
///
/// # Arguments
/// * `b7`, `b8`, `b8a` - top-of-atmosphere bands on the same grid
/// * `radius` - variance window radius
pub fn cloud_displacement_index(
    b7: &Raster<f64>,
    b8: &Raster<f64>,
    b8a: &Raster<f64>,
    radius: usize,
) -> Result<Raster<f64>> {
    check_dimensions(b8a, b7)?;
    check_dimensions(b8a, b8)?;
    if radius == 0 {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: "0".to_string(),
            reason: "CDI window radius must be at least 1".to_string(),
        });
    }

    let (rows, cols) = b8a.shape();
    let r8 = band_ratio(b8, b8a);
    let r7 = band_ratio(b7, b8a);
    let m8 = Moments::new(&r8, rows, cols);
    let m7 = Moments::new(&r7, rows, cols);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let r0 = row.saturating_sub(radius);
            let r1 = (row + radius + 1).min(rows);

            for (col, out) in row_data.iter_mut().enumerate() {
                let i = row * cols + col;
                if r8[i].is_nan() || r7[i].is_nan() {
                    continue;
                }
                let c0 = col.saturating_sub(radius);
                let c1 = (col + radius + 1).min(cols);

                let (Some(v8), Some(v7)) = (m8.variance(r0, c0, r1, c1), m7.variance(r0, c0, r1, c1)) else {
                    continue;
                };
                let total = v7 + v8;
                if total <= 0.0 {
                    continue;
                }
                *out = (v7 - v8) / total;
            }
            row_data
        })
        .collect();

    build_output(b8a, data, f64::NAN)
}
