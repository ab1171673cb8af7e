//! Binarize an index raster

use crate::common::{build_output, is_nodata_f64};
use crate::mask::{self, NODATA};
use crate::maybe_rayon::*;
use greensat_core::raster::Raster;
use greensat_core::{Algorithm, Error, Result};

/// Parameters for thresholding
#[derive(Debug, Clone)]
pub struct ThresholdParams {
    /// Cells with `value >= threshold` are set
    pub value: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self { value: 0.5 }
    }
}

/// Threshold algorithm
#[derive(Debug, Clone, Default)]
pub struct Threshold;

impl Algorithm for Threshold {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ThresholdParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Threshold"
    }

    fn description(&self) -> &'static str {
        "Binary mask of cells at or above a threshold"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        threshold(&input, params.value)
    }
}

/// 1 where `value >= threshold`, 0 below, 255 (no-data) where the input is no-data
pub fn threshold(raster: &Raster<f64>, threshold: f64) -> Result<Raster<u8>> {
    if threshold.is_nan() {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: "NaN".to_string(),
            reason: "threshold must be a number".to_string(),
        });
    }

    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![NODATA; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { raster.get_unchecked(row, col) };
                if !is_nodata_f64(v, nodata) {
                    *out = mask::from_bool(v >= threshold);
                }
            }
            row_data
        })
        .collect();

    build_output(raster, data, NODATA)
}
