//! Per-pixel cloud test
//!
//! `cloud = (probability > 65 AND CDI < -0.5) OR (cirrus * 0.0001 > 0.01)`

use crate::common::{build_output, check_dimensions, is_nodata_f64};
use crate::mask::{self, NODATA};
use crate::maybe_rayon::*;
use greensat_core::raster::Raster;
use greensat_core::Result;
use serde::{Deserialize, Serialize};

/// Thresholds of the cloud test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudParams {
    /// Cloud probability (0-100) above which a pixel may be cloud
    pub probability_threshold: f64,
    /// CDI below which a probable cloud is confirmed
    pub cdi_threshold: f64,
    /// Scaled cirrus reflectance above which a pixel is cloud regardless
    pub cirrus_threshold: f64,
    /// Scale applied to the raw B10 digital numbers
    pub cirrus_scale: f64,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            probability_threshold: 65.0,
            cdi_threshold: -0.5,
            cirrus_threshold: 0.01,
            cirrus_scale: 0.0001,
        }
    }
}

/// Evaluate the cloud test on co-registered probability, CDI and cirrus rasters.
///
/// Returns a 0/1 mask. A no-data term is false; the pixel is no-data only
/// when both the probability and the cirrus band are missing.
pub fn cloud_condition(
    probability: &Raster<f64>,
    cdi: &Raster<f64>,
    cirrus: &Raster<f64>,
    params: &CloudParams,
) -> Result<Raster<u8>> {
    check_dimensions(probability, cdi)?;
    check_dimensions(probability, cirrus)?;

    let (rows, cols) = probability.shape();
    let (nd_p, nd_d, nd_c) = (probability.nodata(), cdi.nodata(), cirrus.nodata());

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![NODATA; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let p = unsafe { probability.get_unchecked(row, col) };
                let d = unsafe { cdi.get_unchecked(row, col) };
                let c = unsafe { cirrus.get_unchecked(row, col) };

                let p_valid = !is_nodata_f64(p, nd_p);
                let c_valid = !is_nodata_f64(c, nd_c);
                if !p_valid && !c_valid {
                    continue;
                }

                let displaced = !is_nodata_f64(d, nd_d) && d < params.cdi_threshold;
                let probable = p_valid && p > params.probability_threshold && displaced;
                let cirrus_hit = c_valid && c * params.cirrus_scale > params.cirrus_threshold;
                *out = mask::from_bool(probable || cirrus_hit);
            }
            row_data
        })
        .collect();

    build_output(probability, data, NODATA)
}
