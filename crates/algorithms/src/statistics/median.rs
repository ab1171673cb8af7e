//! Median reduction

use crate::common::{build_output, check_dimensions, is_nodata_f64};
use crate::maybe_rayon::*;
use greensat_core::raster::Raster;
use greensat_core::{Error, Result};

/// Exact median of `values`, reordering them in place.
///
/// Even counts give the mean of the two middle values; an empty slice has
/// no median. NaNs must be filtered out by the caller.
pub fn median(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return Some(upper);
    }
    let below = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((below + upper) / 2.0)
}

/// Per-pixel median over the valid values of a raster stack.
///
/// Pixels with no valid value in any layer are NaN.
pub fn median_of_stack(layers: &[Raster<f64>]) -> Result<Raster<f64>> {
    let first = layers
        .first()
        .ok_or_else(|| Error::Algorithm("median of an empty stack".to_string()))?;
    for layer in &layers[1..] {
        check_dimensions(first, layer)?;
    }

    let (rows, cols) = first.shape();
    let nodata: Vec<Option<f64>> = layers.iter().map(|l| l.nodata()).collect();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values = Vec::with_capacity(layers.len());
            for (col, out) in row_data.iter_mut().enumerate() {
                values.clear();
                for (layer, nd) in layers.iter().zip(&nodata) {
                    let v = unsafe { layer.get_unchecked(row, col) };
                    if !is_nodata_f64(v, *nd) {
                        values.push(v);
                    }
                }
                if let Some(m) = median(&mut values) {
                    *out = m;
                }
            }
            row_data
        })
        .collect();

    build_output(first, data, f64::NAN)
}
