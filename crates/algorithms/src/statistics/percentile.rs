//! Percentiles of raster values

use crate::common::{check_dimensions, is_nodata_f64};
use crate::mask;
use greensat_core::raster::Raster;
use greensat_core::{Error, Result};

/// Percentile `p` (0-100) of `values` by linear interpolation between the
/// closest ranks. Reorders `values`; NaNs are ignored.
pub fn percentile_of_values(values: &mut Vec<f64>, p: f64) -> Result<Option<f64>> {
    if !(0.0..=100.0).contains(&p) {
        return Err(Error::InvalidParameter {
            name: "percentile",
            value: p.to_string(),
            reason: "percentile must be between 0 and 100".to_string(),
        });
    }
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return Ok(None);
    }
    values.sort_unstable_by(f64::total_cmp);

    let rank = p / 100.0 * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Ok(Some(values[lo] + frac * (values[hi] - values[lo])))
}

/// Percentile of a raster's valid values, optionally restricted to the
/// cells where `within` is set (e.g. a rasterized region).
pub fn percentile(raster: &Raster<f64>, within: Option<&Raster<u8>>, p: f64) -> Result<Option<f64>> {
    if let Some(m) = within {
        check_dimensions(raster, m)?;
    }
    let nodata = raster.nodata();
    let mut values: Vec<f64> = match within {
        Some(m) => raster
            .data()
            .iter()
            .zip(m.data().iter())
            .filter(|&(_, &inside)| mask::is_set(inside))
            .map(|(&v, _)| v)
            .filter(|&v| !is_nodata_f64(v, nodata))
            .collect(),
        None => raster
            .data()
            .iter()
            .copied()
            .filter(|&v| !is_nodata_f64(v, nodata))
            .collect(),
    };
    percentile_of_values(&mut values, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_interpolation() {
        let mut v: Vec<f64> = (1..=5).map(f64::from).collect();
        assert_relative_eq!(percentile_of_values(&mut v, 80.0).unwrap().unwrap(), 4.2);
        assert_relative_eq!(percentile_of_values(&mut v, 0.0).unwrap().unwrap(), 1.0);
        assert_relative_eq!(percentile_of_values(&mut v, 100.0).unwrap().unwrap(), 5.0);
        assert_relative_eq!(percentile_of_values(&mut v, 50.0).unwrap().unwrap(), 3.0);
    }

    #[test]
    fn test_invalid_percentile() {
        assert!(percentile_of_values(&mut vec![1.0], 101.0).is_err());
        assert!(percentile_of_values(&mut vec![1.0], -1.0).is_err());
    }

    #[test]
    fn test_raster_with_region() {
        let r = Raster::from_vec(vec![0.1, 0.9, f64::NAN, 0.3], 2, 2).unwrap();
        let inside = Raster::from_vec(vec![1u8, 0, 1, 1], 2, 2).unwrap();
        let p = percentile(&r, Some(&inside), 100.0).unwrap();
        assert_eq!(p, Some(0.3));
        assert_eq!(percentile(&r, None, 100.0).unwrap(), Some(0.9));
    }

    #[test]
    fn test_no_values() {
        let r = Raster::filled(2, 2, f64::NAN);
        assert_eq!(percentile(&r, None, 80.0).unwrap(), None);
    }
}
