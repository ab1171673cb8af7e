//! Cloud shadow projection
//!
//! Shadows fall on the side of a cloud away from the sun. Walking from a
//! pixel toward the sun, a cloud found within the search distance may be
//! casting a shadow on that pixel.

use crate::common::build_output;
use crate::mask;
use crate::maybe_rayon::*;
use greensat_core::raster::Raster;
use greensat_core::{Error, Result};

/// Direction of the search in degrees counter-clockwise from east, given
/// the solar azimuth in degrees clockwise from north.
pub fn shadow_projection_angle(solar_azimuth: f64) -> f64 {
    90.0 - solar_azimuth
}

/// Directional distance transform of a 0/1 mask.
///
/// For every pixel, steps `k = 1..=max_distance` along `angle` (degrees
/// counter-clockwise from east, rows increase southward) and records the
/// first `k` that lands on a set pixel. Set pixels have distance 0; pixels
/// with no set pixel within reach (or before leaving the grid) are NaN.
pub fn directional_distance(source: &Raster<u8>, angle: f64, max_distance: usize) -> Result<Raster<f64>> {
    if !angle.is_finite() {
        return Err(Error::InvalidParameter {
            name: "angle",
            value: angle.to_string(),
            reason: "projection angle must be finite".to_string(),
        });
    }

    let (rows, cols) = source.shape();
    let (sin, cos) = angle.to_radians().sin_cos();
    let steps: Vec<(isize, isize)> = (1..=max_distance)
        .map(|k| {
            let k = k as f64;
            (-(k * sin).round() as isize, (k * cos).round() as isize)
        })
        .collect();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if mask::is_set(unsafe { source.get_unchecked(row, col) }) {
                    *out = 0.0;
                    continue;
                }
                for (k, &(dr, dc)) in steps.iter().enumerate() {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        break;
                    }
                    if mask::is_set(unsafe { source.get_unchecked(nr as usize, nc as usize) }) {
                        *out = (k + 1) as f64;
                        break;
                    }
                }
            }
            row_data
        })
        .collect();

    build_output(source, data, f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{CLEAR, SET};

    fn cloud_at(rows: usize, cols: usize, r: usize, c: usize) -> Raster<u8> {
        let mut m = Raster::filled(rows, cols, CLEAR);
        m.set(r, c, SET).unwrap();
        m
    }

    #[test]
    fn test_projection_angle() {
        assert_eq!(shadow_projection_angle(90.0), 0.0);
        assert_eq!(shadow_projection_angle(150.0), -60.0);
    }

    #[test]
    fn test_search_toward_east() {
        // Sun due east (azimuth 90): shadow lies west of the cloud
        let m = cloud_at(5, 20, 2, 15);
        let d = directional_distance(&m, shadow_projection_angle(90.0), 10).unwrap();
        assert_eq!(d.get(2, 15).unwrap(), 0.0);
        assert_eq!(d.get(2, 12).unwrap(), 3.0);
        assert_eq!(d.get(2, 5).unwrap(), 10.0);
        assert!(d.get(2, 4).unwrap().is_nan());
        assert!(d.get(2, 16).unwrap().is_nan());
        assert!(d.get(3, 12).unwrap().is_nan());
    }

    #[test]
    fn test_search_toward_south() {
        // Sun due south (azimuth 180): angle -90, search moves down the rows
        let m = cloud_at(20, 5, 15, 2);
        let d = directional_distance(&m, shadow_projection_angle(180.0), 50).unwrap();
        assert_eq!(d.get(10, 2).unwrap(), 5.0);
        assert!(d.get(17, 2).unwrap().is_nan());
    }

    #[test]
    fn test_diagonal_steps() {
        // Angle 45: north-east
        let m = cloud_at(10, 10, 2, 7);
        let d = directional_distance(&m, 45.0, 10).unwrap();
        // k = 7 gives (round(-4.95), round(4.95)) = (-5, 5)
        assert_eq!(d.get(7, 2).unwrap(), 7.0);
    }

    #[test]
    fn test_nan_angle_rejected() {
        let m = cloud_at(3, 3, 1, 1);
        assert!(directional_distance(&m, f64::NAN, 5).is_err());
    }
}
