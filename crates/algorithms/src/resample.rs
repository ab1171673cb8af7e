//! Resampling a raster onto a target grid
//!
//! Target pixel centers are projected into the source CRS and looked up
//! there. Used both to bring scene bands onto a working grid and to coarsen
//! masks between the morphology and shadow scales.

use crate::maybe_rayon::*;
use greensat_core::crs::Projector;
use greensat_core::raster::{GridSpec, Raster, RasterElement};
use greensat_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Resampling method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    /// Source pixel containing the target pixel center
    #[default]
    Nearest,
    /// Largest valid source value among the source pixels whose centers
    /// fall inside the target pixel (any-set for 0/1 masks)
    Max,
}

/// Resample `source` onto `grid`.
///
/// Target pixels with no valid source value get the source no-data value
/// (or the type default). The output carries the grid's transform and CRS.
pub fn resample<T: RasterElement>(source: &Raster<T>, grid: &GridSpec, method: Resampling) -> Result<Raster<T>> {
    let src_crs = source
        .crs()
        .copied()
        .ok_or_else(|| Error::UnsupportedCrs("source raster has no CRS".to_string()))?;
    let projector = Projector::new(&grid.crs(), &src_crs)?;
    let nodata = source.nodata().unwrap_or_else(T::default_nodata);
    let transform = *grid.transform();
    let src_transform = *source.transform();
    let (src_rows, src_cols) = source.shape();
    let (rows, cols) = grid.shape();

    let lookup = |x: f64, y: f64| -> Option<T> {
        let (sx, sy) = projector.project(x, y);
        source.sample(sx, sy).filter(|&v| !source.is_nodata(v))
    };

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![nodata; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let value = match method {
                    Resampling::Nearest => {
                        let (x, y) = transform.pixel_to_geo(col, row);
                        lookup(x, y)
                    }
                    Resampling::Max => {
                        // Footprint corners in source pixel space
                        let mut c_min = f64::INFINITY;
                        let mut c_max = f64::NEG_INFINITY;
                        let mut r_min = f64::INFINITY;
                        let mut r_max = f64::NEG_INFINITY;
                        for (cc, rr) in [(col, row), (col + 1, row), (col, row + 1), (col + 1, row + 1)] {
                            let (x, y) = transform.pixel_to_geo_corner(cc, rr);
                            let (sx, sy) = projector.project(x, y);
                            let (pc, pr) = src_transform.geo_to_pixel(sx, sy);
                            c_min = c_min.min(pc);
                            c_max = c_max.max(pc);
                            r_min = r_min.min(pr);
                            r_max = r_max.max(pr);
                        }
                        // Source pixel i has its center at i + 0.5
                        let c0 = (c_min - 0.5).ceil().max(0.0) as usize;
                        let c1 = ((c_max - 0.5).ceil().max(0.0) as usize).min(src_cols);
                        let r0 = (r_min - 0.5).ceil().max(0.0) as usize;
                        let r1 = ((r_max - 0.5).ceil().max(0.0) as usize).min(src_rows);

                        if c0 >= c1 || r0 >= r1 {
                            // Source coarser than target
                            let (x, y) = transform.pixel_to_geo(col, row);
                            lookup(x, y)
                        } else {
                            let mut best: Option<T> = None;
                            for sr in r0..r1 {
                                for sc in c0..c1 {
                                    let v = unsafe { source.get_unchecked(sr, sc) };
                                    if source.is_nodata(v) {
                                        continue;
                                    }
                                    if best.map_or(true, |b| v > b) {
                                        best = Some(v);
                                    }
                                }
                            }
                            best
                        }
                    }
                };
                if let Some(v) = value {
                    *out = v;
                }
            }
            row_data
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(transform);
    output.set_crs(Some(grid.crs()));
    output.set_nodata(Some(nodata));
    Ok(output)
}
