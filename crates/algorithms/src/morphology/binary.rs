//! Binary erosion and dilation of 0/1 masks
//!
//! Erosion keeps a set cell only when every in-grid, valid cell under the
//! structuring element is set; dilation sets a valid cell when any cell
//! under the element is set. Neighbours outside the grid or holding no-data
//! are ignored, no-data centers stay no-data.
//!
//! Each row of the element is a contiguous run, so a run is tested with two
//! lookups into per-row prefix counts instead of visiting every offset.

use crate::common::build_output;
use crate::mask::{self, NODATA};
use crate::maybe_rayon::*;
use greensat_core::raster::Raster;
use greensat_core::{Algorithm, Error, Result};

use super::element::StructuringElement;

/// Parameters shared by erosion and dilation
#[derive(Debug, Clone, Default)]
pub struct MorphologyParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Erosion algorithm
#[derive(Debug, Clone, Default)]
pub struct Erode;

impl Algorithm for Erode {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = MorphologyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Erode"
    }

    fn description(&self) -> &'static str {
        "Binary erosion (minimum filter over structuring element)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erode(&input, &params.element)
    }
}

/// Dilation algorithm
#[derive(Debug, Clone, Default)]
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = MorphologyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dilate"
    }

    fn description(&self) -> &'static str {
        "Binary dilation (maximum filter over structuring element)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, &params.element)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Erode,
    Dilate,
}

/// Minimum filter on a 0/1 mask
pub fn erode(mask: &Raster<u8>, element: &StructuringElement) -> Result<Raster<u8>> {
    apply(mask, element, Op::Erode)
}

/// Maximum filter on a 0/1 mask
pub fn dilate(mask: &Raster<u8>, element: &StructuringElement) -> Result<Raster<u8>> {
    apply(mask, element, Op::Dilate)
}

/// Erode with a disk of `erosion_radius`, then dilate with a disk of
/// `dilation_radius`: drops specks and grows what survives.
pub fn clean_mask(mask: &Raster<u8>, erosion_radius: usize, dilation_radius: usize) -> Result<Raster<u8>> {
    let eroded = erode(mask, &StructuringElement::Disk(erosion_radius))?;
    dilate(&eroded, &StructuringElement::Disk(dilation_radius))
}

/// Per-row prefix counts of set and valid cells, `cols + 1` entries per row
struct PrefixCounts {
    stride: usize,
    set: Vec<u32>,
    valid: Vec<u32>,
}

impl PrefixCounts {
    fn new(mask: &Raster<u8>) -> Self {
        let (rows, cols) = mask.shape();
        let stride = cols + 1;
        let mut set = vec![0u32; rows * stride];
        let mut valid = vec![0u32; rows * stride];
        for (row, line) in mask.data().rows().into_iter().enumerate() {
            let base = row * stride;
            for (col, &v) in line.iter().enumerate() {
                set[base + col + 1] = set[base + col] + u32::from(mask::is_set(v));
                valid[base + col + 1] = valid[base + col] + u32::from(mask::is_valid(v));
            }
        }
        Self { stride, set, valid }
    }

    /// (set, valid) counts over columns `c0..=c1` of `row`
    #[inline]
    fn span(&self, row: usize, c0: usize, c1: usize) -> (u32, u32) {
        let base = row * self.stride;
        (
            self.set[base + c1 + 1] - self.set[base + c0],
            self.valid[base + c1 + 1] - self.valid[base + c0],
        )
    }
}

fn apply(mask: &Raster<u8>, element: &StructuringElement, op: Op) -> Result<Raster<u8>> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let spans = element.row_spans();
    let counts = PrefixCounts::new(mask);

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![NODATA; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { mask.get_unchecked(row, col) };
                if !mask::is_valid(center) {
                    continue;
                }

                let r = row as isize;
                let c = col as isize;
                let mut hit = op == Op::Erode;

                for &(dr, c0, c1) in &spans {
                    let nr = r + dr;
                    if nr < 0 || nr >= rows as isize {
                        continue;
                    }
                    let lo = (c + c0).max(0);
                    let hi = (c + c1).min(cols as isize - 1);
                    if lo > hi {
                        continue;
                    }
                    let (set, valid) = counts.span(nr as usize, lo as usize, hi as usize);
                    match op {
                        Op::Erode if set < valid => {
                            hit = false;
                            break;
                        }
                        Op::Dilate if set > 0 => {
                            hit = true;
                            break;
                        }
                        _ => {}
                    }
                }

                *out = mask::from_bool(hit);
            }

            row_data
        })
        .collect();

    build_output(mask, output_data, NODATA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{CLEAR, SET};
    use greensat_core::GeoTransform;

    fn make_mask(rows: usize, cols: usize, value: u8) -> Raster<u8> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    /// Straightforward offset-by-offset reference
    fn naive(mask: &Raster<u8>, element: &StructuringElement, op: Op) -> Raster<u8> {
        let (rows, cols) = mask.shape();
        let mut out = mask.like(NODATA);
        for row in 0..rows {
            for col in 0..cols {
                let center = mask.get(row, col).unwrap();
                if !mask::is_valid(center) {
                    continue;
                }
                let mut values = Vec::new();
                for (dr, dc) in element.offsets() {
                    let (nr, nc) = (row as isize + dr, col as isize + dc);
                    if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                        let v = mask.get(nr as usize, nc as usize).unwrap();
                        if mask::is_valid(v) {
                            values.push(v);
                        }
                    }
                }
                let v = match op {
                    Op::Erode => values.iter().all(|&v| v == SET),
                    Op::Dilate => values.iter().any(|&v| v == SET),
                };
                out.set(row, col, mask::from_bool(v)).unwrap();
            }
        }
        out
    }

    fn scattered(rows: usize, cols: usize) -> Raster<u8> {
        let data = (0..rows * cols)
            .map(|i| match (i * 2654435761usize) % 97 {
                0..=40 => SET,
                41..=44 => NODATA,
                _ => CLEAR,
            })
            .collect();
        Raster::from_vec(data, rows, cols).unwrap()
    }

    #[test]
    fn test_matches_naive() {
        let mask = scattered(23, 31);
        for se in [
            StructuringElement::Square(1),
            StructuringElement::Disk(3),
            StructuringElement::Cross(2),
        ] {
            assert_eq!(erode(&mask, &se).unwrap().data(), naive(&mask, &se, Op::Erode).data());
            assert_eq!(dilate(&mask, &se).unwrap().data(), naive(&mask, &se, Op::Dilate).data());
        }
    }

    #[test]
    fn test_erode_removes_speck() {
        let mut mask = make_mask(11, 11, CLEAR);
        mask.set(5, 5, SET).unwrap();
        let out = erode(&mask, &StructuringElement::Disk(1)).unwrap();
        assert_eq!(out.count_where(mask::is_set), 0);
    }

    #[test]
    fn test_dilate_grows_disk() {
        let mut mask = make_mask(21, 21, CLEAR);
        mask.set(10, 10, SET).unwrap();
        let out = dilate(&mask, &StructuringElement::Disk(3)).unwrap();
        assert_eq!(out.count_where(mask::is_set), StructuringElement::Disk(3).offsets().len());
        assert_eq!(out.get(10, 13).unwrap(), SET);
        assert_eq!(out.get(13, 13).unwrap(), CLEAR);
    }

    #[test]
    fn test_edges_ignore_outside() {
        // A fully set mask stays set right up to the border
        let mask = make_mask(6, 6, SET);
        let out = erode(&mask, &StructuringElement::Disk(3)).unwrap();
        assert_eq!(out.count_where(mask::is_set), 36);
    }

    #[test]
    fn test_nodata_center_is_preserved() {
        let mut mask = make_mask(5, 5, SET);
        mask.set(2, 2, NODATA).unwrap();
        let out = dilate(&mask, &StructuringElement::Square(1)).unwrap();
        assert_eq!(out.get(2, 2).unwrap(), NODATA);
        assert_eq!(out.nodata(), Some(NODATA));
    }

    #[test]
    fn test_second_clean_keeps_set_pixels_and_stays_within_dilation_reach() {
        let mask = scattered(60, 60);
        let once = clean_mask(&mask, 3, 16).unwrap();
        let twice = clean_mask(&once, 3, 16).unwrap();
        // twice = erode(once) grown by 16, so it can only add cells within
        // one dilation radius of a cell already set
        let reach = dilate(&once, &StructuringElement::Disk(16)).unwrap();

        let mut added = 0;
        for ((a, b), r) in once.data().iter().zip(twice.data().iter()).zip(reach.data().iter()) {
            if *a == SET {
                assert_eq!(*b, SET);
            }
            if *b == SET {
                assert_eq!(*r, SET);
                if *a != SET {
                    added += 1;
                }
            }
        }
        assert!(added <= reach.count_where(mask::is_set) - once.count_where(mask::is_set));
    }

    #[test]
    fn test_opening_is_idempotent_on_blob() {
        let mut mask = make_mask(40, 40, CLEAR);
        for r in 12..28 {
            for c in 10..30 {
                mask.set(r, c, SET).unwrap();
            }
        }
        let once = clean_mask(&mask, 2, 2).unwrap();
        let twice = clean_mask(&once, 2, 2).unwrap();
        assert_eq!(once.data(), twice.data());
    }

    #[test]
    fn test_zero_radius_rejected() {
        let mask = make_mask(3, 3, SET);
        assert!(erode(&mask, &StructuringElement::Disk(0)).is_err());
    }
}
