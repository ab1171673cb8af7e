//! Helpers shared by the kernels

use ndarray::Array2;
use greensat_core::raster::{Raster, RasterElement};
use greensat_core::{Error, Result};

pub(crate) fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

pub(crate) fn check_dimensions<A: RasterElement, B: RasterElement>(
    a: &Raster<A>,
    b: &Raster<B>,
) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

pub(crate) fn build_output<T: RasterElement, U: RasterElement>(
    template: &Raster<T>,
    data: Vec<U>,
    nodata: U,
) -> Result<Raster<U>> {
    let (rows, cols) = template.shape();
    let mut output = template.with_same_meta::<U>(rows, cols);
    output.set_nodata(Some(nodata));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
