//! Native GeoTIFF reading/writing (no GDAL dependency)
//!
//! Uses the `tiff` crate for TIFF I/O and writes the GeoTIFF tags needed to
//! georeference the output: ModelPixelScale, ModelTiepoint, a GeoKey
//! directory carrying the EPSG code, and the GDAL no-data tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, GridSpec, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Read a GeoTIFF file into a Raster
///
/// Reads the first band, the north-up georeferencing, the EPSG code from
/// the GeoKey directory and the GDAL no-data value when present.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

/// Read only the part of a GeoTIFF that covers `target`
///
/// Decodes just the strips or tiles intersecting the footprint of `target`
/// (see [`GridSpec::source_window`]), so memory follows the target grid
/// rather than the file. The result keeps the file's own resolution and
/// CRS, georeferenced at the window origin. `None` when the file does not
/// reach `target` at all.
pub fn read_geotiff_window<T, P>(path: P, target: &GridSpec) -> Result<Option<Raster<T>>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    let mut decoder = Decoder::new(file)?;
    let (width, height) = decoder.dimensions()?;
    let transform = read_geotransform(&mut decoder).ok_or_else(|| {
        Error::Other(format!("{} is not georeferenced", path.as_ref().display()))
    })?;
    let crs = read_crs(&mut decoder).ok_or_else(|| {
        Error::UnsupportedCrs(format!("{} has no EPSG code", path.as_ref().display()))
    })?;
    let nodata = read_nodata::<T, _>(&mut decoder);

    let source = GridSpec::new(transform, height as usize, width as usize, crs);
    let window = match target.source_window(&source)? {
        Some(w) => w,
        None => return Ok(None),
    };

    let (chunk_w, chunk_h) = decoder.chunk_dimensions();
    let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
    if chunk_w == 0 || chunk_h == 0 {
        return Err(Error::UnsupportedDataType("TIFF with empty chunks".to_string()));
    }
    let across = (width as usize).div_ceil(chunk_w);

    let fill = nodata.unwrap_or_else(T::default_nodata);
    let mut raster = Raster::filled(window.rows, window.cols, fill);
    let (r_end, c_end) = (window.row_offset + window.rows, window.col_offset + window.cols);

    for chunk_row in window.row_offset / chunk_h..=(r_end - 1) / chunk_h {
        for chunk_col in window.col_offset / chunk_w..=(c_end - 1) / chunk_w {
            let index = (chunk_row * across + chunk_col) as u32;
            let (data_w, data_h) = decoder.chunk_data_dimensions(index);
            let (data_w, data_h) = (data_w as usize, data_h as usize);
            let values: Vec<T> = decode_samples(decoder.read_chunk(index)?)?;
            if values.len() != data_w * data_h {
                return Err(Error::UnsupportedDataType(format!(
                    "expected a single-band chunk of {}x{}, decoded {} samples",
                    data_w,
                    data_h,
                    values.len()
                )));
            }

            // Chunk cells that fall inside the window
            let (top, left) = (chunk_row * chunk_h, chunk_col * chunk_w);
            let rows = top.max(window.row_offset)..(top + data_h).min(r_end);
            let cols = left.max(window.col_offset)..(left + data_w).min(c_end);
            for r in rows {
                for c in cols.clone() {
                    let v = values[(r - top) * data_w + (c - left)];
                    raster.set(r - window.row_offset, c - window.col_offset, v)?;
                }
            }
        }
    }

    raster.set_transform(*source.window(&window).transform());
    raster.set_crs(Some(crs));
    raster.set_nodata(nodata);
    Ok(Some(raster))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

fn decode_samples<T: RasterElement>(result: DecodingResult) -> Result<Vec<T>> {
    Ok(match result {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    })
}

fn read_nodata<T, R>(decoder: &mut Decoder<R>) -> Option<T>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let text = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()?;
    text.trim_end_matches('\0')
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(num_traits::cast::<f64, T>)
}

/// Internal: decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = decode_samples(decoder.read_image()?)?;

    // Multi-band chunky images decode interleaved; only single band is supported
    if data.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected a single-band image of {}x{}, decoded {} samples",
            cols,
            rows,
            data.len()
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(read_nodata(&mut decoder));

    Ok(raster)
}

/// Read GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }
    None
}

/// EPSG code from the GeoKey directory (projected first, then geographic)
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)).ok()?;
    let entries: Vec<&[u16]> = keys.chunks_exact(4).skip(1).collect();
    // location 0 = value stored inline
    let lookup = |key: u16| {
        entries
            .iter()
            .find(|e| e[0] == key && e[1] == 0)
            .map(|e| e[3] as u32)
    };
    lookup(PROJECTED_CS_TYPE_KEY)
        .or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
        .map(CRS::from_epsg)
}

fn geo_keys(crs: Option<&CRS>) -> Vec<u16> {
    match crs {
        Some(crs) if crs.is_geographic() => vec![
            1, 1, 0, 3, // version 1.1.0, 3 keys
            GT_MODEL_TYPE_KEY, 0, 1, 2, // ModelTypeGeographic
            GT_RASTER_TYPE_KEY, 0, 1, 1, // RasterPixelIsArea
            GEOGRAPHIC_TYPE_KEY, 0, 1, crs.epsg() as u16,
        ],
        Some(crs) => vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE_KEY, 0, 1, 1, // ModelTypeProjected
            GT_RASTER_TYPE_KEY, 0, 1, 1,
            PROJECTED_CS_TYPE_KEY, 0, 1, crs.epsg() as u16,
        ],
        None => vec![
            1, 1, 0, 2,
            GT_MODEL_TYPE_KEY, 0, 1, 1,
            GT_RASTER_TYPE_KEY, 0, 1, 1,
        ],
    }
}

fn write_geo_tags<W, K>(
    encoder: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Option<&CRS>,
    nodata: Option<String>,
) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
    K: TiffKind,
{
    let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
    encoder.write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    encoder.write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &tiepoint[..])?;

    let keys = geo_keys(crs);
    encoder.write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), keys.as_slice())?;

    if let Some(nodata) = nodata {
        encoder.write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), nodata.as_str())?;
    }
    Ok(())
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_float(raster, file)
}

/// Write a Raster to an in-memory 32-bit float GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_float(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

/// Write an 8-bit mask / class raster (e.g. the green-space raster) losslessly
pub fn write_mask_geotiff<P: AsRef<Path>>(raster: &Raster<u8>, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_u8(raster, file)
}

/// In-memory variant of [`write_mask_geotiff`]
pub fn write_mask_geotiff_to_buffer(raster: &Raster<u8>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_u8(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_float<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                f32::NAN
            } else {
                num_traits::cast(v).unwrap_or(f32::NAN)
            }
        })
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    write_geo_tags(
        image.encoder(),
        raster.transform(),
        raster.crs(),
        Some("nan".to_string()),
    )?;
    image.write_data(&data)?;
    Ok(())
}

fn encode_u8<W>(raster: &Raster<u8>, writer: W) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();
    let data: Vec<u8> = raster.data().iter().copied().collect();

    let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
    write_geo_tags(
        image.encoder(),
        raster.transform(),
        raster.crs(),
        raster.nodata().map(|nd| nd.to_string()),
    )?;
    image.write_data(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mask() -> Raster<u8> {
        let mut r = Raster::from_vec(vec![0, 1, 255, 1, 1, 0], 2, 3).unwrap();
        r.set_transform(GeoTransform::north_up(440_000.0, 4_640_000.0, 10.0));
        r.set_crs(Some(CRS::from_epsg(32616)));
        r.set_nodata(Some(255));
        r
    }

    #[test]
    fn test_mask_roundtrip_preserves_values_and_metadata() {
        let mask = sample_mask();
        let buf = write_mask_geotiff_to_buffer(&mask).unwrap();
        let back: Raster<u8> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.data(), mask.data());
        assert_eq!(back.transform(), mask.transform());
        assert_eq!(back.crs().map(|c| c.epsg()), Some(32616));
        assert_eq!(back.nodata(), Some(255));
    }

    #[test]
    fn test_float_roundtrip_keeps_nan() {
        let mut r: Raster<f64> = Raster::from_vec(vec![0.25, f64::NAN, -0.5, 1.0], 2, 2).unwrap();
        r.set_transform(GeoTransform::north_up(-88.0, 42.0, 0.001));
        r.set_crs(Some(CRS::wgs84()));
        let buf = write_geotiff_to_buffer(&r).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.get(0, 0).unwrap(), 0.25);
        assert!(back.get(0, 1).unwrap().is_nan());
        assert_eq!(back.get(1, 0).unwrap(), -0.5);
        assert_eq!(back.crs().map(|c| c.epsg()), Some(4326));
    }

    #[test]
    fn test_no_crs_reads_back_as_none() {
        let r: Raster<u8> = Raster::filled(2, 2, 1);
        let buf = write_mask_geotiff_to_buffer(&r).unwrap();
        let back: Raster<u8> = read_geotiff_from_buffer(&buf).unwrap();
        assert!(back.crs().is_none());
        assert!(back.nodata().is_none());
    }
}
