use greensat_core::io::{read_geotiff, read_geotiff_window, write_geotiff, write_mask_geotiff};
use greensat_core::{Extent, GeoTransform, GridSpec, Raster, CRS};
use tempfile::tempdir;

#[test]
fn mask_file_roundtrip_keeps_grid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Chicago_Sentinel2_NDVI05.tif");

    let mut mask: Raster<u8> = Raster::from_vec(vec![1, 0, 0, 1, 255, 1], 3, 2).unwrap();
    mask.set_transform(GeoTransform::north_up(443_210.0, 4_650_020.0, 10.0));
    mask.set_crs(Some(CRS::from_epsg(32616)));
    mask.set_nodata(Some(255));

    write_mask_geotiff(&mask, &path).unwrap();
    let back: Raster<u8> = read_geotiff(&path).unwrap();

    assert_eq!(back.shape(), (3, 2));
    assert_eq!(back.data(), mask.data());
    assert_eq!(back.grid(), mask.grid());
    assert_eq!(back.nodata(), Some(255));
}

#[test]
fn float_file_reads_as_other_element_type() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ndvi.tif");

    let grid = GridSpec::covering(
        &greensat_core::Extent::new(0.0, 0.0, 40.0, 20.0),
        10.0,
        CRS::from_epsg(32611),
    )
    .unwrap();
    let mut ndvi: Raster<f64> = Raster::on_grid(&grid, 0.5);
    ndvi.set(0, 0, f64::NAN).unwrap();

    write_geotiff(&ndvi, &path).unwrap();
    let back: Raster<f32> = read_geotiff(&path).unwrap();

    assert_eq!(back.shape(), (2, 4));
    assert!(back.get(0, 0).unwrap().is_nan());
    assert_eq!(back.get(1, 3).unwrap(), 0.5);
    assert_eq!(back.crs().map(|c| c.epsg()), Some(32611));
}

#[test]
fn missing_file_is_io_error() {
    let err = read_geotiff::<f32, _>("/nonexistent/nope.tif").unwrap_err();
    assert!(matches!(err, greensat_core::Error::Io(_)));
}

/// 20 m band whose value encodes its own row and column
fn write_indexed_band(path: &std::path::Path) -> Raster<f64> {
    let grid = GridSpec::covering(
        &Extent::new(440_000.0, 4_630_000.0, 448_000.0, 4_636_000.0),
        20.0,
        CRS::from_epsg(32616),
    )
    .unwrap();
    let mut band: Raster<f64> = Raster::on_grid(&grid, 0.0);
    for ((r, c), v) in band.data_mut().indexed_iter_mut() {
        *v = (r * 1000 + c) as f64;
    }
    write_geotiff(&band, path).unwrap();
    band
}

#[test]
fn window_read_matches_full_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("B8.tif");
    let band = write_indexed_band(&path);
    assert_eq!(band.shape(), (300, 400));

    let tile = GridSpec::covering(
        &Extent::new(443_000.0, 4_632_000.0, 444_280.0, 4_633_280.0),
        10.0,
        CRS::from_epsg(32616),
    )
    .unwrap();
    let part: Raster<f64> = read_geotiff_window(&path, &tile).unwrap().unwrap();

    let window = tile.source_window(&band.grid().unwrap()).unwrap().unwrap();
    assert!(part.len() < band.len() / 10);
    assert_eq!(part.shape(), (window.rows, window.cols));
    assert_eq!(part.grid(), band.window(&window).unwrap().grid());
    assert_eq!(part.data(), band.window(&window).unwrap().data());

    // every tile pixel finds its value in the window
    for row in 0..tile.rows() {
        for col in 0..tile.cols() {
            let (x, y) = tile.pixel_center(row, col);
            assert_eq!(part.sample(x, y), band.sample(x, y));
        }
    }
}

#[test]
fn window_read_outside_file_is_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("B8.tif");
    write_indexed_band(&path);

    let far = GridSpec::covering(
        &Extent::new(500_000.0, 4_700_000.0, 500_100.0, 4_700_100.0),
        10.0,
        CRS::from_epsg(32616),
    )
    .unwrap();
    assert!(read_geotiff_window::<f64, _>(&path, &far).unwrap().is_none());
}
