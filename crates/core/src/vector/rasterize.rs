//! Polygon rasterization onto a grid.
//!
//! Even-odd scanline fill sampled at pixel centers: a pixel is inside when
//! its center falls inside the polygon (holes excluded).

use crate::raster::{GridSpec, Raster};
use geo_types::{LineString, MultiPolygon};

/// Burn `polygons` (in the grid's CRS) into a 1/0 mask on `grid`
pub fn rasterize_mask(polygons: &MultiPolygon<f64>, grid: &GridSpec) -> Raster<u8> {
    let mut mask = Raster::on_grid(grid, 0u8);
    let rings: Vec<&LineString<f64>> = polygons
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
        .collect();

    let transform = *grid.transform();
    let (rows, cols) = grid.shape();
    let mut crossings: Vec<f64> = Vec::new();

    for row in 0..rows {
        let (_, y) = transform.pixel_to_geo(0, row);
        crossings.clear();

        for ring in &rings {
            for seg in ring.lines() {
                let (y0, y1) = (seg.start.y, seg.end.y);
                // half-open rule avoids double counting shared vertices
                if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
                    let t = (y - y0) / (y1 - y0);
                    crossings.push(seg.start.x + t * (seg.end.x - seg.start.x));
                }
            }
        }
        if crossings.len() < 2 {
            continue;
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        let data = mask.data_mut();
        for pair in crossings.chunks_exact(2) {
            let (start, _) = transform.geo_to_pixel(pair[0], y);
            let (end, _) = transform.geo_to_pixel(pair[1], y);
            // pixel centers sit at col + 0.5
            let first = (start - 0.5).ceil().max(0.0) as usize;
            let last = (end - 0.5).ceil().min(cols as f64);
            if last <= 0.0 {
                continue;
            }
            for col in first..last as usize {
                data[[row, col]] = 1;
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CRS;
    use crate::raster::Extent;
    use geo_types::{polygon, Polygon};

    fn grid() -> GridSpec {
        GridSpec::covering(&Extent::new(0.0, 0.0, 100.0, 100.0), 10.0, CRS::from_epsg(32616)).unwrap()
    }

    #[test]
    fn test_rectangle_covers_pixel_centers() {
        let poly: Polygon<f64> = polygon![(x: 20.0, y: 20.0), (x: 60.0, y: 20.0), (x: 60.0, y: 50.0), (x: 20.0, y: 50.0)];
        let mask = rasterize_mask(&MultiPolygon(vec![poly]), &grid());
        // 4 columns (centers 25..55) x 3 rows (centers 25..45)
        assert_eq!(mask.count_where(|v| v == 1), 12);
        // row 5 has center y = 45
        assert_eq!(mask.get(5, 2).unwrap(), 1);
        assert_eq!(mask.get(4, 2).unwrap(), 0);
    }

    #[test]
    fn test_hole_is_excluded() {
        let poly: Polygon<f64> = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 100.0, y: 0.0), (x: 100.0, y: 100.0), (x: 0.0, y: 100.0)],
            interiors: [[(x: 40.0, y: 40.0), (x: 60.0, y: 40.0), (x: 60.0, y: 60.0), (x: 40.0, y: 60.0)]],
        );
        let mask = rasterize_mask(&MultiPolygon(vec![poly]), &grid());
        assert_eq!(mask.count_where(|v| v == 1), 100 - 4);
    }

    #[test]
    fn test_polygon_outside_grid() {
        let poly: Polygon<f64> = polygon![(x: 500.0, y: 500.0), (x: 600.0, y: 500.0), (x: 600.0, y: 600.0)];
        let mask = rasterize_mask(&MultiPolygon(vec![poly]), &grid());
        assert_eq!(mask.count_where(|v| v == 1), 0);
    }
}
