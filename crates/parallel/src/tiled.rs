//! Tiled processing for large rasters
//!
//! A tile is a core block plus a halo of `overlap` cells on every side
//! (clamped at the raster edge). Stages run on the halo window; only the
//! core is written back, so any operation whose reach is at most `overlap`
//! cells gives the same result as running on the whole raster.

use crate::strategy::{ParallelStrategy, ProcessingMode};
use greensat_core::raster::{GridSpec, GridWindow, Raster, RasterElement};
use greensat_core::Error;

/// A core block and the halo window it is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Cells this tile is responsible for
    pub core: GridWindow,
    /// Core expanded by the overlap, clamped to the raster
    pub halo: GridWindow,
}

impl Tile {
    /// Location of the core inside the halo window
    pub fn core_in_halo(&self) -> GridWindow {
        GridWindow::new(
            self.core.row_offset - self.halo.row_offset,
            self.core.col_offset - self.halo.col_offset,
            self.core.rows,
            self.core.cols,
        )
    }
}

/// Iterator over tiles covering a raster, row-major
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    overlap: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// Create a new tile iterator
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize, overlap: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            overlap,
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let core_rows = self.tile_size.min(self.total_rows - self.current_row);
        let core_cols = self.tile_size.min(self.total_cols - self.current_col);
        let core = GridWindow::new(self.current_row, self.current_col, core_rows, core_cols);

        let row_start = self.current_row.saturating_sub(self.overlap);
        let col_start = self.current_col.saturating_sub(self.overlap);
        let row_end = (self.current_row + core_rows + self.overlap).min(self.total_rows);
        let col_end = (self.current_col + core_cols + self.overlap).min(self.total_cols);
        let halo = GridWindow::new(row_start, col_start, row_end - row_start, col_end - col_start);

        // Move to next tile
        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(Tile { core, halo })
    }
}

/// Processor for tiled raster operations
#[derive(Debug, Clone, Copy)]
pub struct TiledProcessor {
    tile_size: usize,
    overlap: usize,
    mode: ProcessingMode,
}

impl TiledProcessor {
    /// Create a new tiled processor
    pub fn new(tile_size: usize, overlap: usize) -> Self {
        Self {
            tile_size,
            overlap,
            mode: ProcessingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Tiles covering a `rows` x `cols` raster
    pub fn tiles(&self, rows: usize, cols: usize) -> Vec<Tile> {
        TileIterator::new(rows, cols, self.tile_size, self.overlap).collect()
    }

    /// Run `f` over every tile of `input` and reassemble the cores.
    ///
    /// `f` receives the halo window (georeferenced at its own origin) and must
    /// return a raster of the same shape.
    pub fn map<T, U, E, F>(&self, input: &Raster<T>, f: F) -> Result<Raster<U>, E>
    where
        T: RasterElement,
        U: RasterElement,
        E: From<Error> + Send,
        F: Fn(&Raster<T>) -> Result<Raster<U>, E> + Sync + Send,
    {
        self.map_with_tile(input, |_, window| f(window))
    }

    /// Like [`map`](Self::map), also passing the tile so `f` can cut the
    /// same halo window out of other co-registered rasters.
    pub fn map_with_tile<T, U, E, F>(&self, input: &Raster<T>, f: F) -> Result<Raster<U>, E>
    where
        T: RasterElement,
        U: RasterElement,
        E: From<Error> + Send,
        F: Fn(&Tile, &Raster<T>) -> Result<Raster<U>, E> + Sync + Send,
    {
        let (rows, cols) = input.shape();
        let tiles = self.tiles(rows, cols);

        let results: Vec<Result<(Tile, Raster<U>), E>> = self.mode.par_map(tiles, |tile| {
            let window = input.window(&tile.halo)?;
            let out = f(&tile, &window)?;
            check_tile_shape(&tile, &out)?;
            Ok((tile, out))
        });

        let output: Raster<U> = input.with_same_meta(rows, cols);
        reassemble(output, results)
    }

    /// Build a raster on `grid` tile by tile.
    ///
    /// `f` receives the tile and the sub-grid of its halo and returns the
    /// halo's values.
    pub fn assemble<U, E, F>(&self, grid: &GridSpec, f: F) -> Result<Raster<U>, E>
    where
        U: RasterElement,
        E: From<Error> + Send,
        F: Fn(&Tile, &GridSpec) -> Result<Raster<U>, E> + Sync + Send,
    {
        self.assemble_layers(grid, 1, |tile, sub| Ok::<_, E>(vec![f(tile, sub)?]))?
            .pop()
            .ok_or_else(|| Error::Other("no layer assembled".to_string()).into())
    }

    /// Build `count` co-registered rasters on `grid` in one tiled pass.
    ///
    /// `f` returns one halo raster per layer, in a fixed order, so work
    /// shared by the layers of a tile is done once per tile.
    pub fn assemble_layers<U, E, F>(&self, grid: &GridSpec, count: usize, f: F) -> Result<Vec<Raster<U>>, E>
    where
        U: RasterElement,
        E: From<Error> + Send,
        F: Fn(&Tile, &GridSpec) -> Result<Vec<Raster<U>>, E> + Sync + Send,
    {
        let tiles = self.tiles(grid.rows(), grid.cols());

        let results: Vec<Result<(Tile, Vec<Raster<U>>), E>> = self.mode.par_map(tiles, |tile| {
            let layers = f(&tile, &grid.window(&tile.halo))?;
            if layers.len() != count {
                return Err(Error::InvalidParameter {
                    name: "layers",
                    value: layers.len().to_string(),
                    reason: format!("tile producer must return {} layers", count),
                }
                .into());
            }
            for out in &layers {
                check_tile_shape(&tile, out)?;
            }
            Ok((tile, layers))
        });

        let mut outputs: Vec<Raster<U>> = (0..count)
            .map(|_| Raster::on_grid(grid, U::default_nodata()))
            .collect();
        for result in results {
            let (tile, layers) = result?;
            for (output, out) in outputs.iter_mut().zip(&layers) {
                paste_core(output, &tile, out)?;
            }
        }
        Ok(outputs)
    }
}

fn check_tile_shape<U: RasterElement>(tile: &Tile, out: &Raster<U>) -> Result<(), Error> {
    if out.shape() != (tile.halo.rows, tile.halo.cols) {
        return Err(Error::SizeMismatch {
            er: tile.halo.rows,
            ec: tile.halo.cols,
            ar: out.rows(),
            ac: out.cols(),
        });
    }
    Ok(())
}

fn reassemble<U, E>(mut output: Raster<U>, results: Vec<Result<(Tile, Raster<U>), E>>) -> Result<Raster<U>, E>
where
    U: RasterElement,
    E: From<Error>,
{
    for result in results {
        let (tile, out) = result?;
        paste_core(&mut output, &tile, &out)?;
    }
    Ok(output)
}

fn paste_core<U: RasterElement>(output: &mut Raster<U>, tile: &Tile, out: &Raster<U>) -> Result<(), Error> {
    output.paste(out, &tile.core_in_halo(), tile.core.row_offset, tile.core.col_offset)?;
    if output.nodata().is_none() {
        output.set_nodata(out.nodata());
    }
    Ok(())
}
