//! # greensat parallel
//!
//! Execution strategies for the raster stages.
//!
//! This crate provides:
//! - Tiled processing with halos, so neighborhood operations on large
//!   grids run block by block and reassemble without seams
//! - A processing mode switch between sequential and Rayon execution

pub mod strategy;
pub mod tiled;

pub use strategy::{ParallelStrategy, ProcessingMode};
pub use tiled::{Tile, TileIterator, TiledProcessor};
