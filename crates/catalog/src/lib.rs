//! # greensat catalog
//!
//! Local stand-in for the hosted image collections the pipeline reads.
//!
//! A JSON manifest lists STAC-style items per collection; each item points
//! at single-band GeoTIFFs. On top of that this crate provides:
//!
//! - [`select`]: filter items by region, date range and band subset
//! - [`join`]: pair scenes across collections by scene id
//! - [`BandStore`]: band loading, with an LRU-cached GeoTIFF store and an
//!   in-memory store
//! - [`BoundaryStore`]: named region boundaries stored as GeoJSON

pub mod boundaries;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod join;
pub mod scene;
pub mod select;
pub mod stac_models;
pub mod store;

pub use boundaries::BoundaryStore;
pub use catalog::Catalog;
pub use error::{CatalogError, Result};
pub use join::{index_join, JoinMode, JoinOutcome};
pub use scene::Scene;
pub use select::{select, DateRange};
pub use stac_models::{StacAsset, StacItem, StacItemCollection, StacItemProperties};
pub use store::{BandStore, GeoTiffStore, MemoryStore};
