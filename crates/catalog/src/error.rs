//! Error types for the scene catalog.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading catalogs, boundaries and bands.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid item {id}: {reason}")]
    InvalidItem { id: String, reason: String },

    #[error("scene {scene} has no band {band}")]
    MissingBand { scene: String, band: String },

    #[error("band not found in store: {0}")]
    BandNotFound(String),

    #[error("boundary {id} not found at {path}")]
    BoundaryNotFound { id: String, path: PathBuf },

    #[error("{count} scene(s) have no match in {namespace}: {ids:?}")]
    JoinIntegrity {
        namespace: String,
        count: usize,
        ids: Vec<String>,
    },

    #[error("core error: {0}")]
    Core(#[from] greensat_core::Error),
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
