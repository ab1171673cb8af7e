//! Error taxonomy of a pipeline run

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline errors.
///
/// `Configuration` and `DataAvailability` abort the affected region only.
/// `MaskingInput` is recovered per scene and only surfaces when a caller
/// asks for a single scene to be masked.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no data for region {region}: {reason}")]
    DataAvailability { region: String, reason: String },

    #[error("join integrity: {0}")]
    JoinIntegrity(String),

    #[error("masking input for scene {scene}: {reason}")]
    MaskingInput { scene: String, reason: String },

    #[error("export of {region} failed: {reason}")]
    Export { region: String, reason: String },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog error: {0}")]
    Catalog(greensat_catalog::CatalogError),

    #[error("raster error: {0}")]
    Core(#[from] greensat_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<greensat_catalog::CatalogError> for PipelineError {
    fn from(e: greensat_catalog::CatalogError) -> Self {
        match e {
            greensat_catalog::CatalogError::JoinIntegrity { .. } => PipelineError::JoinIntegrity(e.to_string()),
            other => PipelineError::Catalog(other),
        }
    }
}

impl PipelineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PipelineError::Configuration(msg.into())
    }

    /// Short category name, used in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::DataAvailability { .. } => "data_availability",
            PipelineError::JoinIntegrity(_) => "join_integrity",
            PipelineError::MaskingInput { .. } => "masking_input",
            PipelineError::Export { .. } | PipelineError::Write { .. } => "export",
            PipelineError::Catalog(_) => "catalog",
            PipelineError::Core(_) => "raster",
            PipelineError::Io(_) => "io",
            PipelineError::Json(_) => "json",
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use greensat_catalog::CatalogError;

    #[test]
    fn test_join_integrity_is_lifted() {
        let e: PipelineError = CatalogError::JoinIntegrity {
            namespace: "l1c".into(),
            count: 2,
            ids: vec!["a".into(), "b".into()],
        }
        .into();
        assert_eq!(e.kind(), "join_integrity");

        let e: PipelineError = CatalogError::BandNotFound("x".into()).into();
        assert_eq!(e.kind(), "catalog");
    }
}
