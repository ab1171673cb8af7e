//! Outcome of a run, per region

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scenes seen at each stage for one region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneCounts {
    /// Surface reflectance scenes selected
    pub selected: usize,
    /// Scenes left after both joins
    pub joined: usize,
    /// Scenes masked and reduced
    pub masked: usize,
    /// Scenes masked for clouds only
    pub shadow_skipped: usize,
    /// Scenes left out because of their masking inputs
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStatus {
    Exported,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub group: String,
    pub region: String,
    pub status: RegionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<PathBuf>,
    pub scenes: SceneCounts,
    pub green_pixels: usize,
    pub valid_pixels: usize,
    pub nodata_pixels: usize,
}

impl RegionReport {
    pub(crate) fn failed(group: &str, region: &str, scenes: SceneCounts, error: &PipelineError) -> Self {
        Self {
            group: group.to_string(),
            region: region.to_string(),
            status: RegionStatus::Failed,
            error_kind: Some(error.kind().to_string()),
            error: Some(error.to_string()),
            output: None,
            sidecar: None,
            scenes,
            green_pixels: 0,
            valid_pixels: 0,
            nodata_pixels: 0,
        }
    }

    pub fn is_exported(&self) -> bool {
        self.status == RegionStatus::Exported
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub regions: Vec<RegionReport>,
}

impl RunReport {
    pub fn exported(&self) -> impl Iterator<Item = &RegionReport> {
        self.regions.iter().filter(|r| r.is_exported())
    }

    pub fn failed(&self) -> impl Iterator<Item = &RegionReport> {
        self.regions.iter().filter(|r| !r.is_exported())
    }

    /// Whether every region was exported
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn region(&self, name: &str) -> Option<&RegionReport> {
        self.regions.iter().find(|r| r.region == name)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_string_pretty(self)?).map_err(|source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
