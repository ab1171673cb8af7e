//! Pipeline configuration
//!
//! Everything the historical scripts hard-coded lives here. The default
//! configuration reproduces them: eight cities thresholded at NDVI 0.5 and
//! Los Angeles / Phoenix at 0.2, summer 2020, 10 m exports in UTM 16N.

use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use greensat_algorithms::cloud::CloudParams;
use greensat_algorithms::resample::Resampling;
use greensat_catalog::catalog::{S2_CLOUD_PROBABILITY, S2_SR, S2_TOA};
use greensat_catalog::{DateRange, JoinMode};
use greensat_core::{Region, CRS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Join namespace of the cloud probability companion
pub const CLOUD_PROBABILITY_NAMESPACE: &str = "cloud_probability";
/// Join namespace of the L1C companion
pub const L1C_NAMESPACE: &str = "l1c";

/// Whole-run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Catalog manifest
    pub catalog: PathBuf,
    /// Directory holding `<boundary id>.geojson` files
    pub boundaries: PathBuf,
    /// Root of the exported files
    pub output: PathBuf,
    /// Acquisition dates, `[start, end)`
    pub date_range: DateRange,
    pub collections: CollectionsConfig,
    pub masking: MaskingConfig,
    pub composite: CompositeConfig,
    pub export: ExportConfig,
    /// Policy for scenes missing a companion scene
    pub join_mode: JoinMode,
    /// Decoded bands kept in memory by the GeoTIFF band store
    pub band_cache: usize,
    pub groups: Vec<GroupConfig>,
}

/// One collection and the bands selected from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub bands: Vec<String>,
}

impl CollectionSpec {
    pub fn new(name: &str, bands: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            bands: bands.iter().map(|b| b.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionsConfig {
    /// Top-of-atmosphere bands feeding the CDI and the cirrus test
    pub toa: CollectionSpec,
    pub cloud_probability: CollectionSpec,
    /// Surface reflectance bands feeding the composite
    pub surface_reflectance: CollectionSpec,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            toa: CollectionSpec::new(S2_TOA, &["B7", "B8", "B8A", "B10"]),
            cloud_probability: CollectionSpec::new(S2_CLOUD_PROBABILITY, &["probability"]),
            surface_reflectance: CollectionSpec::new(S2_SR, &["B2", "B3", "B4", "B5"]),
        }
    }
}

/// What to do with a scene that has no solar azimuth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAzimuthPolicy {
    /// Mask clouds only, skip the shadow search
    #[default]
    CloudOnly,
    /// Leave the scene out of the composite
    DropScene,
}

/// Band names read by the masker from a joined scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskBands {
    pub red_edge: String,
    pub nir: String,
    pub nir_narrow: String,
    pub cirrus: String,
    pub probability: String,
}

impl Default for MaskBands {
    fn default() -> Self {
        Self {
            red_edge: "B7".to_string(),
            nir: "B8".to_string(),
            nir_narrow: "B8A".to_string(),
            cirrus: "B10".to_string(),
            probability: "probability".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    #[serde(flatten)]
    pub cloud: CloudParams,
    pub bands: MaskBands,
    /// CDI variance window radius, pixels at the morphology scale
    pub cdi_radius: usize,
    pub erosion_radius: usize,
    pub dilation_radius: usize,
    /// Pixel size of the cloud test and morphology, meters
    pub morphology_scale: f64,
    /// Pixel size of the shadow search, meters
    pub shadow_scale: f64,
    /// Shadow search length, pixels at the shadow scale
    pub shadow_search: usize,
    /// How the cloud mask is coarsened onto the shadow grid
    pub shadow_resampling: Resampling,
    pub missing_azimuth: MissingAzimuthPolicy,
    /// Tile edge for the CDI and morphology passes
    pub tile_size: usize,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            cloud: CloudParams::default(),
            bands: MaskBands::default(),
            cdi_radius: 3,
            erosion_radius: 3,
            dilation_radius: 16,
            morphology_scale: 20.0,
            shadow_scale: 100.0,
            shadow_search: 50,
            shadow_resampling: Resampling::Nearest,
            missing_azimuth: MissingAzimuthPolicy::CloudOnly,
            tile_size: 1024,
        }
    }
}

impl MaskingConfig {
    /// Distance in meters the cloud test and morphology reach beyond a pixel
    pub fn morphology_reach(&self) -> f64 {
        (self.cdi_radius + self.erosion_radius + self.dilation_radius) as f64 * self.morphology_scale
    }

    /// Distance in meters a shadow can be cast
    pub fn shadow_reach(&self) -> f64 {
        self.shadow_search as f64 * self.shadow_scale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Bands reduced to `<band>_median`
    pub bands: Vec<String>,
    pub nir: String,
    pub red: String,
    /// Tile edge of the median reduction
    pub tile_size: usize,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            bands: ["B2", "B3", "B4", "B8"].iter().map(|b| b.to_string()).collect(),
            nir: "B8".to_string(),
            red: "B4".to_string(),
            tile_size: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Pixel size, meters
    pub scale: f64,
    /// Largest grid that may be exported
    pub max_pixels: u64,
    /// Subdirectory of the output root
    pub folder: String,
    /// Write pixels outside the region polygon as no-data
    pub clip_to_region: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 10.0,
            max_pixels: 10_000_000_000_000,
            folder: "EJLSAMultiCity".to_string(),
            clip_to_region: true,
        }
    }
}

/// Cities sharing one threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// Minimum NDVI of a green pixel
    pub threshold: f64,
    /// Overrides the run's date range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    pub regions: Vec<RegionConfig>,
}

/// Target CRS of a region: an EPSG code, or `"auto"` for the UTM zone of
/// the region's centroid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CrsChoice {
    Fixed(CRS),
    Auto,
}

impl CrsChoice {
    pub fn resolve(&self, region: &Region) -> Result<CRS> {
        match self {
            CrsChoice::Fixed(crs) => Ok(*crs),
            CrsChoice::Auto => Ok(region.auto_crs()?),
        }
    }
}

impl Default for CrsChoice {
    fn default() -> Self {
        CrsChoice::Fixed(CRS::from_epsg(32616))
    }
}

impl fmt::Display for CrsChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsChoice::Fixed(crs) => write!(f, "{}", crs),
            CrsChoice::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for CrsChoice {
    type Err = greensat_core::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(CrsChoice::Auto)
        } else {
            s.parse().map(CrsChoice::Fixed)
        }
    }
}

impl TryFrom<String> for CrsChoice {
    type Error = greensat_core::Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CrsChoice> for String {
    fn from(choice: CrsChoice) -> Self {
        choice.to_string()
    }
}

/// One exported city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    /// Boundary id in the boundary store
    pub boundary: String,
    #[serde(default)]
    pub crs: CrsChoice,
    pub description: String,
    pub file_name_prefix: String,
}

impl RegionConfig {
    fn city(name: &str, boundary: &str, suffix: &str) -> Self {
        let prefix = format!("{}_Sentinel2_{}", name, suffix);
        Self {
            name: name.to_string(),
            boundary: boundary.to_string(),
            crs: CrsChoice::default(),
            description: prefix.clone(),
            file_name_prefix: prefix,
        }
    }
}

fn multi_city_bounds(name: &str) -> String {
    format!("users/mfstuhlmacher/EJLSAMultiCity/{}_CityBounds", name)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let eight = ["Houston", "Indianapolis", "Jacksonville", "NewYork", "Portland", "Seattle", "StLouis"];
        let mut cities8 = vec![RegionConfig::city(
            "Chicago",
            "users/mfstuhlmacher/EnvGentChicago/ChicagoBounds",
            "NDVI05",
        )];
        cities8.extend(eight.iter().map(|c| RegionConfig::city(c, &multi_city_bounds(c), "NDVI05")));

        let laphx = ["LA", "Phoenix"]
            .iter()
            .map(|c| RegionConfig::city(c, &multi_city_bounds(c), "NDVI02"))
            .collect();

        Self {
            catalog: PathBuf::from("data/catalog.json"),
            boundaries: PathBuf::from("data/boundaries"),
            output: PathBuf::from("output"),
            date_range: summer_2020(),
            collections: CollectionsConfig::default(),
            masking: MaskingConfig::default(),
            composite: CompositeConfig::default(),
            export: ExportConfig::default(),
            join_mode: JoinMode::Inner,
            band_cache: 64,
            groups: vec![
                GroupConfig {
                    name: "cities8".to_string(),
                    threshold: 0.5,
                    date_range: None,
                    regions: cities8,
                },
                GroupConfig {
                    name: "laphx".to_string(),
                    threshold: 0.2,
                    date_range: None,
                    regions: laphx,
                },
            ],
        }
    }
}

fn summer_2020() -> DateRange {
    let day = |m: u32| NaiveDate::from_ymd_opt(2020, m, 1).unwrap_or(NaiveDate::MIN);
    DateRange::new(day(6), day(9))
}

impl PipelineConfig {
    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| PipelineError::config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Date range a group's scenes are selected from
    pub fn date_range_for(&self, group: &GroupConfig) -> DateRange {
        group.date_range.unwrap_or(self.date_range)
    }

    /// Check every value the run depends on.
    pub fn validate(&self) -> Result<()> {
        check_range("date_range", &self.date_range)?;

        let m = &self.masking;
        for (name, scale) in [
            ("masking.morphology_scale", m.morphology_scale),
            ("masking.shadow_scale", m.shadow_scale),
            ("export.scale", self.export.scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(PipelineError::config(format!("{} must be positive, got {}", name, scale)));
            }
        }
        for (name, value) in [
            ("masking.cdi_radius", m.cdi_radius),
            ("masking.erosion_radius", m.erosion_radius),
            ("masking.dilation_radius", m.dilation_radius),
            ("masking.shadow_search", m.shadow_search),
            ("masking.tile_size", m.tile_size),
            ("composite.tile_size", self.composite.tile_size),
        ] {
            if value == 0 {
                return Err(PipelineError::config(format!("{} must be at least 1", name)));
            }
        }
        if self.export.max_pixels == 0 {
            return Err(PipelineError::config("export.max_pixels must be at least 1"));
        }
        for value in [m.cloud.probability_threshold, m.cloud.cdi_threshold, m.cloud.cirrus_threshold, m.cloud.cirrus_scale] {
            if !value.is_finite() {
                return Err(PipelineError::config("cloud test thresholds must be finite"));
            }
        }

        let c = &self.composite;
        if c.bands.is_empty() {
            return Err(PipelineError::config("composite.bands is empty"));
        }
        for band in [&c.nir, &c.red] {
            if !c.bands.contains(band) {
                return Err(PipelineError::config(format!("NDVI band {} is not in composite.bands", band)));
            }
        }

        if self.groups.is_empty() {
            return Err(PipelineError::config("no groups configured"));
        }
        let mut group_names = HashSet::new();
        let mut region_names = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(PipelineError::config(format!("duplicate group {}", group.name)));
            }
            if !(-1.0..=1.0).contains(&group.threshold) {
                return Err(PipelineError::config(format!(
                    "group {}: threshold {} is outside [-1, 1]",
                    group.name, group.threshold
                )));
            }
            if let Some(range) = &group.date_range {
                check_range(&format!("group {} date_range", group.name), range)?;
            }
            if group.regions.is_empty() {
                return Err(PipelineError::config(format!("group {} has no regions", group.name)));
            }
            for region in &group.regions {
                if !region_names.insert(region.name.as_str()) {
                    return Err(PipelineError::config(format!("duplicate region {}", region.name)));
                }
                if region.file_name_prefix.trim().is_empty() {
                    return Err(PipelineError::config(format!("region {} has no file name prefix", region.name)));
                }
                if let CrsChoice::Fixed(crs) = region.crs {
                    if !crs.is_supported() || crs.is_geographic() {
                        return Err(PipelineError::config(format!(
                            "region {}: {} is not a supported projected CRS",
                            region.name, crs
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_range(name: &str, range: &DateRange) -> Result<()> {
    if !range.is_valid() {
        return Err(PipelineError::config(format!("{} {} is empty: end must be after start", name, range)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reproduces_historical_runs() {
        let config = PipelineConfig::default();
        config.validate().unwrap();

        let cities8 = config.group("cities8").unwrap();
        assert_eq!(cities8.threshold, 0.5);
        assert_eq!(cities8.regions.len(), 8);
        assert_eq!(cities8.regions[0].boundary, "users/mfstuhlmacher/EnvGentChicago/ChicagoBounds");
        assert_eq!(cities8.regions[6].file_name_prefix, "Seattle_Sentinel2_NDVI05");

        let laphx = config.group("laphx").unwrap();
        assert_eq!(laphx.threshold, 0.2);
        assert_eq!(laphx.regions[1].file_name_prefix, "Phoenix_Sentinel2_NDVI02");

        // every region, Seattle included, carries the explicit CRS
        for region in config.groups.iter().flat_map(|g| &g.regions) {
            assert_eq!(region.crs, CrsChoice::Fixed(CRS::from_epsg(32616)));
        }
        assert_eq!(config.date_range.to_string(), "[2020-06-01, 2020-09-01)");
        assert_eq!(config.export.max_pixels, 10_000_000_000_000);
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = PipelineConfig::default();
        config.groups[1].regions[0].crs = CrsChoice::Auto;
        config.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"auto\""));
        assert!(text.contains("\"EPSG:32616\""));
        assert_eq!(PipelineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"masking": {"probability_threshold": 50.0, "missing_azimuth": "drop_scene"}}"#,
        )
        .unwrap();
        assert_eq!(config.masking.cloud.probability_threshold, 50.0);
        assert_eq!(config.masking.cloud.cdi_threshold, -0.5);
        assert_eq!(config.masking.missing_azimuth, MissingAzimuthPolicy::DropScene);
        assert_eq!(config.masking.dilation_radius, 16);
        assert_eq!(config.groups.len(), 2);
    }

    #[test]
    fn test_validation_errors() {
        let broken = |f: &dyn Fn(&mut PipelineConfig)| {
            let mut c = PipelineConfig::default();
            f(&mut c);
            matches!(c.validate(), Err(PipelineError::Configuration(_)))
        };
        assert!(broken(&|c| c.date_range = DateRange::new(c.date_range.end, c.date_range.start)));
        assert!(broken(&|c| c.groups[0].threshold = 1.5));
        assert!(broken(&|c| c.masking.shadow_scale = 0.0));
        assert!(broken(&|c| c.masking.erosion_radius = 0));
        assert!(broken(&|c| c.groups[1].regions.clear()));
        assert!(broken(&|c| c.groups[1].regions[0].name = "Chicago".into()));
        assert!(broken(&|c| c.groups[0].regions[0].crs = CrsChoice::Fixed(CRS::wgs84())));
        assert!(broken(&|c| c.composite.red = "B5".into()));
        assert!(broken(&|c| c.groups.clear()));
    }

    #[test]
    fn test_crs_choice_parse() {
        assert_eq!("auto".parse::<CrsChoice>().unwrap(), CrsChoice::Auto);
        assert_eq!("EPSG:32611".parse::<CrsChoice>().unwrap(), CrsChoice::Fixed(CRS::from_epsg(32611)));
        assert!("EPSG:3857".parse::<CrsChoice>().is_err());
        assert!(serde_json::from_str::<CrsChoice>("\"bogus\"").is_err());
    }

    #[test]
    fn test_reach() {
        let m = MaskingConfig::default();
        assert_eq!(m.morphology_reach(), 440.0);
        assert_eq!(m.shadow_reach(), 5000.0);
    }
}
