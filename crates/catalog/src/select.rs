//! Scene selection by region, date range and band subset

use crate::scene::Scene;
use crate::stac_models::StacItem;
use chrono::{DateTime, NaiveDate, Utc};
use greensat_core::Region;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed-open interval of calendar days `[start, end)` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether the range holds at least one day
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn contains(&self, datetime: &DateTime<Utc>) -> bool {
        let day = datetime.date_naive();
        self.start <= day && day < self.end
    }

    /// Whether two ranges share any day
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Items of `collection` that touch `region` and were acquired within
/// `range`, reduced to `bands`.
///
/// Items without a usable bbox or datetime, or lacking one of the bands,
/// are skipped with a warning. The result is ordered by acquisition time,
/// then id. An empty result is not an error here.
pub fn select(
    items: &[StacItem],
    collection: &str,
    region: &Region,
    range: &DateRange,
    bands: &[String],
) -> Vec<Scene> {
    let mut scenes: Vec<Scene> = Vec::new();

    for item in items {
        let (Some(bbox), Some(datetime)) = (item.extent(), item.datetime()) else {
            tracing::warn!("{}: skipping item {} without bbox or datetime", collection, item.id);
            continue;
        };
        if !range.contains(&datetime) || !region.intersects_extent(&bbox) {
            continue;
        }
        match Scene::from_item(item, collection, bands) {
            Ok(scene) => scenes.push(scene),
            Err(e) => tracing::warn!("{}: skipping item: {}", collection, e),
        }
    }

    scenes.sort_by(|a, b| a.datetime.cmp(&b.datetime).then_with(|| a.id.cmp(&b.id)));
    tracing::debug!(
        "{}: selected {} of {} item(s) for {} in {}",
        collection,
        scenes.len(),
        items.len(),
        region.name(),
        range
    );
    scenes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stac_models::{StacAsset, StacItemProperties};
    use greensat_core::Extent;
    use std::collections::HashMap;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn summer_2020() -> DateRange {
        DateRange::new(date("2020-06-01"), date("2020-09-01"))
    }

    fn item(id: &str, datetime: &str, bbox: [f64; 4], bands: &[&str]) -> StacItem {
        StacItem {
            type_: "Feature".to_string(),
            id: id.to_string(),
            bbox: Some(bbox.to_vec()),
            properties: StacItemProperties {
                datetime: Some(datetime.to_string()),
                mean_solar_azimuth_angle: Some(150.0),
                extra: HashMap::new(),
            },
            assets: bands
                .iter()
                .map(|b| (b.to_string(), StacAsset::new(format!("{}/{}.tif", id, b))))
                .collect(),
        }
    }

    fn chicago() -> Region {
        Region::from_bbox("Chicago", Extent::new(-87.94, 41.64, -87.52, 42.02))
    }

    #[test]
    fn test_date_range_is_closed_open() {
        let r = summer_2020();
        let at = |s: &str| s.parse::<DateTime<Utc>>().unwrap();
        assert!(r.contains(&at("2020-06-01T00:00:00Z")));
        assert!(r.contains(&at("2020-08-31T23:59:59Z")));
        assert!(!r.contains(&at("2020-09-01T00:00:00Z")));
        assert!(!r.contains(&at("2020-05-31T23:59:59Z")));
    }

    #[test]
    fn test_overlap() {
        let june = DateRange::new(date("2020-06-01"), date("2020-07-01"));
        let july = DateRange::new(date("2020-07-01"), date("2020-08-01"));
        assert!(!june.overlaps(&july));
        assert!(june.overlaps(&summer_2020()));
        assert!(!DateRange::new(date("2020-07-01"), date("2020-07-01")).is_valid());
    }

    #[test]
    fn test_filters_space_time_and_bands() {
        let bands = vec!["B4".to_string(), "B8".to_string()];
        let items = vec![
            item("late", "2020-08-20T16:49:00Z", [-88.2, 41.4, -86.8, 42.5], &["B4", "B8"]),
            item("early", "2020-06-10T16:49:00Z", [-88.2, 41.4, -86.8, 42.5], &["B4", "B8", "B2"]),
            item("autumn", "2020-09-02T16:49:00Z", [-88.2, 41.4, -86.8, 42.5], &["B4", "B8"]),
            item("houston", "2020-07-01T16:49:00Z", [-95.8, 29.5, -95.0, 30.1], &["B4", "B8"]),
            item("no_nir", "2020-07-01T16:49:00Z", [-88.2, 41.4, -86.8, 42.5], &["B4"]),
        ];
        let scenes = select(&items, "COPERNICUS/S2_SR", &chicago(), &summer_2020(), &bands);
        let ids: Vec<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(scenes[0].bands.len(), 2);
    }

    #[test]
    fn test_empty_selection_is_empty() {
        let scenes = select(&[], "COPERNICUS/S2_SR", &chicago(), &summer_2020(), &[]);
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_disjoint_ranges_select_disjoint_scenes() {
        let bbox = [-88.2, 41.4, -86.8, 42.5];
        let items: Vec<StacItem> = (1..=28)
            .map(|d| item(&format!("s{:02}", d), &format!("2020-07-{:02}T16:00:00Z", d), bbox, &["B4"]))
            .collect();
        let first = DateRange::new(date("2020-07-01"), date("2020-07-15"));
        let second = DateRange::new(date("2020-07-15"), date("2020-08-01"));
        let a = select(&items, "c", &chicago(), &first, &[]);
        let b = select(&items, "c", &chicago(), &second, &[]);
        assert_eq!(a.len() + b.len(), 28);
        assert!(a.iter().all(|s| b.iter().all(|t| t.id != s.id)));
    }
}
