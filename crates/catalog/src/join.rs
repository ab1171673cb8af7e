//! Pairing scenes across collections by scene id

use crate::error::{CatalogError, Result};
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do with primary scenes that have no secondary match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Drop them
    #[default]
    Inner,
    /// Fail the join
    Strict,
}

/// Joined scenes and the ids that found no match
#[derive(Debug, Clone, Default)]
pub struct JoinOutcome {
    pub scenes: Vec<Scene>,
    pub unmatched: Vec<String>,
}

/// Attach each primary scene's same-id secondary scene under `namespace`.
///
/// The first secondary scene with a given id wins. Secondary bands are
/// merged into the primary's band map; a band name the primary already has
/// is stored as `"<namespace>.<band>"`. Primary properties win, missing ones
/// are filled from the secondary.
pub fn index_join(primary: Vec<Scene>, secondary: &[Scene], namespace: &str, mode: JoinMode) -> Result<JoinOutcome> {
    let mut by_id: HashMap<&str, &Scene> = HashMap::with_capacity(secondary.len());
    for scene in secondary {
        by_id.entry(scene.id.as_str()).or_insert(scene);
    }

    let mut outcome = JoinOutcome::default();
    for mut scene in primary {
        let Some(companion) = by_id.get(scene.id.as_str()) else {
            outcome.unmatched.push(scene.id);
            continue;
        };

        for (band, href) in &companion.bands {
            let key = if scene.bands.contains_key(band) {
                format!("{}.{}", namespace, band)
            } else {
                band.clone()
            };
            scene.bands.entry(key).or_insert_with(|| href.clone());
        }
        for (key, value) in &companion.properties {
            scene
                .properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        if scene.epsg.is_none() {
            scene.epsg = companion.epsg;
        }
        scene.companions.push(namespace.to_string());
        outcome.scenes.push(scene);
    }

    if !outcome.unmatched.is_empty() {
        if mode == JoinMode::Strict {
            return Err(CatalogError::JoinIntegrity {
                namespace: namespace.to_string(),
                count: outcome.unmatched.len(),
                ids: outcome.unmatched,
            });
        }
        tracing::warn!(
            "join {}: dropped {} scene(s) without a match",
            namespace,
            outcome.unmatched.len()
        );
    }
    Ok(outcome)
}
