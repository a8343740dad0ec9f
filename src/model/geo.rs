//! GeoJSON value types.
//!
//! The engine never interprets geometry — it is carried opaquely so a
//! reconciled node can hand both its own attributes and rolled-up totals to
//! the map layer in one feature. Only `properties` participates in
//! validation and merging.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Cell;

/// A GeoJSON `FeatureCollection` as uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

/// A single GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,

    /// Geometry, kept as raw JSON.
    #[serde(default)]
    pub geometry: serde_json::Value,

    /// Attribute map; validated like a sheet row.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Feature payload attached to a tree node.
///
/// Scalar fields merged onto a feature-backed node land in `properties`
/// rather than replacing the feature, so the geometry survives
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeatureData {
    pub geometry: serde_json::Value,
    pub properties: BTreeMap<String, Cell>,
}

impl GeoFeatureData {
    /// Convert an uploaded feature, flattening property values to cells.
    pub fn from_feature(feature: &Feature) -> Self {
        let properties = feature
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), Cell::from_json(v)))
            .collect();
        Self {
            geometry: feature.geometry.clone(),
            properties,
        }
    }
}
