//! Uploaded flat record sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{Cell, FeatureCollection, GeoFeatureData};

/// One uploaded sheet or feature collection, as a header row plus data rows.
///
/// A record set is created per file upload and replaced — not merged in
/// place — on re-upload; predecessors are kept with `active = false` so the
/// audit trail survives. `header_row[i]` names column `i`; the configured
/// common column holds the boundary code joining datasets together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecordSet {
    pub id: Uuid,

    /// Sheet name or dataset section name.
    pub name: String,

    pub header_row: Vec<String>,
    pub rows: Vec<Vec<Cell>>,

    /// Per-row feature payloads for geospatial uploads; empty for tabular
    /// ones. When non-empty, the length matches `rows`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Option<GeoFeatureData>>,

    /// Cleared when a newer upload under the same name replaces this one.
    pub active: bool,
}

impl FlatRecordSet {
    /// New tabular record set with a fresh id.
    pub fn new(name: impl Into<String>, header_row: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            header_row,
            rows,
            features: Vec::new(),
            active: true,
        }
    }

    /// Build a record set from a GeoJSON feature collection.
    ///
    /// The header is the sorted union of property keys across features; each
    /// row carries the flattened property cells and keeps the originating
    /// feature alongside so geometry survives into the tree.
    pub fn from_feature_collection(name: impl Into<String>, fc: &FeatureCollection) -> Self {
        let mut keys: Vec<String> = fc
            .features
            .iter()
            .flat_map(|f| f.properties.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();

        let mut rows = Vec::with_capacity(fc.features.len());
        let mut features = Vec::with_capacity(fc.features.len());
        for feature in &fc.features {
            let data = GeoFeatureData::from_feature(feature);
            let row = keys
                .iter()
                .map(|k| data.properties.get(k).cloned().unwrap_or(Cell::Empty))
                .collect();
            rows.push(row);
            features.push(Some(data));
        }

        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            header_row: keys,
            rows,
            features,
            active: true,
        }
    }

    /// Column position by header name.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.header_row.iter().position(|h| h == header)
    }

    /// Header-keyed view of one row.
    pub fn row_map(&self, row: usize) -> BTreeMap<String, Cell> {
        let mut map = BTreeMap::new();
        if let Some(cells) = self.rows.get(row) {
            for (i, header) in self.header_row.iter().enumerate() {
                let cell = cells.get(i).cloned().unwrap_or(Cell::Empty);
                map.insert(header.clone(), cell);
            }
        }
        map
    }

    /// Feature payload for a row, if this is a geospatial dataset.
    pub fn feature(&self, row: usize) -> Option<&GeoFeatureData> {
        self.features.get(row).and_then(|f| f.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
