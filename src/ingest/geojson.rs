//! GeoJSON uploads.

use std::path::Path;

use crate::model::{FeatureCollection, FlatRecordSet};

use super::{IngestError, IngestResult};

/// Parse a GeoJSON document into a record set carrying its features.
pub fn parse_feature_collection(name: &str, raw: &str) -> IngestResult<FlatRecordSet> {
    let fc: FeatureCollection = serde_json::from_str(raw).map_err(|source| IngestError::Parse {
        kind: "GeoJSON",
        source,
    })?;

    if fc.kind != "FeatureCollection" {
        return Err(IngestError::NotFeatureCollection(fc.kind));
    }

    Ok(FlatRecordSet::from_feature_collection(name, &fc))
}

/// Read and parse a GeoJSON file.
pub async fn read_geojson(name: &str, path: impl AsRef<Path>) -> IngestResult<FlatRecordSet> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_feature_collection(name, &raw)
}
