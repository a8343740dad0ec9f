//! Upload parsing.
//!
//! Accepted upload forms: a JSON workbook (sheet name → header row + data
//! rows), a GeoJSON `FeatureCollection`, and a zipped-shapefile bundle
//! manifest. Decoding XLSX/DBF bytes belongs to the external codec; this
//! module takes the codec's decoded structures to [`FlatRecordSet`]s and
//! enforces the projection gate. File reads suspend only at the I/O
//! boundary; all transformation is synchronous.

pub mod geojson;
pub mod shapefile;
pub mod workbook;

pub use geojson::{parse_feature_collection, read_geojson};
pub use shapefile::{check_bundle, ShapefileBundle};
pub use workbook::{parse_workbook, read_workbook, WorkbookDocument, WorkbookSheet};

use std::path::PathBuf;

/// Result type for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised while parsing uploads.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {kind}: {source}")]
    Parse {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a FeatureCollection, got '{0}'")]
    NotFeatureCollection(String),

    #[error("Workbook contains no sheets")]
    EmptyWorkbook,

    #[error("Shapefile bundle is missing a required '{0}' member")]
    MissingBundleMember(&'static str),

    #[error("Shapefile bundle has no .prj projection file")]
    MissingProjection,

    #[error("Shapefile must be in EPSG:4326, found: {0}")]
    Projection(String),
}
