//! JSON workbook uploads.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Cell, FlatRecordSet};

use super::{IngestError, IngestResult};

/// A decoded workbook: ordered sheets of header + rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookDocument {
    pub sheets: Vec<WorkbookSheet>,
}

/// One decoded sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookSheet {
    pub name: String,
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

/// Parse a workbook document into one record set per sheet.
pub fn parse_workbook(raw: &str) -> IngestResult<Vec<FlatRecordSet>> {
    let document: WorkbookDocument =
        serde_json::from_str(raw).map_err(|source| IngestError::Parse {
            kind: "workbook",
            source,
        })?;

    if document.sheets.is_empty() {
        return Err(IngestError::EmptyWorkbook);
    }

    Ok(document
        .sheets
        .into_iter()
        .map(|sheet| FlatRecordSet::new(sheet.name, sheet.header, sheet.rows))
        .collect())
}

/// Read and parse a workbook file.
pub async fn read_workbook(path: impl AsRef<Path>) -> IngestResult<Vec<FlatRecordSet>> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_workbook(&raw)
}
