//! Spreadsheet template output model.
//!
//! The engine emits [`Sheet`] values plus styling/protection directives; a
//! spreadsheet codec library turns them into workbook bytes. Nothing here
//! encodes a binary format.

pub mod generator;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Cell, FlatRecordSet};

pub use generator::{annotate_errors, generate, TemplateError, TemplateResult};

/// Which header color band a column range belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandKind {
    /// Hierarchy and common (boundary-code) columns.
    Hierarchy,
    /// Schema-derived data-collection columns.
    Schema,
    /// Validation-error columns.
    Error,
}

/// A half-open column range `[start, end)` under one header band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBand {
    pub kind: BandKind,
    pub start_col: usize,
    pub end_col: usize,
}

/// A row or column span; `end = None` leaves the span unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: Option<usize>,
}

impl Span {
    pub fn all() -> Self {
        Span { start: 0, end: None }
    }

    pub fn range(start: usize, end: usize) -> Self {
        Span {
            start,
            end: Some(end),
        }
    }
}

/// Cell-protection directive for the codec.
///
/// Header and pre-filled boundary columns are locked; schema-added columns
/// stay editable so the template can actually collect data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub rows: Span,
    pub cols: Span,
    pub locked: bool,
}

/// One output sheet: ordered rows of cells plus directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub bands: Vec<HeaderBand>,
    pub protections: Vec<Protection>,
    /// Indices of designated identifier columns the codec should hide.
    pub hidden_columns: Vec<usize>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            name: name.into(),
            header,
            rows: Vec::new(),
            bands: Vec::new(),
            protections: Vec::new(),
            hidden_columns: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }
}

/// Join directive replacing blank schema columns with values from a
/// previously uploaded facility master dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityMasterJoin {
    /// The facility master upload, keyed by the common column.
    pub dataset: FlatRecordSet,
    /// `schema column → facility master column`.
    pub mapping: BTreeMap<String, String>,
}

/// Options controlling template generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOptions {
    /// Redistribute rows into one sheet per distinct value at this level.
    pub split_by_level: Option<String>,
    /// Pre-fill schema columns from a facility master upload.
    pub facility_master: Option<FacilityMasterJoin>,
}
