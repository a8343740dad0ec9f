//! Row- and feature-level validation against a loaded schema.
//!
//! Validation is a pure function over its inputs: every issue is attached at
//! its `(sheet, row, column)` coordinate so the caller can highlight the
//! offending cells in place, and the upload itself is retained but flagged.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Cell, FeatureCollection, FlatRecordSet};

use super::{ColumnType, CompiledColumn, Schema, SchemaError, SchemaResult};

/// One validation finding.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueCode {
    /// Required column empty or absent.
    MissingRequired,
    /// Value fails the declared column type.
    TypeMismatch,
    /// Value fails the declared regex.
    PatternViolation,
    /// Value outside the declared enum.
    EnumViolation { allowed: Vec<String> },
    /// Coordinate outside its axis bounds.
    LocationBounds,
    /// Column not declared by a schema that forbids extras.
    AdditionalProperty,
    /// Zero data rows.
    DatasetEmpty,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCode::MissingRequired => write!(f, "required value is missing"),
            IssueCode::TypeMismatch => write!(f, "value does not match the declared type"),
            IssueCode::PatternViolation => write!(f, "value does not match the required pattern"),
            IssueCode::EnumViolation { allowed } => {
                write!(f, "value must be one of: {}", allowed.join(", "))
            }
            IssueCode::LocationBounds => write!(f, "coordinate is out of bounds"),
            IssueCode::AdditionalProperty => write!(f, "column is not part of the schema"),
            IssueCode::DatasetEmpty => write!(f, "dataset contains no rows"),
        }
    }
}

/// Issues keyed by `sheet → row → column`.
///
/// Duplicate issues at the same coordinate are collapsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorLocationMap {
    entries: BTreeMap<String, BTreeMap<usize, BTreeMap<String, Vec<IssueCode>>>>,
}

impl ErrorLocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue at a cell coordinate.
    pub fn push(&mut self, sheet: &str, row: usize, column: &str, issue: IssueCode) {
        let cell = self
            .entries
            .entry(sheet.to_string())
            .or_default()
            .entry(row)
            .or_default()
            .entry(column.to_string())
            .or_default();
        if !cell.contains(&issue) {
            cell.push(issue);
        }
    }

    /// Issues at one coordinate.
    pub fn at(&self, sheet: &str, row: usize, column: &str) -> &[IssueCode] {
        self.entries
            .get(sheet)
            .and_then(|rows| rows.get(&row))
            .and_then(|cols| cols.get(column))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Row-keyed issues for one sheet.
    pub fn sheet(&self, sheet: &str) -> Option<&BTreeMap<usize, BTreeMap<String, Vec<IssueCode>>>> {
        self.entries.get(sheet)
    }

    /// All sheets with issues, in name order.
    pub fn sheets(
        &self,
    ) -> impl Iterator<Item = (&String, &BTreeMap<usize, BTreeMap<String, Vec<IssueCode>>>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of recorded issues.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|rows| rows.values())
            .flat_map(|cols| cols.values())
            .map(Vec::len)
            .sum()
    }

    /// Merge another map into this one, preserving deduplication.
    pub fn extend(&mut self, other: ErrorLocationMap) {
        for (sheet, rows) in other.entries {
            for (row, cols) in rows {
                for (col, issues) in cols {
                    for issue in issues {
                        self.push(&sheet, row, &col, issue);
                    }
                }
            }
        }
    }
}

/// Outcome of validating one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: ErrorLocationMap,
    /// Sheet-level findings with no cell coordinate.
    pub messages: Vec<IssueCode>,
}

impl ValidationReport {
    fn from_parts(errors: ErrorLocationMap, messages: Vec<IssueCode>) -> Self {
        Self {
            valid: errors.is_empty() && messages.is_empty(),
            errors,
            messages,
        }
    }
}

/// Validate a tabular record set.
///
/// Each row is checked as a header-keyed object against the schema. The
/// schema must have been loadable at all — an empty column set is a fatal
/// precondition, short-circuiting before any row check runs.
pub fn validate_record_set(set: &FlatRecordSet, schema: &Schema) -> SchemaResult<ValidationReport> {
    if schema.is_empty() {
        return Err(SchemaError::MissingProperties);
    }

    let mut errors = ErrorLocationMap::new();
    let mut messages = Vec::new();

    if set.is_empty() {
        messages.push(IssueCode::DatasetEmpty);
        return Ok(ValidationReport::from_parts(errors, messages));
    }

    for row_idx in 0..set.rows.len() {
        let row = set.row_map(row_idx);
        check_row(&set.name, row_idx, &row, schema, &mut errors);
    }

    Ok(ValidationReport::from_parts(errors, messages))
}

/// Validate a GeoJSON feature collection.
///
/// Each feature's `properties` object is checked exactly like a sheet row;
/// the feature index takes the row position in issue coordinates.
pub fn validate_feature_collection(
    name: &str,
    fc: &FeatureCollection,
    schema: &Schema,
) -> SchemaResult<ValidationReport> {
    let set = FlatRecordSet::from_feature_collection(name, fc);
    validate_record_set(&set, schema)
}

fn check_row(
    sheet: &str,
    row_idx: usize,
    row: &BTreeMap<String, Cell>,
    schema: &Schema,
    errors: &mut ErrorLocationMap,
) {
    for (column, compiled) in schema.columns() {
        let cell = row.get(column).cloned().unwrap_or(Cell::Empty);
        check_cell(sheet, row_idx, column, &cell, compiled, errors);
    }

    if !schema.allows_additional_columns() {
        for (column, cell) in row {
            if schema.column(column).is_none() && !cell.is_blank() {
                errors.push(sheet, row_idx, column, IssueCode::AdditionalProperty);
            }
        }
    }
}

fn check_cell(
    sheet: &str,
    row_idx: usize,
    column: &str,
    cell: &Cell,
    compiled: &CompiledColumn,
    errors: &mut ErrorLocationMap,
) {
    let spec = &compiled.spec;

    if cell.is_blank() {
        if spec.required {
            errors.push(sheet, row_idx, column, IssueCode::MissingRequired);
        }
        return;
    }

    match spec.column_type {
        ColumnType::Number => {
            if cell.as_number().is_none() {
                errors.push(sheet, row_idx, column, IssueCode::TypeMismatch);
            }
        }
        ColumnType::Bool => {
            let ok = match cell {
                Cell::Bool(_) => true,
                Cell::Text(s) => matches!(s.trim(), "true" | "false"),
                _ => false,
            };
            if !ok {
                errors.push(sheet, row_idx, column, IssueCode::TypeMismatch);
            }
        }
        ColumnType::Text => {}
    }

    let rendered = cell.to_string();

    if let Some(pattern) = &compiled.pattern {
        if !pattern.is_match(&rendered) {
            errors.push(sheet, row_idx, column, IssueCode::PatternViolation);
        }
    }

    if let Some(allowed) = &spec.allowed_values {
        if !allowed.iter().any(|v| v == &rendered) {
            errors.push(
                sheet,
                row_idx,
                column,
                IssueCode::EnumViolation {
                    allowed: allowed.clone(),
                },
            );
        }
    }

    if let Some(axis) = spec.location_axis {
        if let Some(value) = cell.as_number() {
            let (lo, hi) = axis.bounds();
            if value < lo || value > hi {
                errors.push(sheet, row_idx, column, IssueCode::LocationBounds);
            }
        }
    }
}
