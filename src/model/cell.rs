//! Cell values for tabular records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell in an uploaded record.
///
/// Uploaded sheets and GeoJSON properties are heterogeneous; a cell is the
/// common currency between the validator, the tree builder and the template
/// generator. Serializes untagged, so a JSON row like `["IN", 100, null]`
/// round-trips directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Absent or blank value.
    Empty,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value (all JSON numbers widen to f64).
    Number(f64),
    /// Free text.
    Text(String),
}

impl Cell {
    /// True for `Empty` and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell.
    ///
    /// Spreadsheet codecs frequently deliver numbers as text, so numeric
    /// text parses too. Returns `None` for non-numeric values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Text view of the cell, without rendering numbers.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The cell's key form: trimmed text, or a rendered number.
    ///
    /// Used wherever a cell value becomes a tree key or a sheet name.
    pub fn key(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        Some(self.to_string())
    }

    /// Build a cell from a JSON value, mapping objects/arrays to their
    /// compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Empty,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => {
                n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty)
            }
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", ryu::Buffer::new().format(*n))
                }
            }
            Cell::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}
