//! Dynamic dataset schemas.
//!
//! A [`SchemaDescriptor`] arrives as data (the active schema is configured
//! per deployment, not compiled in), gets validated once at load time, and
//! compiles into a [`Schema`] whose constraint kinds form a closed set. Ad
//! hoc probing of schema objects at validation time is deliberately
//! impossible: anything malformed fails at [`Schema::load`].

pub mod validator;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use validator::{
    validate_feature_collection, validate_record_set, ErrorLocationMap, IssueCode,
    ValidationReport,
};

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Fatal schema precondition errors.
///
/// These abort before any row-level checks run; they are never mixed into a
/// [`ValidationReport`].
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema descriptor has no properties")]
    MissingProperties,

    #[error("Failed to parse schema descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid pattern on column '{column}': {source}")]
    InvalidPattern {
        column: String,
        source: regex::Error,
    },

    #[error("Column '{0}' declares an empty enum")]
    EmptyEnum(String),
}

/// Declared type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Bool,
}

/// Which geographic axis a location column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationAxis {
    /// Bounded to [-180, 180].
    Longitude,
    /// Bounded to [-90, 90].
    Latitude,
}

impl LocationAxis {
    pub fn bounds(self) -> (f64, f64) {
        match self {
            LocationAxis::Longitude => (-180.0, 180.0),
            LocationAxis::Latitude => (-90.0, 90.0),
        }
    }
}

/// Constraint set for one column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,

    #[serde(rename = "isRequired", default)]
    pub required: bool,

    /// Regex the rendered cell value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Closed set of allowed values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,

    /// Marks a coordinate column and fixes its bounds.
    #[serde(
        rename = "isLocationDataColumns",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub location_axis: Option<LocationAxis>,

    /// Column feeds the formula evaluator's rule inputs.
    #[serde(rename = "isRuleConfigureInputs", default)]
    pub rule_input: bool,

    /// Identifier column hidden in generated templates.
    #[serde(rename = "isHidden", default)]
    pub hidden: bool,
}

/// The schema as it arrives from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub properties: BTreeMap<String, ColumnSpec>,

    /// Whether columns outside `properties` are tolerated.
    #[serde(rename = "additionalColumns", default = "default_true")]
    pub additional_columns: bool,
}

fn default_true() -> bool {
    true
}

/// A column with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledColumn {
    pub spec: ColumnSpec,
    pub pattern: Option<Regex>,
}

/// A loaded, validated schema ready for row checks.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: BTreeMap<String, CompiledColumn>,
    additional_columns: bool,
}

impl Schema {
    /// Validate and compile a descriptor.
    ///
    /// A descriptor without properties, with an uncompilable pattern, or
    /// with an empty enum is rejected here, before it can reach row checks.
    pub fn load(descriptor: SchemaDescriptor) -> SchemaResult<Self> {
        if descriptor.properties.is_empty() {
            return Err(SchemaError::MissingProperties);
        }

        let mut columns = BTreeMap::new();
        for (name, spec) in descriptor.properties {
            if let Some(values) = &spec.allowed_values {
                if values.is_empty() {
                    return Err(SchemaError::EmptyEnum(name));
                }
            }
            let pattern = match &spec.pattern {
                Some(raw) => Some(Regex::new(raw).map_err(|source| {
                    SchemaError::InvalidPattern {
                        column: name.clone(),
                        source,
                    }
                })?),
                None => None,
            };
            columns.insert(name, CompiledColumn { spec, pattern });
        }

        Ok(Self {
            columns,
            additional_columns: descriptor.additional_columns,
        })
    }

    /// Parse and load a descriptor from JSON.
    pub fn from_json(raw: &str) -> SchemaResult<Self> {
        let descriptor: SchemaDescriptor = serde_json::from_str(raw)?;
        Self::load(descriptor)
    }

    pub fn columns(&self) -> &BTreeMap<String, CompiledColumn> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&CompiledColumn> {
        self.columns.get(name)
    }

    pub fn allows_additional_columns(&self) -> bool {
        self.additional_columns
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Names of columns hidden in generated templates.
    pub fn hidden_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| c.spec.hidden)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
