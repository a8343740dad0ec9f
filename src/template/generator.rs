//! Hierarchy-aware spreadsheet template generation.
//!
//! The official boundary tree expands into flat, uniformly wide rows of
//! boundary codes, headed by the (translated) hierarchy level names and a
//! trailing common column, with schema-declared columns appended blank for
//! data collection.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::config::Settings;
use crate::model::{BoundaryHierarchyDefinition, BoundaryNode, Cell, FlatRecordSet};
use crate::schema::{Schema, ValidationReport};

use super::{
    BandKind, FacilityMasterJoin, HeaderBand, Protection, Sheet, Span, TemplateOptions,
};

/// Result type for template generation.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors for template generation.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Split level '{0}' is not part of the hierarchy")]
    UnknownSplitLevel(String),

    #[error("Facility master '{dataset}' has no join column '{column}'")]
    MissingJoinKey { dataset: String, column: String },

    #[error("Facility master mapping references unknown column '{0}'")]
    UnknownMasterColumn(String),
}

/// Generate collection template sheets from the official boundary tree.
///
/// Every coded node contributes one row of its ancestor codes plus its own
/// code; rows are padded to a uniform width by repeating the last known
/// code, while genuinely absent ancestor codes stay empty — codes are never
/// fabricated. With `split_by_level`, rows redistribute into one sheet per
/// distinct value at that level's column; rows blank there are buffered as
/// dangling and merged into the next sheet that introduces a value under
/// the same earlier-column prefix.
pub fn generate(
    hierarchy: &BoundaryHierarchyDefinition,
    roots: &[BoundaryNode],
    schema: Option<&Schema>,
    settings: &Settings,
    options: &TemplateOptions,
) -> TemplateResult<Vec<Sheet>> {
    let layout = SheetLayout::new(hierarchy, schema, settings);
    let join = MasterJoin::prepare(options.facility_master.as_ref(), settings)?;

    let mut raw_rows = Vec::new();
    let mut path = Vec::new();
    for root in roots {
        collect_rows(root, &mut path, &mut raw_rows);
    }

    let sheets = match &options.split_by_level {
        None => {
            let mut sheet = layout.empty_sheet(&settings.template.sheet_name);
            for raw in &raw_rows {
                sheet.rows.push(layout.data_row(raw, join.as_ref()));
            }
            vec![sheet]
        }
        Some(level) => {
            let col = hierarchy
                .level_index(level)
                .ok_or_else(|| TemplateError::UnknownSplitLevel(level.clone()))?;
            split_rows(raw_rows, col)
                .into_iter()
                .map(|bucket| {
                    let mut sheet = layout.empty_sheet(&bucket.name);
                    for raw in &bucket.rows {
                        sheet.rows.push(layout.data_row(raw, join.as_ref()));
                    }
                    sheet
                })
                .collect()
        }
    };

    Ok(sheets)
}

/// Echo an uploaded record set with a trailing error column.
///
/// Each row's issues are rendered as `column: message` pairs so the user can
/// fix the flagged cells in place and re-upload.
pub fn annotate_errors(set: &FlatRecordSet, report: &ValidationReport) -> Sheet {
    let mut header = set.header_row.clone();
    let error_col = header.len();
    header.push("Errors".to_string());

    let mut sheet = Sheet::new(set.name.clone(), header);
    sheet.bands.push(HeaderBand {
        kind: BandKind::Error,
        start_col: error_col,
        end_col: error_col + 1,
    });

    let row_issues = report.errors.sheet(&set.name);
    for (row_idx, cells) in set.rows.iter().enumerate() {
        let mut row = cells.clone();
        row.resize(error_col, Cell::Empty);

        let rendered = row_issues
            .and_then(|rows| rows.get(&row_idx))
            .map(|cols| {
                cols.iter()
                    .map(|(col, issues)| {
                        let joined = issues
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("; ");
                        format!("{}: {}", col, joined)
                    })
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .unwrap_or_default();

        row.push(if rendered.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(rendered)
        });
        sheet.rows.push(row);
    }

    sheet
}

// ============================================================================
// Row collection and splitting
// ============================================================================

fn collect_rows(node: &BoundaryNode, path: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    let code = node.code.trim().to_string();
    let coded = !code.is_empty();
    path.push(code);
    if coded {
        out.push(path.clone());
    }
    for child in &node.children {
        collect_rows(child, path, out);
    }
    path.pop();
}

struct Bucket {
    name: String,
    rows: Vec<Vec<String>>,
}

fn split_rows(raw_rows: Vec<Vec<String>>, col: usize) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dangling: Vec<(String, Vec<String>)> = Vec::new();

    for raw in raw_rows {
        let value = raw.get(col).filter(|c| !c.is_empty()).cloned();
        match value {
            None => dangling.push((prefix_key(&raw, col), raw)),
            Some(value) => {
                let bucket_idx = match index.get(&value) {
                    Some(idx) => *idx,
                    None => {
                        // A sheet introducing this value adopts the dangling
                        // rows buffered under the same ancestor prefix.
                        let prefix = prefix_key(&raw, col);
                        let mut adopted = Vec::new();
                        dangling.retain(|(p, row)| {
                            if *p == prefix {
                                adopted.push(row.clone());
                                false
                            } else {
                                true
                            }
                        });
                        index.insert(value.clone(), buckets.len());
                        buckets.push(Bucket {
                            name: value.clone(),
                            rows: adopted,
                        });
                        buckets.len() - 1
                    }
                };
                buckets[bucket_idx].rows.push(raw);
            }
        }
    }

    // Dangling rows no later sheet claimed still have to land somewhere.
    let mut leftovers: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();
    for (prefix, row) in dangling {
        leftovers.entry(prefix).or_default().push(row);
    }
    for (prefix, rows) in leftovers {
        let name = prefix
            .split('\u{1f}')
            .rev()
            .find(|c| !c.is_empty())
            .unwrap_or("unassigned")
            .to_string();
        debug!(sheet = %name, rows = rows.len(), "emitting unclaimed dangling rows");
        buckets.push(Bucket { name, rows });
    }

    buckets
}

fn prefix_key(raw: &[String], col: usize) -> String {
    raw[..col.min(raw.len())].join("\u{1f}")
}

// ============================================================================
// Sheet layout
// ============================================================================

struct SheetLayout<'a> {
    hier_width: usize,
    header: Vec<String>,
    schema_columns: Vec<String>,
    bands: Vec<HeaderBand>,
    protections: Vec<Protection>,
    hidden_columns: Vec<usize>,
    schema: Option<&'a Schema>,
}

impl<'a> SheetLayout<'a> {
    fn new(
        hierarchy: &BoundaryHierarchyDefinition,
        schema: Option<&'a Schema>,
        settings: &Settings,
    ) -> Self {
        let hier_width = hierarchy.depth();
        let mut header: Vec<String> = hierarchy
            .levels
            .iter()
            .map(|l| settings.template.label_for(&l.boundary_type))
            .collect();
        header.push(settings.common_column.clone());

        let schema_columns: Vec<String> = schema
            .map(|s| s.column_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        let schema_start = header.len();
        header.extend(schema_columns.iter().cloned());

        let mut bands = vec![HeaderBand {
            kind: BandKind::Hierarchy,
            start_col: 0,
            end_col: schema_start,
        }];
        let mut protections = vec![
            // Header row is locked across all columns.
            Protection {
                rows: Span::range(0, 1),
                cols: Span::all(),
                locked: true,
            },
            // Pre-filled boundary columns are locked.
            Protection {
                rows: Span::all(),
                cols: Span::range(0, schema_start),
                locked: true,
            },
        ];
        let mut hidden_columns = Vec::new();

        if !schema_columns.is_empty() {
            bands.push(HeaderBand {
                kind: BandKind::Schema,
                start_col: schema_start,
                end_col: header.len(),
            });
            protections.push(Protection {
                rows: Span { start: 1, end: None },
                cols: Span::range(schema_start, header.len()),
                locked: false,
            });
            if let Some(schema) = schema {
                for hidden in schema.hidden_columns() {
                    if let Some(pos) = schema_columns.iter().position(|c| c == hidden) {
                        hidden_columns.push(schema_start + pos);
                    }
                }
            }
        }

        Self {
            hier_width,
            header,
            schema_columns,
            bands,
            protections,
            hidden_columns,
            schema,
        }
    }

    fn empty_sheet(&self, name: &str) -> Sheet {
        let mut sheet = Sheet::new(name, self.header.clone());
        sheet.bands = self.bands.clone();
        sheet.protections = self.protections.clone();
        sheet.hidden_columns = self.hidden_columns.clone();
        sheet
    }

    fn data_row(&self, raw: &[String], join: Option<&MasterJoin<'_>>) -> Vec<Cell> {
        if raw.len() > self.hier_width {
            warn!(
                depth = raw.len(),
                width = self.hier_width,
                "boundary path deeper than hierarchy; truncating"
            );
        }

        let mut cells = Vec::with_capacity(self.header.len());
        let mut last_known = "";
        for i in 0..self.hier_width {
            match raw.get(i).map(String::as_str) {
                Some("") => cells.push(Cell::Empty),
                Some(code) => {
                    last_known = code;
                    cells.push(Cell::Text(code.to_string()));
                }
                None => cells.push(Cell::from(last_known)),
            }
        }

        let own_code = raw.iter().rev().find(|c| !c.is_empty());
        cells.push(match own_code {
            Some(code) => Cell::Text(code.clone()),
            None => Cell::Empty,
        });

        if self.schema.is_some() {
            let master_row = join.and_then(|j| own_code.and_then(|code| j.row_for(code)));
            for column in &self.schema_columns {
                let filled = master_row
                    .and_then(|row| join.and_then(|j| j.value_for(column, row)));
                cells.push(filled.unwrap_or(Cell::Empty));
            }
        }

        cells
    }
}

// ============================================================================
// Facility master join
// ============================================================================

struct MasterJoin<'a> {
    join: &'a FacilityMasterJoin,
    by_code: HashMap<String, usize>,
}

impl<'a> MasterJoin<'a> {
    fn prepare(
        join: Option<&'a FacilityMasterJoin>,
        settings: &Settings,
    ) -> TemplateResult<Option<Self>> {
        let Some(join) = join else {
            return Ok(None);
        };

        let key_col = join
            .dataset
            .column_index(&settings.common_column)
            .ok_or_else(|| TemplateError::MissingJoinKey {
                dataset: join.dataset.name.clone(),
                column: settings.common_column.clone(),
            })?;

        for master_column in join.mapping.values() {
            if join.dataset.column_index(master_column).is_none() {
                return Err(TemplateError::UnknownMasterColumn(master_column.clone()));
            }
        }

        let mut by_code = HashMap::new();
        for (row_idx, row) in join.dataset.rows.iter().enumerate() {
            if let Some(code) = row.get(key_col).and_then(Cell::key) {
                by_code.entry(code).or_insert(row_idx);
            }
        }

        Ok(Some(Self { join, by_code }))
    }

    fn row_for(&self, code: &str) -> Option<usize> {
        self.by_code.get(code).copied()
    }

    fn value_for(&self, schema_column: &str, row: usize) -> Option<Cell> {
        let master_column = self.join.mapping.get(schema_column)?;
        let col = self.join.dataset.column_index(master_column)?;
        self.join.dataset.rows.get(row)?.get(col).cloned()
    }
}
