//! Folding flat record sets into the hierarchical tree.
//!
//! Datasets are folded in upload order; nodes with the same key are unioned
//! (children combined by key, data shallow-merged with the later dataset
//! winning per field). One bad row never aborts a build — it is logged and
//! skipped.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::model::{BoundaryHierarchyDefinition, Cell, FlatRecordSet};

use super::{HierarchicalTree, NodeData, TreeNode};

/// Result type for tree construction.
pub type BuildResult<T> = Result<T, BuildError>;

/// Per-row insertion failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("row {row} carries no value at any hierarchy level")]
    NoHierarchyValues { row: usize },
}

/// Build the reconciled tree from the given record sets.
///
/// For each row, hierarchy levels are walked left to right, descending into
/// (creating if absent) the child keyed by the cell under each level's
/// column; the row's full key→value map attaches at the deepest level whose
/// column is non-blank. A row blank at every level is skipped.
///
/// A malformed hierarchy with no levels yields an empty tree.
pub fn build(
    hierarchy: &BoundaryHierarchyDefinition,
    datasets: &[&FlatRecordSet],
) -> HierarchicalTree {
    let mut roots = HierarchicalTree::new();

    if hierarchy.levels.is_empty() {
        warn!("hierarchy has no levels; returning empty tree");
        return roots;
    }

    for set in datasets {
        for row_idx in 0..set.rows.len() {
            if let Err(err) = insert_row(&mut roots, hierarchy, set, row_idx) {
                warn!(dataset = %set.name, row = row_idx, error = %err, "skipping row");
            }
        }
    }

    roots
}

fn insert_row(
    roots: &mut HierarchicalTree,
    hierarchy: &BoundaryHierarchyDefinition,
    set: &FlatRecordSet,
    row_idx: usize,
) -> BuildResult<()> {
    let row = set.row_map(row_idx);

    // Contiguous non-blank prefix of level values; descent stops at the
    // first blank level, which handles rows whose hierarchy terminates
    // early (e.g. facility records with no sub-district value).
    let mut keys: Vec<String> = Vec::with_capacity(hierarchy.depth());
    for level in &hierarchy.levels {
        match row.get(&level.boundary_type).and_then(Cell::key) {
            Some(key) => keys.push(key),
            None => break,
        }
    }

    if keys.is_empty() {
        return Err(BuildError::NoHierarchyValues { row: row_idx });
    }

    if keys.len() < hierarchy.depth() {
        let tail_has_values = hierarchy.levels[keys.len()..]
            .iter()
            .any(|l| row.get(&l.boundary_type).map(|c| !c.is_blank()).unwrap_or(false));
        if tail_has_values {
            debug!(
                dataset = %set.name,
                row = row_idx,
                depth = keys.len(),
                "ignoring level values below a blank level"
            );
        }
    }

    let data = match set.feature(row_idx) {
        Some(feature) => {
            let mut feature = feature.clone();
            feature.properties.extend(row);
            NodeData::Feature(feature)
        }
        None => NodeData::Row(row),
    };

    insert_path(roots, &hierarchy.levels, &keys, data);
    Ok(())
}

fn insert_path(
    nodes: &mut BTreeMap<String, TreeNode>,
    levels: &[crate::model::HierarchyLevel],
    keys: &[String],
    data: NodeData,
) {
    let key = &keys[0];
    let node = nodes
        .entry(key.clone())
        .or_insert_with(|| TreeNode::new(key.clone(), levels[0].boundary_type.clone()));

    if keys.len() == 1 {
        let existing = std::mem::take(&mut node.data);
        node.data = existing.merged(data);
    } else {
        insert_path(&mut node.children, &levels[1..], &keys[1..], data);
    }
}
