//! Bottom-up numeric aggregation over the reconciled tree.
//!
//! Aggregation returns a fresh tree and never mutates its input. It is
//! idempotent: totals are always recomputed from children and only fill
//! fields absent at the node's own level, so re-aggregating an already
//! aggregated tree changes nothing.

use std::collections::BTreeMap;

use super::{HierarchicalTree, TreeNode};

/// Roll numeric fields up from children to ancestors.
///
/// Post-order traversal: a leaf returns a copy of itself; an internal node
/// aggregates its children first, then sums every numeric field appearing in
/// any child's data (non-numeric values are skipped, absent ones contribute
/// nothing) and merges the totals under its own data, own fields winning.
/// Feature-backed nodes receive the totals in `feature.properties`, so one
/// feature carries both its own attributes and rolled-up descendant totals.
pub fn aggregate(tree: &HierarchicalTree) -> HierarchicalTree {
    tree.iter()
        .map(|(name, node)| (name.clone(), aggregate_node(node)))
        .collect()
}

fn aggregate_node(node: &TreeNode) -> TreeNode {
    if node.is_leaf() {
        return node.clone();
    }

    let children: BTreeMap<String, TreeNode> = node
        .children
        .iter()
        .map(|(name, child)| (name.clone(), aggregate_node(child)))
        .collect();

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for child in children.values() {
        if let Some(fields) = child.data.fields() {
            for (field, cell) in fields {
                if let Some(value) = cell.as_number() {
                    *totals.entry(field.clone()).or_insert(0.0) += value;
                }
            }
        }
    }

    let mut data = node.data.clone();
    data.fill_missing_numeric(&totals);

    TreeNode {
        name: node.name.clone(),
        boundary_type: node.boundary_type.clone(),
        children,
        data,
    }
}
