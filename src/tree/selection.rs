//! Boundary-selection dropdowns and stale-descendant pruning.
//!
//! As the user narrows scope level by level, each dropdown only offers names
//! reachable under the current selections, and deselecting an ancestor
//! strips every selection it previously implied — a descendant that can no
//! longer be reached unambiguously must not stay selected.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::model::{BoundaryHierarchyDefinition, HierarchyLevel};

use super::{HierarchicalTree, TreeNode};

/// Selected boundary names per hierarchy level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionState {
    by_level: BTreeMap<String, BTreeSet<String>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected names at a level; empty when nothing is selected there.
    pub fn get(&self, boundary_type: &str) -> BTreeSet<String> {
        self.by_level.get(boundary_type).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, boundary_type: impl Into<String>, values: BTreeSet<String>) {
        let boundary_type = boundary_type.into();
        if values.is_empty() {
            self.by_level.remove(&boundary_type);
        } else {
            self.by_level.insert(boundary_type, values);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_level.values().all(BTreeSet::is_empty)
    }

    pub fn levels(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.by_level.iter()
    }
}

/// Dropdown options for one level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelOptions {
    pub boundary_type: String,
    pub options: Vec<String>,
}

/// Compute per-level dropdown options.
///
/// Level 0 always offers the root names. Each deeper level offers the
/// deduplicated child names of the nodes selected at the level above, and
/// stays empty until that parent level has a selection.
pub fn compute_options(
    tree: &HierarchicalTree,
    hierarchy: &BoundaryHierarchyDefinition,
    selections: &SelectionState,
) -> Vec<LevelOptions> {
    let mut out = Vec::with_capacity(hierarchy.depth());
    let mut frontier: Vec<&TreeNode> = tree.values().collect();

    for level in &hierarchy.levels {
        let mut names: Vec<String> = frontier.iter().map(|n| n.name.clone()).collect();
        names.sort();
        names.dedup();
        out.push(LevelOptions {
            boundary_type: level.boundary_type.clone(),
            options: names,
        });

        let selected = selections.get(&level.boundary_type);
        if selected.is_empty() {
            frontier = Vec::new();
        } else {
            frontier = frontier
                .into_iter()
                .filter(|n| selected.contains(&n.name))
                .flat_map(|n| n.children.values())
                .collect();
        }
    }

    out
}

/// Rebuild a filtered view of the tree under the current selections.
///
/// Walking top-down: a level with selections keeps only the matching named
/// nodes (recursing into their children); a level without selections passes
/// every node through unchanged.
pub fn filter_tree(
    tree: &HierarchicalTree,
    hierarchy: &BoundaryHierarchyDefinition,
    selections: &SelectionState,
) -> HierarchicalTree {
    filter_level(tree, &hierarchy.levels, selections)
}

fn filter_level(
    nodes: &BTreeMap<String, TreeNode>,
    levels: &[HierarchyLevel],
    selections: &SelectionState,
) -> BTreeMap<String, TreeNode> {
    let Some((level, rest)) = levels.split_first() else {
        return nodes.clone();
    };
    let selected = selections.get(&level.boundary_type);

    nodes
        .iter()
        .filter(|(name, _)| selected.is_empty() || selected.contains(*name))
        .map(|(name, node)| {
            (
                name.clone(),
                TreeNode {
                    name: node.name.clone(),
                    boundary_type: node.boundary_type.clone(),
                    children: filter_level(&node.children, rest, selections),
                    data: node.data.clone(),
                },
            )
        })
        .collect()
}

/// Apply a selection change at one level, pruning stale descendants.
///
/// Names removed from the changed level invalidate every selection that was
/// only reachable through them: the removed nodes' full descendant-name
/// sets are stripped from all other levels. Added names prune nothing.
pub fn apply_selection(
    boundary_type: &str,
    values: BTreeSet<String>,
    tree: &HierarchicalTree,
    current: &SelectionState,
) -> SelectionState {
    let old = current.get(boundary_type);
    let removed: BTreeSet<String> = old.difference(&values).cloned().collect();

    let mut next = current.clone();
    next.set(boundary_type, values);

    if removed.is_empty() {
        return next;
    }

    let mut stale = BTreeSet::new();
    for name in &removed {
        collect_descendants(tree, boundary_type, name, &mut stale);
    }

    if stale.is_empty() {
        return next;
    }

    debug!(level = boundary_type, stale = stale.len(), "pruning stale descendant selections");

    let levels: Vec<String> = next.by_level.keys().cloned().collect();
    for level in levels {
        if level == boundary_type {
            continue;
        }
        let kept: BTreeSet<String> = next
            .get(&level)
            .into_iter()
            .filter(|n| !stale.contains(n))
            .collect();
        next.set(level, kept);
    }

    next
}

/// Gather descendant names of every node matching `(boundary_type, name)`.
fn collect_descendants(
    nodes: &BTreeMap<String, TreeNode>,
    boundary_type: &str,
    name: &str,
    out: &mut BTreeSet<String>,
) {
    for node in nodes.values() {
        if node.boundary_type == boundary_type && node.name == name {
            node.descendant_names(out);
        } else {
            collect_descendants(&node.children, boundary_type, name, out);
        }
    }
}
