//! The reconciled hierarchical tree.
//!
//! A [`HierarchicalTree`] is derived state: it is rebuilt from scratch from
//! the active record sets whenever any of them changes, never patched
//! incrementally. `BTreeMap` children give deterministic iteration, so two
//! builds from the same inputs produce identical trees.

pub mod aggregate;
pub mod builder;
pub mod selection;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Cell, GeoFeatureData};

pub use aggregate::aggregate;
pub use builder::{build, BuildError};
pub use selection::{apply_selection, compute_options, filter_tree, LevelOptions, SelectionState};

/// Root nodes keyed by name.
pub type HierarchicalTree = BTreeMap<String, TreeNode>;

/// Payload attached to a tree node.
///
/// A node carries data only at the position representing its row's deepest
/// non-blank hierarchy level; pass-through ancestors stay at `None` until
/// aggregation fills them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeData {
    /// GeoJSON-backed row; scalar merges land in `properties`.
    Feature(GeoFeatureData),
    /// Plain tabular row, header-keyed.
    Row(BTreeMap<String, Cell>),
    #[default]
    None,
}

impl NodeData {
    pub fn is_none(&self) -> bool {
        matches!(self, NodeData::None)
    }

    /// The node's attribute map, regardless of backing.
    pub fn fields(&self) -> Option<&BTreeMap<String, Cell>> {
        match self {
            NodeData::Feature(f) => Some(&f.properties),
            NodeData::Row(map) => Some(map),
            NodeData::None => None,
        }
    }

    /// Shallow-merge `later` over `self`, later fields winning.
    ///
    /// A feature target absorbs scalar fields into its properties instead of
    /// being replaced, so geometry survives dataset merging in either
    /// direction.
    pub fn merged(self, later: NodeData) -> NodeData {
        match (self, later) {
            (a, NodeData::None) => a,
            (NodeData::None, b) => b,
            (NodeData::Row(mut a), NodeData::Row(b)) => {
                a.extend(b);
                NodeData::Row(a)
            }
            (NodeData::Feature(mut f), NodeData::Row(b)) => {
                f.properties.extend(b);
                NodeData::Feature(f)
            }
            (NodeData::Row(a), NodeData::Feature(mut g)) => {
                for (k, v) in a {
                    g.properties.entry(k).or_insert(v);
                }
                NodeData::Feature(g)
            }
            (NodeData::Feature(f), NodeData::Feature(mut g)) => {
                for (k, v) in f.properties {
                    g.properties.entry(k).or_insert(v);
                }
                NodeData::Feature(g)
            }
        }
    }

    /// Add computed numeric totals for fields absent at this node.
    pub fn fill_missing_numeric(&mut self, totals: &BTreeMap<String, f64>) {
        if totals.is_empty() {
            return;
        }
        match self {
            NodeData::None => {
                let map = totals
                    .iter()
                    .map(|(k, v)| (k.clone(), Cell::Number(*v)))
                    .collect();
                *self = NodeData::Row(map);
            }
            NodeData::Row(map) => {
                for (k, v) in totals {
                    map.entry(k.clone()).or_insert(Cell::Number(*v));
                }
            }
            NodeData::Feature(f) => {
                for (k, v) in totals {
                    f.properties.entry(k.clone()).or_insert(Cell::Number(*v));
                }
            }
        }
    }
}

/// One node of the reconciled tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Key under the parent; the cell value from the level's column.
    pub name: String,

    /// Hierarchy level this node sits at.
    pub boundary_type: String,

    pub children: BTreeMap<String, TreeNode>,

    #[serde(default, skip_serializing_if = "NodeData::is_none")]
    pub data: NodeData,
}

impl TreeNode {
    pub fn new(name: impl Into<String>, boundary_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            boundary_type: boundary_type.into(),
            children: BTreeMap::new(),
            data: NodeData::None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// One field of the node's data.
    pub fn field(&self, name: &str) -> Option<&Cell> {
        self.data.fields().and_then(|f| f.get(name))
    }

    /// Collect the names of every descendant into `out`.
    pub fn descendant_names(&self, out: &mut std::collections::BTreeSet<String>) {
        for (name, child) in &self.children {
            out.insert(name.clone());
            child.descendant_names(out);
        }
    }
}
