//! Administrative hierarchy definition and the official boundary tree.
//!
//! Both structures come from the boundary service and are never mutated by
//! the engine: the hierarchy definition fixes column order and the
//! parent/child relation for every other structure, and the boundary tree is
//! the source of truth for template generation.

use serde::{Deserialize, Serialize};

/// Error type for hierarchy definitions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HierarchyError {
    #[error("Hierarchy has no levels")]
    Empty,

    #[error("First level '{0}' must not declare a parent")]
    RootHasParent(String),

    #[error("Level '{level}' declares parent '{declared}' but follows '{preceding}'")]
    BrokenChain {
        level: String,
        declared: String,
        preceding: String,
    },

    #[error("Level '{level}' follows '{preceding}' but declares no parent")]
    MissingParent { level: String, preceding: String },

    #[error("Duplicate level name: '{0}'")]
    DuplicateLevel(String),
}

/// One rank in the administrative nesting (e.g. District, Village).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyLevel {
    /// Level name; doubles as the column name carrying this level's value
    /// in uploaded sheets.
    #[serde(rename = "boundaryType")]
    pub boundary_type: String,

    /// The level immediately above, `None` for the root level.
    #[serde(rename = "parentBoundaryType")]
    pub parent_boundary_type: Option<String>,
}

/// Ordered list of hierarchy levels, root first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryHierarchyDefinition {
    pub levels: Vec<HierarchyLevel>,
}

impl BoundaryHierarchyDefinition {
    /// Build a definition and verify the parent chain.
    ///
    /// Each level after the first must name the preceding level as its
    /// parent; level names must be unique. An empty level list is rejected
    /// here — downstream code treats an empty hierarchy as "no tree" rather
    /// than an error, but the service is expected to hand over a valid one.
    pub fn load(levels: Vec<HierarchyLevel>) -> Result<Self, HierarchyError> {
        if levels.is_empty() {
            return Err(HierarchyError::Empty);
        }

        let mut seen = std::collections::HashSet::new();
        for level in &levels {
            if !seen.insert(level.boundary_type.clone()) {
                return Err(HierarchyError::DuplicateLevel(level.boundary_type.clone()));
            }
        }

        if let Some(parent) = &levels[0].parent_boundary_type {
            if !parent.is_empty() {
                return Err(HierarchyError::RootHasParent(levels[0].boundary_type.clone()));
            }
        }

        for pair in levels.windows(2) {
            let (above, below) = (&pair[0], &pair[1]);
            match &below.parent_boundary_type {
                None => {
                    return Err(HierarchyError::MissingParent {
                        level: below.boundary_type.clone(),
                        preceding: above.boundary_type.clone(),
                    })
                }
                Some(declared) if declared != &above.boundary_type => {
                    return Err(HierarchyError::BrokenChain {
                        level: below.boundary_type.clone(),
                        declared: declared.clone(),
                        preceding: above.boundary_type.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(Self { levels })
    }

    /// Number of levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Level names in root-first order.
    pub fn level_names(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.boundary_type.as_str()).collect()
    }

    /// Position of a level by name.
    pub fn level_index(&self, boundary_type: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.boundary_type == boundary_type)
    }
}

/// A node in the official administrative-boundary tree, as returned by the
/// boundary service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryNode {
    /// Unique boundary code (the join key across datasets).
    pub code: String,

    /// Human-readable boundary name.
    #[serde(default)]
    pub name: String,

    /// Hierarchy level this boundary sits at.
    #[serde(rename = "boundaryType")]
    pub boundary_type: String,

    /// Code of the parent boundary, `None` at the top.
    #[serde(rename = "parentCode", default)]
    pub parent_code: Option<String>,

    /// Set on top-level nodes of the relationship forest.
    #[serde(rename = "isRoot", default)]
    pub is_root: bool,

    #[serde(default)]
    pub children: Vec<BoundaryNode>,
}

impl BoundaryNode {
    /// Total number of nodes in this subtree, including self.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(BoundaryNode::size).sum::<usize>()
    }
}
