//! # Atoll
//!
//! A hierarchical boundary data reconciliation and aggregation engine.
//!
//! ## Architecture
//!
//! Atoll reconciles heterogeneous, administratively-scoped uploads
//! (spreadsheets, GeoJSON, zipped shapefiles) against an official
//! administrative-boundary hierarchy:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Uploads (workbook / GeoJSON / shapefile)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [ingest]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 FlatRecordSet (typed rows)               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema validator]
//! ┌─────────────────────────────────────────────────────────┐
//! │        ValidationReport (per-cell issue locations)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [tree builder + aggregator]
//! ┌─────────────────────────────────────────────────────────┐
//! │     HierarchicalTree (reconciled, rolled-up totals)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [selection filter / templates]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Dropdown options, filtered views, collection sheets    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transformation is a pure function from old state to new state; the
//! [`session::Session`] container owns the state and replaces derived
//! structures wholesale on every change.

pub mod boundary;
pub mod cache;
pub mod config;
pub mod formula;
pub mod ingest;
pub mod model;
pub mod schema;
pub mod session;
pub mod template;
pub mod tree;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::boundary::{BoundaryProvider, StaticBoundaryProvider};
    pub use crate::formula::{HypothesisAssumption, Operator, Rule, RuleSet};
    pub use crate::model::{
        BoundaryHierarchyDefinition, BoundaryNode, Cell, FlatRecordSet, GeoFeatureData,
        HierarchyLevel,
    };
    pub use crate::schema::{Schema, SchemaDescriptor, ValidationReport};
    pub use crate::session::{EngineError, Session};
    pub use crate::template::{Sheet, TemplateOptions};
    pub use crate::tree::{
        aggregate, build, HierarchicalTree, NodeData, SelectionState, TreeNode,
    };
}

// Also export the workhorse types at the crate root for convenience
pub use model::{BoundaryHierarchyDefinition, BoundaryNode, Cell, FlatRecordSet};
pub use schema::{Schema, ValidationReport};
pub use tree::{HierarchicalTree, TreeNode};
