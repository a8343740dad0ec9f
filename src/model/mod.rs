//! Core data model for boundary reconciliation.

pub mod cell;
pub mod geo;
pub mod hierarchy;
pub mod record;

pub use cell::Cell;
pub use geo::{Feature, FeatureCollection, GeoFeatureData};
pub use hierarchy::{BoundaryHierarchyDefinition, BoundaryNode, HierarchyError, HierarchyLevel};
pub use record::FlatRecordSet;
