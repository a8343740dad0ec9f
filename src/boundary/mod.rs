//! Boundary service collaborator.
//!
//! The engine treats the boundary service as an async provider of two
//! structures fetched once per session: the ordered hierarchy definition
//! and the official boundary relationship forest. Implementations differ by
//! transport only; a file-backed provider covers CLI usage and a static
//! provider covers tests and embedding.

pub mod provider;

use std::path::PathBuf;

pub use provider::{BoundaryProvider, FileBoundaryProvider, StaticBoundaryProvider};

use crate::model::HierarchyError;

/// Result type for boundary-service operations.
pub type BoundaryResult<T> = Result<T, BoundaryError>;

/// Errors raised by boundary providers.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse boundary payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid hierarchy definition: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("No boundary with code '{0}'")]
    SubtreeNotFound(String),
}
