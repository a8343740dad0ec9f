//! BoundaryProvider trait and its implementations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::model::{BoundaryHierarchyDefinition, BoundaryNode, HierarchyLevel};

use super::{BoundaryError, BoundaryResult};

/// Async access to the boundary service.
///
/// Both fetches happen once per session; results are cached by the caller
/// (the [`crate::session::Session`]), not by the provider.
#[async_trait]
pub trait BoundaryProvider: Send + Sync {
    /// The ordered hierarchy definition, root level first.
    async fn fetch_hierarchy(&self) -> BoundaryResult<BoundaryHierarchyDefinition>;

    /// The official boundary relationship forest, roots flagged.
    async fn fetch_relationships(&self) -> BoundaryResult<Vec<BoundaryNode>>;

    /// One boundary subtree by code.
    async fn fetch_subtree(&self, code: &str) -> BoundaryResult<BoundaryNode> {
        let forest = self.fetch_relationships().await?;
        find_subtree(&forest, code)
            .cloned()
            .ok_or_else(|| BoundaryError::SubtreeNotFound(code.to_string()))
    }

    /// Batch fetch of subtrees, resolved concurrently.
    async fn fetch_subtrees(&self, codes: &[String]) -> BoundaryResult<Vec<BoundaryNode>> {
        let futures: Vec<_> = codes.iter().map(|code| self.fetch_subtree(code)).collect();
        let results = futures::future::join_all(futures).await;
        results.into_iter().collect()
    }
}

fn find_subtree<'a>(nodes: &'a [BoundaryNode], code: &str) -> Option<&'a BoundaryNode> {
    for node in nodes {
        if node.code == code {
            return Some(node);
        }
        if let Some(found) = find_subtree(&node.children, code) {
            return Some(found);
        }
    }
    None
}

/// Provider backed by JSON files, for CLI usage.
///
/// The hierarchy file holds an ordered `[{ boundaryType,
/// parentBoundaryType }]` array; the relationships file holds the nested
/// boundary forest.
#[derive(Debug, Clone)]
pub struct FileBoundaryProvider {
    hierarchy_path: PathBuf,
    relationships_path: PathBuf,
}

impl FileBoundaryProvider {
    pub fn new(hierarchy_path: impl AsRef<Path>, relationships_path: impl AsRef<Path>) -> Self {
        Self {
            hierarchy_path: hierarchy_path.as_ref().to_path_buf(),
            relationships_path: relationships_path.as_ref().to_path_buf(),
        }
    }

    async fn read(&self, path: &Path) -> BoundaryResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| BoundaryError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl BoundaryProvider for FileBoundaryProvider {
    async fn fetch_hierarchy(&self) -> BoundaryResult<BoundaryHierarchyDefinition> {
        let raw = self.read(&self.hierarchy_path).await?;
        let levels: Vec<HierarchyLevel> = serde_json::from_str(&raw)?;
        Ok(BoundaryHierarchyDefinition::load(levels)?)
    }

    async fn fetch_relationships(&self) -> BoundaryResult<Vec<BoundaryNode>> {
        let raw = self.read(&self.relationships_path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Provider over in-memory structures, for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticBoundaryProvider {
    hierarchy: BoundaryHierarchyDefinition,
    relationships: Vec<BoundaryNode>,
}

impl StaticBoundaryProvider {
    pub fn new(
        hierarchy: BoundaryHierarchyDefinition,
        relationships: Vec<BoundaryNode>,
    ) -> Self {
        Self {
            hierarchy,
            relationships,
        }
    }
}

#[async_trait]
impl BoundaryProvider for StaticBoundaryProvider {
    async fn fetch_hierarchy(&self) -> BoundaryResult<BoundaryHierarchyDefinition> {
        Ok(self.hierarchy.clone())
    }

    async fn fetch_relationships(&self) -> BoundaryResult<Vec<BoundaryNode>> {
        Ok(self.relationships.clone())
    }
}
