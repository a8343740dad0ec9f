//! Derived-tree caching.
//!
//! The cache is an explicit object handed to the engine's entry points —
//! there is no ambient global store. Keys are SHA-256 content hashes of the
//! contributing inputs, so a re-upload or a hierarchy change naturally
//! misses; switching hierarchy types additionally clears the cache
//! wholesale.

pub mod hash;

use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::model::BoundaryHierarchyDefinition;
use crate::tree::HierarchicalTree;

pub use hash::compute_hash;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while keying the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to hash cache key: {0}")]
    Key(#[from] serde_json::Error),
}

/// Helper for generating derived-tree cache keys.
pub struct TreeCacheKey;

impl TreeCacheKey {
    /// Key for the aggregated tree over a dataset combination.
    pub fn aggregated(hierarchy_hash: &str, datasets_hash: &str) -> String {
        format!("tree:{}:{}:aggregated", hierarchy_hash, datasets_hash)
    }

    /// Key for a selection-filtered view.
    pub fn filtered(hierarchy_hash: &str, datasets_hash: &str, selection_hash: &str) -> String {
        format!(
            "tree:{}:{}:filtered:{}",
            hierarchy_hash, datasets_hash, selection_hash
        )
    }
}

/// Session-scoped cache of derived trees, FIFO-bounded.
#[derive(Debug, Default)]
pub struct EngineCache {
    max_entries: usize,
    entries: HashMap<String, HierarchicalTree>,
    order: VecDeque<String>,
}

impl EngineCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&HierarchicalTree> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, tree: HierarchicalTree) {
        if self.entries.insert(key.clone(), tree).is_none() {
            self.order.push_back(key);
        }
        while self.max_entries > 0 && self.order.len() > self.max_entries {
            if let Some(evicted) = self.order.pop_front() {
                tracing::debug!(key = %evicted, "evicting cached tree");
                self.entries.remove(&evicted);
            }
        }
    }

    /// Drop everything; called on hierarchy-type change.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Content hash of the active dataset combination.
pub fn datasets_hash(ids: &[Uuid]) -> CacheResult<String> {
    let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    Ok(compute_hash(&ids)?)
}

/// Content hash of the hierarchy definition.
pub fn hierarchy_hash(hierarchy: &BoundaryHierarchyDefinition) -> CacheResult<String> {
    Ok(compute_hash(hierarchy)?)
}
