//! The session state container.
//!
//! A [`Session`] owns everything the engine needs between user actions: the
//! cached hierarchy and boundary forest, the uploaded record sets, the
//! active schema, rules and assumptions, the current boundary selections
//! and the derived-tree cache. Every entry point recomputes derived
//! structures from scratch and replaces them wholesale — nothing is patched
//! in place.
//!
//! Sessions are single-writer. There is no cancellation: when a recompute
//! is superseded before its result lands, the later result simply
//! overwrites it, last write wins.

use std::collections::BTreeSet;

use tracing::info;

use crate::boundary::{BoundaryError, BoundaryProvider};
use crate::cache::{self, CacheError, EngineCache, TreeCacheKey};
use crate::config::{Settings, SettingsError};
use crate::formula::{FormulaError, HypothesisAssumption, Rule, RuleSet};
use crate::ingest::IngestError;
use crate::model::{BoundaryHierarchyDefinition, BoundaryNode, Cell, FlatRecordSet};
use crate::schema::{validate_record_set, Schema, SchemaError, ValidationReport};
use crate::template::{self, Sheet, TemplateError, TemplateOptions};
use crate::tree::{
    aggregate, apply_selection, build, compute_options, filter_tree, HierarchicalTree,
    LevelOptions, SelectionState,
};

/// Result type for engine entry points.
pub type EngineResult<T> = Result<T, EngineError>;

/// Umbrella error for the engine pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Boundary service error: {0}")]
    Boundary(#[from] BoundaryError),

    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("No active dataset named '{0}'")]
    UnknownDataset(String),
}

/// Session state for one planning user.
pub struct Session {
    settings: Settings,
    hierarchy: BoundaryHierarchyDefinition,
    boundary_forest: Vec<BoundaryNode>,
    schema: Schema,
    datasets: Vec<FlatRecordSet>,
    selections: SelectionState,
    rules: RuleSet,
    assumptions: Vec<HypothesisAssumption>,
    cache: EngineCache,
}

impl Session {
    /// Open a session: fetch the hierarchy definition and boundary
    /// relationships once and cache them for the session's lifetime.
    pub async fn connect(
        provider: &dyn BoundaryProvider,
        schema: Schema,
        settings: Settings,
    ) -> EngineResult<Self> {
        let hierarchy = provider.fetch_hierarchy().await?;
        let boundary_forest = provider.fetch_relationships().await?;
        info!(
            levels = hierarchy.depth(),
            boundaries = boundary_forest.iter().map(BoundaryNode::size).sum::<usize>(),
            "session connected"
        );

        let cache = EngineCache::new(settings.cache.max_entries);
        Ok(Self {
            settings,
            hierarchy,
            boundary_forest,
            schema,
            datasets: Vec::new(),
            selections: SelectionState::new(),
            rules: RuleSet::load(Vec::new())?,
            assumptions: Vec::new(),
            cache,
        })
    }

    pub fn hierarchy(&self) -> &BoundaryHierarchyDefinition {
        &self.hierarchy
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Root nodes of the official boundary forest.
    pub fn boundary_roots(&self) -> Vec<&BoundaryNode> {
        let flagged: Vec<&BoundaryNode> =
            self.boundary_forest.iter().filter(|n| n.is_root).collect();
        if flagged.is_empty() {
            self.boundary_forest.iter().collect()
        } else {
            flagged
        }
    }

    /// Validate and register an upload.
    ///
    /// A previous upload under the same name is marked inactive, never
    /// deleted — re-uploads replace, and the audit history stays intact.
    /// The new upload is retained even when flagged invalid, so the user
    /// can download it back with its error annotations.
    pub fn upload(&mut self, set: FlatRecordSet) -> EngineResult<ValidationReport> {
        let report = validate_record_set(&set, &self.schema)?;

        for existing in &mut self.datasets {
            if existing.active && existing.name == set.name {
                info!(dataset = %set.name, superseded = %existing.id, "replacing dataset");
                existing.active = false;
            }
        }
        self.datasets.push(set);

        Ok(report)
    }

    /// The currently active record sets, in upload order.
    pub fn active_datasets(&self) -> Vec<&FlatRecordSet> {
        self.datasets.iter().filter(|d| d.active).collect()
    }

    /// An active dataset by name.
    pub fn dataset(&self, name: &str) -> Option<&FlatRecordSet> {
        self.datasets.iter().find(|d| d.active && d.name == name)
    }

    /// Rebuild the reconciled tree from the active datasets.
    pub fn reconciled_tree(&self) -> HierarchicalTree {
        build(&self.hierarchy, &self.active_datasets())
    }

    /// The aggregated tree, cached by content hash of its inputs.
    pub fn aggregated_tree(&mut self) -> EngineResult<HierarchicalTree> {
        let key = self.aggregated_key()?;
        if let Some(tree) = self.cache.get(&key) {
            return Ok(tree.clone());
        }

        let tree = aggregate(&self.reconciled_tree());
        self.cache.insert(key, tree.clone());
        Ok(tree)
    }

    /// The aggregated tree narrowed to the current boundary selections.
    pub fn filtered_tree(&mut self) -> EngineResult<HierarchicalTree> {
        let selection_hash = cache::compute_hash(&self.selections).map_err(CacheError::Key)?;
        let aggregated_key = self.aggregated_key()?;
        let key = format!("{}:{}", aggregated_key, selection_hash);
        if let Some(tree) = self.cache.get(&key) {
            return Ok(tree.clone());
        }

        let aggregated = self.aggregated_tree()?;
        let tree = filter_tree(&aggregated, &self.hierarchy, &self.selections);
        self.cache.insert(key, tree.clone());
        Ok(tree)
    }

    /// Per-level dropdown options under the current selections.
    pub fn options(&self) -> Vec<LevelOptions> {
        compute_options(&self.reconciled_tree(), &self.hierarchy, &self.selections)
    }

    /// Change the selection at one level, pruning stale descendants.
    pub fn set_selection(&mut self, boundary_type: &str, values: BTreeSet<String>) {
        let tree = self.reconciled_tree();
        self.selections = apply_selection(boundary_type, values, &tree, &self.selections);
    }

    pub fn selections(&self) -> &SelectionState {
        &self.selections
    }

    /// Replace the rule set; cyclic or duplicated rules are rejected whole.
    pub fn set_rules(&mut self, rules: Vec<Rule>) -> EngineResult<()> {
        self.rules = RuleSet::load(rules)?;
        Ok(())
    }

    pub fn set_assumptions(&mut self, assumptions: Vec<HypothesisAssumption>) {
        self.assumptions = assumptions;
    }

    /// Evaluate a derived resource column over an active dataset, one
    /// rounded cell per row.
    pub fn derived_column(&self, dataset: &str, resource: &str) -> EngineResult<Vec<Cell>> {
        let set = self
            .dataset(dataset)
            .ok_or_else(|| EngineError::UnknownDataset(dataset.to_string()))?;

        let mut cells = Vec::with_capacity(set.rows.len());
        for row_idx in 0..set.rows.len() {
            let row = set.row_map(row_idx);
            cells.push(self.rules.evaluate_cell(
                resource,
                &row,
                &set.header_row,
                &self.assumptions,
            )?);
        }
        Ok(cells)
    }

    /// Generate collection template sheets from the official boundary tree.
    pub fn generate_template(&self, options: &TemplateOptions) -> EngineResult<Vec<Sheet>> {
        let roots: Vec<BoundaryNode> = self.boundary_roots().into_iter().cloned().collect();
        Ok(template::generate(
            &self.hierarchy,
            &roots,
            Some(&self.schema),
            &self.settings,
            options,
        )?)
    }

    /// Switch to a different hierarchy type.
    ///
    /// Every derived structure keyed off the old hierarchy is now
    /// meaningless: the cache is cleared wholesale and selections reset.
    pub fn change_hierarchy(
        &mut self,
        hierarchy: BoundaryHierarchyDefinition,
        boundary_forest: Vec<BoundaryNode>,
    ) {
        info!(levels = hierarchy.depth(), "switching hierarchy");
        self.hierarchy = hierarchy;
        self.boundary_forest = boundary_forest;
        self.selections = SelectionState::new();
        self.cache.invalidate_all();
    }

    fn aggregated_key(&self) -> Result<String, CacheError> {
        let hierarchy_hash = cache::hierarchy_hash(&self.hierarchy)?;
        let ids: Vec<uuid::Uuid> = self.active_datasets().iter().map(|d| d.id).collect();
        let datasets_hash = cache::datasets_hash(&ids)?;
        Ok(TreeCacheKey::aggregated(&hierarchy_hash, &datasets_hash))
    }
}
