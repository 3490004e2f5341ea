//! Dependency graph methods on DocIndex.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::graph::{Direction, GraphTraversal, RelatedFile};
use crate::DocIndex;

impl DocIndex {
    // ========================================
    // Dependency graph
    // ========================================

    fn traversal(&self) -> GraphTraversal<'_> {
        GraphTraversal::new(&self.store, self.traversal_options.clone())
    }

    /// What `path` depends on, up to `max_depth` hops.
    pub fn forward_deps(&self, path: &str, max_depth: usize) -> Result<Vec<RelatedFile>> {
        self.traversal().get_forward_deps(path, max_depth)
    }

    /// What depends on `path`, up to `max_depth` hops.
    pub fn reverse_deps(&self, path: &str, max_depth: usize) -> Result<Vec<RelatedFile>> {
        self.traversal().get_reverse_deps(path, max_depth)
    }

    pub fn related(
        &self,
        path: &str,
        direction: Direction,
        max_depth: usize,
    ) -> Result<Vec<RelatedFile>> {
        self.traversal().find_related(path, direction, max_depth)
    }

    pub fn entry_points(&self) -> Result<Vec<String>> {
        self.traversal().find_entry_points()
    }

    pub fn leaf_nodes(&self) -> Result<Vec<String>> {
        self.traversal().find_leaf_nodes()
    }

    /// Adjacency map of every document.
    pub fn dependency_graph(&self) -> Result<BTreeMap<String, Vec<String>>> {
        self.traversal().get_dependency_graph()
    }
}
