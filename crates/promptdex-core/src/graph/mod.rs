//! Dependency graph queries.
//!
//! Traversals snapshot the edge table and walk it breadth-first with a
//! visited set, so cycles terminate and every file is reported once at its
//! minimum depth.

mod traversal;

pub use traversal::{Direction, GraphTraversal, RelatedFile, TraversalOptions};
