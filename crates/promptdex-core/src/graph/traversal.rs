//! Reachability over dependency edges.

use crate::config::GraphConfig;
use crate::error::Result;
use crate::store::DocumentStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::debug;

/// Which way to follow edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// From a file to what it references.
    Forward,
    /// From a file to what references it.
    Reverse,
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
            Direction::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "deps" => Some(Direction::Forward),
            "reverse" | "dependents" => Some(Direction::Reverse),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file reached by traversal, at the minimum depth it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFile {
    pub path: String,
    pub depth: usize,
    /// [`Direction::Forward`] or [`Direction::Reverse`], never `Both`.
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalOptions {
    /// Follow and report edges whose target is not an indexed document.
    pub include_external: bool,
}

/// In-memory snapshot of the edge table.
#[derive(Debug, Default)]
struct EdgeSnapshot {
    documents: BTreeSet<String>,
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl EdgeSnapshot {
    fn load(store: &DocumentStore, include_external: bool) -> Result<Self> {
        let (documents, edges) = store.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT path FROM documents")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut documents = BTreeSet::new();
            for row in rows {
                documents.insert(row?);
            }

            let mut stmt =
                conn.prepare("SELECT DISTINCT from_path, to_path FROM dependency_edges")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut edges = Vec::new();
            for row in rows {
                edges.push(row?);
            }
            Ok((documents, edges))
        })?;

        let mut snapshot = EdgeSnapshot {
            documents,
            ..Default::default()
        };
        for (from, to) in edges {
            if from == to || (!include_external && !snapshot.documents.contains(&to)) {
                continue;
            }
            snapshot
                .forward
                .entry(from.clone())
                .or_default()
                .insert(to.clone());
            snapshot.reverse.entry(to).or_default().insert(from);
        }
        Ok(snapshot)
    }

    fn adjacency(&self, direction: Direction) -> &BTreeMap<String, BTreeSet<String>> {
        match direction {
            Direction::Reverse => &self.reverse,
            _ => &self.forward,
        }
    }

    /// Breadth-first walk recording each node once at its minimum depth.
    fn walk(&self, start: &str, direction: Direction, max_depth: usize) -> Vec<RelatedFile> {
        let adjacency = self.adjacency(direction);
        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(start, 0)]);
        let mut found = Vec::new();

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(neighbors) = adjacency.get(node) else {
                continue;
            };
            for next in neighbors {
                if visited.insert(next.as_str()) {
                    found.push(RelatedFile {
                        path: next.clone(),
                        depth: depth + 1,
                        direction,
                    });
                    queue.push_back((next.as_str(), depth + 1));
                }
            }
        }

        found.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));
        found
    }
}

/// Graph queries against one store.
pub struct GraphTraversal<'a> {
    store: &'a DocumentStore,
    options: TraversalOptions,
}

impl<'a> GraphTraversal<'a> {
    pub fn new(store: &'a DocumentStore, options: TraversalOptions) -> Self {
        Self { store, options }
    }

    fn snapshot(&self) -> Result<EdgeSnapshot> {
        EdgeSnapshot::load(self.store, self.options.include_external)
    }

    /// Files `path` references, directly or transitively, up to `max_depth` hops.
    pub fn get_forward_deps(&self, path: &str, max_depth: usize) -> Result<Vec<RelatedFile>> {
        self.traverse(path, Direction::Forward, max_depth)
    }

    /// Files that reference `path`, directly or transitively.
    pub fn get_reverse_deps(&self, path: &str, max_depth: usize) -> Result<Vec<RelatedFile>> {
        self.traverse(path, Direction::Reverse, max_depth)
    }

    /// Forward and/or reverse dependencies, each tagged with its direction.
    ///
    /// With [`Direction::Both`] forward results come first; a file may appear
    /// in both halves with different depths.
    pub fn find_related(
        &self,
        path: &str,
        direction: Direction,
        max_depth: usize,
    ) -> Result<Vec<RelatedFile>> {
        match direction {
            Direction::Both => {
                let snapshot = self.snapshot()?;
                let start = normalize_path(path);
                let max_depth = clamp_depth(max_depth);
                let mut related = snapshot.walk(&start, Direction::Forward, max_depth);
                related.extend(snapshot.walk(&start, Direction::Reverse, max_depth));
                Ok(related)
            }
            single => self.traverse(path, single, max_depth),
        }
    }

    fn traverse(&self, path: &str, direction: Direction, max_depth: usize) -> Result<Vec<RelatedFile>> {
        let max_depth = clamp_depth(max_depth);
        if max_depth == 0 {
            return Ok(Vec::new());
        }
        let start = normalize_path(path);
        let related = self.snapshot()?.walk(&start, direction, max_depth);
        debug!(
            "{} traversal from {} found {} files",
            direction,
            start,
            related.len()
        );
        Ok(related)
    }

    /// Documents nothing references, sorted.
    pub fn find_entry_points(&self) -> Result<Vec<String>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .documents
            .iter()
            .filter(|path| !snapshot.reverse.contains_key(*path))
            .cloned()
            .collect())
    }

    /// Documents that reference nothing, sorted.
    pub fn find_leaf_nodes(&self) -> Result<Vec<String>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .documents
            .iter()
            .filter(|path| !snapshot.forward.contains_key(*path))
            .cloned()
            .collect())
    }

    /// Every document mapped to its sorted outgoing neighbors.
    pub fn get_dependency_graph(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .documents
            .iter()
            .map(|path| {
                let neighbors = snapshot
                    .forward
                    .get(path)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default();
                (path.clone(), neighbors)
            })
            .collect())
    }
}

fn clamp_depth(max_depth: usize) -> usize {
    max_depth.min(GraphConfig::MAX_DEPTH_CAP)
}

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}
