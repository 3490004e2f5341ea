//! Dependency extraction and edge materialization.
//!
//! References are pulled out of document text, resolved against the repo
//! root, and written to the store as the complete outgoing edge set of the
//! referencing document.

mod extractor;
mod resolver;

pub use extractor::{extract_dependencies, ExtractedDependency, ImportKind};
pub use resolver::{normalize_reference, resolve_import_path, resolve_link_path};

use crate::store::{DependencyEdge, DocumentStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Options for dependency indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyOptions {
    /// Store references that do not resolve to a file. Path-like references
    /// are keyed by their normalized repo-relative path, package specifiers
    /// by the raw text. They appear as external edges.
    pub retain_unresolved: bool,
}

impl Default for DependencyOptions {
    fn default() -> Self {
        Self {
            retain_unresolved: true,
        }
    }
}

/// Summary of a dependency pass over the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyIndexResult {
    pub files: usize,
    pub edges: usize,
    pub errors: Vec<String>,
}

/// Compute the edges leaving `file_path` without touching the store.
pub fn build_edges(
    file_path: &str,
    content: &str,
    root_dir: &Path,
    options: &DependencyOptions,
) -> Vec<DependencyEdge> {
    extract_dependencies(content)
        .into_iter()
        .filter_map(|dep| {
            let resolved = match dep.import_kind {
                ImportKind::Link => resolve_link_path(&dep.source, file_path, root_dir),
                _ => resolve_import_path(&dep.source, file_path, root_dir),
            };
            let to_path = match resolved {
                Some(resolved) => resolved,
                None if options.retain_unresolved => {
                    normalize_reference(&dep.source, dep.import_kind, file_path)
                        .unwrap_or_else(|| dep.source.clone())
                }
                None => return None,
            };
            if to_path == file_path {
                return None;
            }
            Some(DependencyEdge {
                from_path: file_path.to_string(),
                to_path,
                import_kind: dep.import_kind.as_str().to_string(),
                line_number: dep.line,
                raw_text: dep.raw_text,
            })
        })
        .collect()
}

/// Replace all outgoing edges of `file_path` with those found in `content`.
///
/// Returns the number of edges stored.
pub fn index_file_dependencies(
    store: &DocumentStore,
    file_path: &str,
    content: &str,
    root_dir: &Path,
    options: &DependencyOptions,
) -> Result<usize> {
    let edges = build_edges(file_path, content, root_dir, options);
    store.replace_edges(file_path, &edges)
}

/// Recompute edges for every indexed document.
///
/// Each document is re-read from disk so line numbers refer to the file as
/// written; the stored body is used when the file can no longer be read.
/// Per-file failures are collected and do not stop the batch.
pub fn index_all_dependencies(
    store: &DocumentStore,
    root_dir: &Path,
    options: &DependencyOptions,
) -> Result<DependencyIndexResult> {
    let paths = store.all_paths()?;
    let result = index_dependencies_for(store, &paths, root_dir, options);

    info!(
        "Indexed dependencies for {} files ({} edges, {} errors)",
        result.files,
        result.edges,
        result.errors.len()
    );
    Ok(result)
}

/// Recompute edges for documents with a reference that points at no indexed
/// document.
///
/// Run after paths appear or disappear: an unchanged referrer may now resolve
/// to a new file.
pub fn refresh_dangling_dependencies(
    store: &DocumentStore,
    root_dir: &Path,
    options: &DependencyOptions,
) -> Result<DependencyIndexResult> {
    let referrers = store.dangling_referrers()?;
    if referrers.is_empty() {
        return Ok(DependencyIndexResult::default());
    }
    debug!("Re-resolving references of {} documents", referrers.len());
    Ok(index_dependencies_for(store, &referrers, root_dir, options))
}

fn index_dependencies_for(
    store: &DocumentStore,
    paths: &[String],
    root_dir: &Path,
    options: &DependencyOptions,
) -> DependencyIndexResult {
    let mut result = DependencyIndexResult::default();

    for path in paths {
        let content = match std::fs::read_to_string(root_dir.join(path)) {
            Ok(content) => content,
            Err(e) => {
                debug!("Falling back to stored content for {}: {}", path, e);
                match store.get_document(path) {
                    Ok(Some(doc)) => doc.content,
                    Ok(None) => continue,
                    Err(e) => {
                        result.errors.push(format!("{}: {}", path, e));
                        continue;
                    }
                }
            }
        };

        match index_file_dependencies(store, path, &content, root_dir, options) {
            Ok(stored) => {
                result.files += 1;
                result.edges += stored;
            }
            Err(e) => {
                warn!("Failed to index dependencies for {}: {}", path, e);
                result.errors.push(format!("{}: {}", path, e));
            }
        }
    }

    result
}
