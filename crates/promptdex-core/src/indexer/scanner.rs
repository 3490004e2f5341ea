//! Directory walking and document upserts.

use super::doc_type::detect_document_type;
use super::frontmatter::parse_frontmatter;
use super::hashing::{compute_file_hash, hash_file};
use crate::config::IndexerConfig;
use crate::deps::{index_file_dependencies, refresh_dangling_dependencies, DependencyOptions};
use crate::error::{PromptdexError, Result};
use crate::store::{DocumentRecord, DocumentStore};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Options for directory indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    /// Extension allow-list, without dots. Matched case-insensitively.
    pub extensions: Vec<String>,
    /// Recompute outgoing edges for every upserted document.
    pub index_dependencies: bool,
    pub dependency_options: DependencyOptions,
    /// Files larger than this are skipped with an error.
    pub max_file_size: u64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            extensions: IndexerConfig::DEFAULT_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            index_dependencies: true,
            dependency_options: DependencyOptions::default(),
            max_file_size: IndexerConfig::MAX_FILE_SIZE,
        }
    }
}

/// Outcome of a full indexing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResult {
    pub indexed: usize,
    pub errors: Vec<String>,
}

/// Outcome of an incremental indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalResult {
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub errors: Vec<String>,
}

/// A file found by the walker.
#[derive(Debug, Clone)]
struct DiscoveredFile {
    /// Repo-relative, `/`-separated.
    rel_path: String,
    abs_path: PathBuf,
}

/// Indexes one root directory into a store.
pub struct Indexer<'a> {
    store: &'a DocumentStore,
    root_dir: PathBuf,
    options: IndexOptions,
    extensions: HashSet<String>,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a DocumentStore, root_dir: impl Into<PathBuf>, options: IndexOptions) -> Self {
        let extensions = options
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            store,
            root_dir: root_dir.into(),
            options,
            extensions,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Index every matching file, upserting each one.
    ///
    /// Unchanged files are still visited; the store skips the write. Stale
    /// rows are left alone, see [`Indexer::index_incremental`].
    pub fn index_directory(&self) -> Result<IndexResult> {
        let start = Instant::now();
        let (files, mut errors) = self.discover_files()?;
        let mut indexed = 0;

        for file in &files {
            match self.index_file(file) {
                Ok(_) => indexed += 1,
                Err(e) => {
                    warn!("Failed to index {}: {}", file.rel_path, e);
                    errors.push(format!("{}: {}", file.rel_path, e));
                }
            }
        }

        info!(
            "Indexed {} files in {:?} ({} errors)",
            indexed,
            start.elapsed(),
            errors.len()
        );
        Ok(IndexResult { indexed, errors })
    }

    /// Reconcile the store with the directory.
    ///
    /// Files whose hash matches the stored one are skipped. Stored paths that
    /// are no longer on disk are deleted along with their outgoing edges. A
    /// file that exists but cannot be read counts as present, so a transient
    /// read failure never deletes its row.
    ///
    /// When paths were added or removed, documents whose references point at
    /// no indexed document are re-resolved, so an unchanged referrer picks up
    /// a newly created target.
    pub fn index_incremental(&self) -> Result<IncrementalResult> {
        let start = Instant::now();
        let stored_hashes = self.store.document_hashes()?;
        let (files, errors) = self.discover_files()?;

        let mut result = IncrementalResult {
            errors,
            ..Default::default()
        };
        let mut seen: HashSet<&str> = HashSet::with_capacity(files.len());
        let mut added = 0;

        for file in &files {
            seen.insert(file.rel_path.as_str());

            if let Some(stored) = stored_hashes.get(&file.rel_path) {
                match hash_file(&file.abs_path) {
                    Ok(hash) if &hash == stored => {
                        result.unchanged += 1;
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to hash {}: {}", file.rel_path, e);
                        result.errors.push(format!("{}: {}", file.rel_path, e));
                        continue;
                    }
                }
            }

            match self.index_file(file) {
                Ok(_) => {
                    result.updated += 1;
                    if !stored_hashes.contains_key(&file.rel_path) {
                        added += 1;
                    }
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", file.rel_path, e);
                    result.errors.push(format!("{}: {}", file.rel_path, e));
                }
            }
        }

        let mut stale: Vec<&String> = stored_hashes
            .keys()
            .filter(|path| !seen.contains(path.as_str()))
            .collect();
        stale.sort();
        for path in stale {
            match self.store.delete_document(path) {
                Ok(true) => {
                    debug!("Removed {} from index", path);
                    result.deleted += 1;
                }
                Ok(false) => {}
                Err(e) => result.errors.push(format!("{}: {}", path, e)),
            }
        }

        if self.options.index_dependencies && (added > 0 || result.deleted > 0) {
            match refresh_dangling_dependencies(
                self.store,
                &self.root_dir,
                &self.options.dependency_options,
            ) {
                Ok(refresh) => result.errors.extend(refresh.errors),
                Err(e) => {
                    warn!("Failed to refresh dangling references: {}", e);
                    result.errors.push(format!("dependencies: {}", e));
                }
            }
        }

        info!(
            "Incremental index: {} updated, {} deleted, {} unchanged in {:?}",
            result.updated,
            result.deleted,
            result.unchanged,
            start.elapsed()
        );
        Ok(result)
    }

    /// Read, parse, and upsert one file. Returns whether the row changed.
    fn index_file(&self, file: &DiscoveredFile) -> Result<bool> {
        let metadata = std::fs::metadata(&file.abs_path)
            .map_err(|e| PromptdexError::io_with_path(e, &file.abs_path))?;

        if metadata.len() > self.options.max_file_size {
            return Err(PromptdexError::Extraction {
                path: file.rel_path.clone(),
                message: format!(
                    "file size {} exceeds limit {}",
                    metadata.len(),
                    self.options.max_file_size
                ),
            });
        }

        let bytes = std::fs::read(&file.abs_path)
            .map_err(|e| PromptdexError::io_with_path(e, &file.abs_path))?;
        let content_hash = compute_file_hash(&bytes);
        let raw = String::from_utf8(bytes).map_err(|_| PromptdexError::Extraction {
            path: file.rel_path.clone(),
            message: "file is not valid UTF-8".to_string(),
        })?;

        let parsed = parse_frontmatter(&raw);
        let record = DocumentRecord {
            path: file.rel_path.clone(),
            document_type: detect_document_type(&file.rel_path),
            frontmatter: parsed.frontmatter,
            content: parsed.body,
            content_hash,
            file_size: metadata.len(),
            modified_at: metadata
                .modified()
                .map(format_timestamp)
                .unwrap_or_else(|_| now_timestamp()),
            indexed_at: now_timestamp(),
        };

        let changed = self.store.upsert_document(&record)?;
        if self.options.index_dependencies {
            index_file_dependencies(
                self.store,
                &file.rel_path,
                &raw,
                &self.root_dir,
                &self.options.dependency_options,
            )?;
        }

        debug!(
            "Indexed {} as {} (changed: {})",
            file.rel_path, record.document_type, changed
        );
        Ok(changed)
    }

    /// Walk the root, returning matching files sorted by path plus any walk errors.
    fn discover_files(&self) -> Result<(Vec<DiscoveredFile>, Vec<String>)> {
        if !self.root_dir.is_dir() {
            return Err(PromptdexError::Io {
                message: "Root is not a directory".to_string(),
                path: Some(self.root_dir.clone()),
                source: None,
            });
        }

        let mut files = Vec::new();
        let mut errors = Vec::new();

        let walker = WalkDir::new(&self.root_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.depth() > 0
                    && entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| IndexerConfig::IGNORED_DIRS.contains(&name)))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(format!("walk error: {}", e));
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.matches_extension(entry.path()) {
                continue;
            }
            match relative_path(&self.root_dir, entry.path()) {
                Some(rel_path) => files.push(DiscoveredFile {
                    rel_path,
                    abs_path: entry.path().to_path_buf(),
                }),
                None => errors.push(format!(
                    "{}: path is not valid UTF-8",
                    entry.path().display()
                )),
            }
        }

        debug!("Discovered {} files under {}", files.len(), self.root_dir.display());
        Ok((files, errors))
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
