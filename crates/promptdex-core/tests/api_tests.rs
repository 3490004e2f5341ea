//! Integration tests for the DocIndex public interface.
//!
//! These tests drive indexing, search, and graph queries end to end against
//! real files in a temp dir.

use promptdex_core::search::{FanOutSearch, MetadataFilter, MetadataOptions};
use promptdex_core::{
    DependencyEdge, Direction, DocIndex, DocumentRecord, DocumentStore, DocumentType,
    FanOutOptions, FullTextOptions, PromptdexError, StrategyKind,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Create a repository with every document type and a few references.
fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();

    write(
        root,
        "rules/auth.md",
        "---\ntitle: Auth\ntags: [security, login]\nalwaysApply: true\n---\n# Authentication\n\nHandle user login and JWT tokens.\n",
    );
    write(
        root,
        "rules/deploy-safety.md",
        "---\ntitle: Deploy safety\n---\n# Deploy safely\n\nNever deploy on Fridays.\n",
    );
    write(
        root,
        "commands/deploy.md",
        "---\ntitle: Deploy\ntags: [ops]\n---\n# Deploy\n\nSee [safety](../rules/deploy-safety.md) and [auth](../rules/auth.md).\n",
    );
    write(
        root,
        "skills/pdf/SKILL.md",
        "# PDF skill\n\nimport helpers from './helpers.md'\nconst x = require('pdf-lib')\n",
    );
    write(root, "skills/pdf/helpers.md", "# Helpers\n");
    write(root, "tasks/T-1.md", "# Task one\n");
    write(root, "planning/story-map.md", "# Story map\n");

    temp_dir
}

fn open(repo: &TempDir) -> DocIndex {
    DocIndex::open(repo.path()).expect("Failed to open index")
}

fn record(path: &str, doc_type: DocumentType, content: &str) -> DocumentRecord {
    DocumentRecord {
        path: path.to_string(),
        document_type: doc_type,
        frontmatter: serde_json::json!({}),
        content: content.to_string(),
        content_hash: promptdex_core::indexer::compute_file_hash(content.as_bytes()),
        file_size: content.len() as u64,
        modified_at: "2024-01-01T00:00:00Z".to_string(),
        indexed_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn test_open_fails_for_nonexistent_root() {
    let result = DocIndex::open("/nonexistent/path/that/does/not/exist");
    assert!(matches!(result, Err(PromptdexError::Config { .. })));
}

#[tokio::test]
async fn test_incremental_indexing_is_idempotent() {
    let repo = create_test_repo();
    let index = open(&repo);

    let first = index.index_incremental().await.unwrap();
    assert_eq!((first.updated, first.deleted, first.unchanged), (7, 0, 0));
    assert!(first.errors.is_empty());

    let second = index.index_incremental().await.unwrap();
    assert_eq!((second.updated, second.deleted, second.unchanged), (0, 0, 7));

    index.close().unwrap();
}

#[tokio::test]
async fn test_document_types_are_detected() {
    let repo = create_test_repo();
    let index = open(&repo);
    index.index_full().await.unwrap();

    let stats = index.stats().unwrap();
    assert_eq!(stats.documents, 7);
    assert_eq!(stats.by_type["rule"], 2);
    assert_eq!(stats.by_type["command"], 1);
    assert_eq!(stats.by_type["skill"], 2);
    assert_eq!(stats.by_type["task"], 1);
    assert_eq!(stats.by_type["story-map"], 1);
    assert_eq!(stats.fts_rows, 7);
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let repo = create_test_repo();
    {
        let index = open(&repo);
        index.index_full().await.unwrap();
        index.close().unwrap();
    }

    let index = open(&repo);
    let result = index.index_incremental().await.unwrap();
    assert_eq!(result.unchanged, 7);
    assert_eq!(result.updated, 0);
}

#[tokio::test]
async fn test_deleted_file_leaves_no_orphans() {
    let repo = create_test_repo();
    let index = open(&repo);
    index.index_full().await.unwrap();
    assert_eq!(index.store().edges_from("commands/deploy.md").unwrap().len(), 2);

    std::fs::remove_file(repo.path().join("commands/deploy.md")).unwrap();
    let result = index.index_incremental().await.unwrap();
    assert_eq!(result.deleted, 1);

    // Direct query against the database file
    let db_path = index.store().db_path().unwrap().to_path_buf();
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let fts_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM documents_fts WHERE path = 'commands/deploy.md'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let edge_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM dependency_edges WHERE from_path = 'commands/deploy.md'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(fts_rows, 0);
    assert_eq!(edge_rows, 0);

    let stats = index.stats().unwrap();
    assert_eq!(stats.fts_rows, stats.documents);
}

#[test]
fn test_cascade_on_delete() {
    let store = DocumentStore::open_in_memory().unwrap();
    store.upsert_document(&record("A", DocumentType::Other, "a")).unwrap();
    store.upsert_document(&record("B", DocumentType::Other, "b")).unwrap();
    store
        .replace_edges(
            "A",
            &[DependencyEdge {
                from_path: "A".to_string(),
                to_path: "B".to_string(),
                import_kind: "import".to_string(),
                line_number: 1,
                raw_text: "import b from './B'".to_string(),
            }],
        )
        .unwrap();
    assert_eq!(store.edge_count().unwrap(), 1);

    assert!(store.delete_document("A").unwrap());
    assert!(store.edges_from("A").unwrap().is_empty());
    assert_eq!(store.edge_count().unwrap(), 0);
}

#[tokio::test]
async fn test_fulltext_snippet_and_type_filter() {
    let repo = create_test_repo();
    let index = open(&repo);
    index.index_full().await.unwrap();

    let hits = index
        .search_fulltext("authentication", &FullTextOptions::default())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "rules/auth.md");
    assert!(hits[0].snippet.as_deref().unwrap().contains("Authentication"));

    let options = FullTextOptions {
        document_type: Some(DocumentType::Command),
        ..Default::default()
    };
    let hits = index.search_fulltext("deploy", &options).unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.document_type == DocumentType::Command));
}

#[tokio::test]
async fn test_metadata_injection_is_rejected() {
    let repo = create_test_repo();
    let index = open(&repo);
    index.index_full().await.unwrap();

    let filter = MetadataFilter::new().with("frontmatter.x'); --", "1");
    let err = index
        .search_metadata(&filter, &MetadataOptions::default())
        .unwrap_err();
    match err {
        PromptdexError::Validation { field, .. } => assert_eq!(field, "frontmatter.x'); --"),
        other => panic!("expected validation error, got {other}"),
    }

    // The store is intact
    assert_eq!(index.stats().unwrap().documents, 7);
}

#[tokio::test]
async fn test_metadata_filters() {
    let repo = create_test_repo();
    let index = open(&repo);
    index.index_full().await.unwrap();

    let filter = MetadataFilter::new()
        .with("type", "rule")
        .with("frontmatter.alwaysApply", true);
    let hits = index
        .search_metadata(&filter, &MetadataOptions::default())
        .unwrap();
    let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(paths, vec!["rules/auth.md"]);

    let filter = MetadataFilter::new().with("frontmatter.tags", "ops");
    let hits = index
        .search_metadata(&filter, &MetadataOptions::default())
        .unwrap();
    assert_eq!(hits[0].path, "commands/deploy.md");
}

#[tokio::test]
async fn test_fanout_boosts_overlap() {
    let repo = create_test_repo();
    let index = open(&repo);
    index.index_full().await.unwrap();

    // "security" is a frontmatter value of auth.md: found by both strategies
    let hits = index.search("security", &FanOutOptions::default()).await;
    assert_eq!(hits[0].result.path, "rules/auth.md");
    assert_eq!(hits[0].matched_strategies.len(), 2);

    let single = FanOutOptions {
        strategies: vec![StrategyKind::FullText],
        ..Default::default()
    };
    let single_hits = index.search("security", &single).await;
    assert_eq!(single_hits[0].result.path, "rules/auth.md");
    assert!(hits[0].relevance_score > single_hits[0].relevance_score);
}

#[tokio::test]
async fn test_fanout_empty_query() {
    let store = Arc::new(DocumentStore::open_in_memory().unwrap());
    let search = FanOutSearch::with_store(store);
    assert!(search.search("   ", &FanOutOptions::default()).await.is_empty());
}

#[tokio::test]
async fn test_dependency_graph_queries() {
    let repo = create_test_repo();
    let index = open(&repo);
    index.index_full().await.unwrap();

    let forward = index.forward_deps("commands/deploy.md", 3).unwrap();
    let paths: Vec<&str> = forward.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["rules/auth.md", "rules/deploy-safety.md"]);

    let reverse = index.reverse_deps("rules/auth.md", 3).unwrap();
    assert_eq!(reverse.len(), 1);
    assert_eq!(reverse[0].direction, Direction::Reverse);

    // SKILL.md imports helpers.md; require('pdf-lib') is external
    let skill = index.forward_deps("skills/pdf/SKILL.md", 3).unwrap();
    assert_eq!(skill.len(), 1);
    assert_eq!(skill[0].path, "skills/pdf/helpers.md");

    let entry_points = index.entry_points().unwrap();
    assert!(entry_points.contains(&"commands/deploy.md".to_string()));
    assert!(!entry_points.contains(&"rules/auth.md".to_string()));

    let leaves = index.leaf_nodes().unwrap();
    assert!(leaves.contains(&"rules/auth.md".to_string()));
    assert!(leaves.contains(&"skills/pdf/helpers.md".to_string()));
    assert!(!leaves.contains(&"skills/pdf/SKILL.md".to_string()));

    let graph = index.dependency_graph().unwrap();
    assert_eq!(graph.len(), 7);
    assert_eq!(
        graph["commands/deploy.md"],
        vec!["rules/auth.md", "rules/deploy-safety.md"]
    );

    let stats = index.stats().unwrap();
    assert_eq!(stats.external_edges, 1);
}

#[tokio::test]
async fn test_cycle_traversal_through_index() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "A.md", "[b](./B.md)");
    write(root, "B.md", "[c](./C.md)");
    write(root, "C.md", "[a](./A.md)");

    let index = DocIndex::open(root).unwrap();
    index.index_full().await.unwrap();

    let forward = index.forward_deps("A.md", 5).unwrap();
    let pairs: Vec<(&str, usize)> = forward.iter().map(|f| (f.path.as_str(), f.depth)).collect();
    assert_eq!(pairs, vec![("B.md", 1), ("C.md", 2)]);

    let related = index.related("A.md", Direction::Both, 1).unwrap();
    assert_eq!(related.len(), 2);
    assert!(index.entry_points().unwrap().is_empty());
}

#[tokio::test]
async fn test_index_dependencies_recomputes_edges() {
    let repo = create_test_repo();
    let index = DocIndex::builder(repo.path())
        .in_memory(true)
        .index_dependencies(false)
        .build()
        .unwrap();
    index.index_full().await.unwrap();
    assert_eq!(index.stats().unwrap().edges, 0);

    let result = index.index_dependencies().await.unwrap();
    assert_eq!(result.files, 7);
    assert_eq!(result.edges, 4);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_builder_options() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("new-repo");

    let index = DocIndex::builder(&root)
        .auto_create_dirs(true)
        .extensions(["txt"])
        .strategy_timeout(std::time::Duration::from_millis(250))
        .build()
        .unwrap();
    assert!(root.is_dir());
    assert_eq!(
        index.search_options().timeout,
        std::time::Duration::from_millis(250)
    );

    write(&root, "notes.txt", "plain text notes");
    write(&root, "ignored.md", "# Not indexed");
    let result = index.index_full().await.unwrap();
    assert_eq!(result.indexed, 1);
    assert!(index.store().get_document("notes.txt").unwrap().is_some());
}

#[tokio::test]
async fn test_same_directory_links_resolve() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "commands/deploy.md", "# Deploy\n\nRun [login](login.md) first.\n");
    write(root, "commands/login.md", "# Login\n");
    write(root, "login.md", "# Unrelated root login\n");

    let index = DocIndex::open(root).unwrap();
    index.index_full().await.unwrap();

    let forward = index.forward_deps("commands/deploy.md", 1).unwrap();
    let paths: Vec<&str> = forward.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["commands/login.md"]);
    assert!(index.reverse_deps("login.md", 1).unwrap().is_empty());
}

#[tokio::test]
async fn test_incremental_links_to_file_created_later() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "a.md", "See [b](./b.md)\n");

    let index = DocIndex::open(root).unwrap();
    index.index_incremental().await.unwrap();
    assert!(index.reverse_deps("b.md", 1).unwrap().is_empty());
    assert_eq!(index.leaf_nodes().unwrap(), vec!["a.md"]);

    write(root, "b.md", "# B\n");
    let result = index.index_incremental().await.unwrap();
    assert_eq!((result.updated, result.deleted, result.unchanged), (1, 0, 1));

    let reverse = index.reverse_deps("b.md", 1).unwrap();
    assert_eq!(reverse.len(), 1);
    assert_eq!(reverse[0].path, "a.md");
    assert_eq!(index.entry_points().unwrap(), vec!["a.md"]);
    assert_eq!(index.leaf_nodes().unwrap(), vec!["b.md"]);
    assert_eq!(index.stats().unwrap().external_edges, 0);
}

#[tokio::test]
async fn test_fanout_type_filter_is_not_starved() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for i in 0..6 {
        write(
            root,
            &format!("rules/deploy-{}.md", i),
            "# Deploy\n\ndeploy deploy deploy: deploy checklists for every deploy.\n",
        );
    }
    write(root, "commands/ship.md", "# Ship\n\nShip the release, then deploy.\n");

    let index = DocIndex::open(root).unwrap();
    index.index_full().await.unwrap();

    let options = FanOutOptions {
        limit: 2,
        document_type: Some(DocumentType::Command),
        ..Default::default()
    };
    let hits = index.search("deploy", &options).await;
    let paths: Vec<&str> = hits.iter().map(|h| h.result.path.as_str()).collect();
    assert_eq!(paths, vec!["commands/ship.md"]);
}
