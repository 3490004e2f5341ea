//! Reference resolution to repo-relative paths.

use super::extractor::ImportKind;
use crate::config::IndexerConfig;
use std::path::Path;

/// Resolve `import_path`, written inside `from_file`, to a file under `root_dir`.
///
/// `from_file` is repo-relative. Returns `None` for bare package specifiers,
/// URLs, references that climb out of the root, and targets that do not exist.
pub fn resolve_import_path(import_path: &str, from_file: &str, root_dir: &Path) -> Option<String> {
    let segments = reference_segments(import_path, from_file, false)?;
    probe(&segments, root_dir)
}

/// Resolve a Markdown link target written inside `from_file`.
///
/// Unlike imports, a target without a leading `./` is still relative to the
/// linking file. Targets with a scheme (`https:`, `mailto:`) never resolve.
pub fn resolve_link_path(target: &str, from_file: &str, root_dir: &Path) -> Option<String> {
    let segments = reference_segments(target, from_file, true)?;
    probe(&segments, root_dir)
}

/// The repo-relative path a reference names, whether or not it exists.
///
/// `None` for bare package specifiers, URLs, and paths escaping the root.
pub fn normalize_reference(source: &str, kind: ImportKind, from_file: &str) -> Option<String> {
    let segments = reference_segments(source, from_file, kind == ImportKind::Link)?;
    (!segments.is_empty()).then(|| segments.join("/"))
}

/// Lexical target of a reference as path segments under the root.
fn reference_segments(reference: &str, from_file: &str, link: bool) -> Option<Vec<String>> {
    let reference = reference.trim();
    if reference.is_empty() || reference.contains("://") || (link && has_scheme(reference)) {
        return None;
    }

    if let Some(rest) = reference.strip_prefix("@/") {
        normalize(Vec::new(), rest)
    } else if let Some(rest) = reference.strip_prefix('/') {
        normalize(Vec::new(), rest)
    } else if link || is_relative(reference) {
        let from_file = from_file.replace('\\', "/");
        let mut base: Vec<String> = from_file
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();
        base.pop();
        normalize(base, reference)
    } else {
        None
    }
}

fn probe(segments: &[String], root_dir: &Path) -> Option<String> {
    candidates(segments)
        .into_iter()
        .find(|candidate| root_dir.join(candidate).is_file())
}

/// `mailto:x`, `tel:1`, `vscode:...`; a single letter is a drive, not a scheme.
fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_relative(import_path: &str) -> bool {
    import_path == "."
        || import_path == ".."
        || import_path.starts_with("./")
        || import_path.starts_with("../")
}

/// Apply `relative` to `base` lexically; `None` when it escapes the root.
fn normalize(mut base: Vec<String>, relative: &str) -> Option<Vec<String>> {
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                base.pop()?;
            }
            other => base.push(other.to_string()),
        }
    }
    Some(base)
}

/// Files to probe, in priority order.
fn candidates(segments: &[String]) -> Vec<String> {
    let joined = segments.join("/");
    let mut out = Vec::new();

    if !joined.is_empty() {
        out.push(joined.clone());
        for ext in IndexerConfig::DEFAULT_EXTENSIONS {
            out.push(format!("{}.{}", joined, ext));
        }
    }

    let prefix = if joined.is_empty() {
        String::new()
    } else {
        format!("{}/", joined)
    };
    for ext in IndexerConfig::DEFAULT_EXTENSIONS {
        out.push(format!("{}index.{}", prefix, ext));
    }
    out.push(format!("{}README.md", prefix));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("rules/nested")).unwrap();
        fs::create_dir_all(root.join("guides")).unwrap();
        fs::write(root.join("rules/auth.md"), "auth").unwrap();
        fs::write(root.join("rules/nested/deep.md"), "deep").unwrap();
        fs::write(root.join("rules/session.mdc"), "session").unwrap();
        fs::write(root.join("guides/index.md"), "guides").unwrap();
        fs::write(root.join("README.md"), "readme").unwrap();
        dir
    }

    #[test]
    fn test_relative_paths() {
        let dir = fixture();
        let root = dir.path();
        assert_eq!(
            resolve_import_path("./auth.md", "rules/login.md", root),
            Some("rules/auth.md".to_string())
        );
        assert_eq!(
            resolve_import_path("../auth.md", "rules/nested/deep.md", root),
            Some("rules/auth.md".to_string())
        );
        assert_eq!(
            resolve_import_path("./nested/./deep.md", "rules/x.md", root),
            Some("rules/nested/deep.md".to_string())
        );
    }

    #[test]
    fn test_extension_and_index_candidates() {
        let dir = fixture();
        let root = dir.path();
        assert_eq!(
            resolve_import_path("./session", "rules/auth.md", root),
            Some("rules/session.mdc".to_string())
        );
        assert_eq!(
            resolve_import_path("../guides", "rules/auth.md", root),
            Some("guides/index.md".to_string())
        );
        assert_eq!(
            resolve_import_path("..", "rules/auth.md", root),
            Some("README.md".to_string())
        );
    }

    #[test]
    fn test_root_relative() {
        let dir = fixture();
        let root = dir.path();
        assert_eq!(
            resolve_import_path("/rules/auth", "guides/index.md", root),
            Some("rules/auth.md".to_string())
        );
        assert_eq!(
            resolve_import_path("@/rules/nested/deep", "README.md", root),
            Some("rules/nested/deep.md".to_string())
        );
    }

    #[test]
    fn test_links_are_relative_without_dot_prefix() {
        let dir = fixture();
        let root = dir.path();
        fs::write(root.join("rules/login.md"), "login").unwrap();

        assert_eq!(
            resolve_link_path("login.md", "rules/auth.md", root),
            Some("rules/login.md".to_string())
        );
        assert_eq!(
            resolve_link_path("nested/deep", "rules/auth.md", root),
            Some("rules/nested/deep.md".to_string())
        );
        // Root-level README.md is not picked up by a same-directory link
        assert_eq!(resolve_link_path("README.md", "rules/auth.md", root), None);
        assert_eq!(resolve_link_path("mailto:a@b.dev", "rules/auth.md", root), None);
        assert_eq!(resolve_link_path("tel:123", "rules/auth.md", root), None);
        // Imports keep bare specifiers external
        assert_eq!(resolve_import_path("login.md", "rules/auth.md", root), None);
    }

    #[test]
    fn test_normalize_reference() {
        assert_eq!(
            normalize_reference("./b", ImportKind::Import, "docs/a.md"),
            Some("docs/b".to_string())
        );
        assert_eq!(
            normalize_reference("../x/y.md", ImportKind::Link, "docs/a.md"),
            Some("x/y.md".to_string())
        );
        assert_eq!(
            normalize_reference("login.md", ImportKind::Link, "commands/deploy.md"),
            Some("commands/login.md".to_string())
        );
        assert_eq!(normalize_reference("lodash", ImportKind::Require, "a.md"), None);
        assert_eq!(normalize_reference("../../up.md", ImportKind::Link, "a.md"), None);
    }

    #[test]
    fn test_unresolvable() {
        let dir = fixture();
        let root = dir.path();
        assert_eq!(resolve_import_path("lodash", "rules/auth.md", root), None);
        assert_eq!(resolve_import_path("https://x.dev/a.md", "a.md", root), None);
        assert_eq!(resolve_import_path("./missing.md", "rules/auth.md", root), None);
        assert_eq!(resolve_import_path("../../etc/passwd", "rules/auth.md", root), None);
        assert_eq!(resolve_import_path("", "rules/auth.md", root), None);
    }
}
