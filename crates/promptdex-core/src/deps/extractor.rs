//! Reference extraction from document content.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// `import x from '...'`, `import '...'`, `export { x } from '...'`
static STATIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:import|export)\s+(?:(?:type\s+)?[\w*${}\s,]+?\s+from\s+)?['"]([^'"\n]+)['"]"#)
        .unwrap()
});

/// `import('...')`
static DYNAMIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap());

/// `require('...')`
static REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap());

/// `[text](target)`, excluding images
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|[^!])\[[^\]\n]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap());

/// How a reference was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// `import ... from '...'` and re-exports
    Import,
    /// `import('...')`
    DynamicImport,
    /// `require('...')`
    Require,
    /// Relative Markdown link
    Link,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Import => "import",
            ImportKind::DynamicImport => "dynamic-import",
            ImportKind::Require => "require",
            ImportKind::Link => "link",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "import" => Some(ImportKind::Import),
            "dynamic-import" => Some(ImportKind::DynamicImport),
            "require" => Some(ImportKind::Require),
            "link" => Some(ImportKind::Link),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reference found in content, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDependency {
    /// The specifier exactly as written.
    pub source: String,
    pub import_kind: ImportKind,
    /// 1-based line number.
    pub line: usize,
    /// The trimmed source line.
    pub raw_text: String,
}

/// Find every recognized reference in `content`, ordered by line then column.
pub fn extract_dependencies(content: &str) -> Vec<ExtractedDependency> {
    let mut found = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let mut hits: Vec<(usize, ImportKind, &str)> = Vec::new();

        if let Some(caps) = STATIC_IMPORT.captures(line) {
            if let Some(m) = caps.get(1) {
                hits.push((m.start(), ImportKind::Import, m.as_str()));
            }
        }
        for (regex, kind) in [
            (&*DYNAMIC_IMPORT, ImportKind::DynamicImport),
            (&*REQUIRE, ImportKind::Require),
        ] {
            for caps in regex.captures_iter(line) {
                if let Some(m) = caps.get(1) {
                    hits.push((m.start(), kind, m.as_str()));
                }
            }
        }
        for caps in MARKDOWN_LINK.captures_iter(line) {
            if let Some(m) = caps.get(1) {
                if let Some(target) = link_target(m.as_str()) {
                    hits.push((m.start(), ImportKind::Link, target));
                }
            }
        }

        hits.sort_by_key(|(column, _, _)| *column);
        found.extend(hits.into_iter().map(|(_, kind, source)| ExtractedDependency {
            source: source.to_string(),
            import_kind: kind,
            line: index + 1,
            raw_text: line.trim().to_string(),
        }));
    }

    found
}

/// Strip anchors and queries from a link target; `None` for non-file links.
fn link_target(target: &str) -> Option<&str> {
    if target.starts_with('#') || target.contains("://") || target.starts_with("mailto:") {
        return None;
    }
    let end = target.find(['#', '?']).unwrap_or(target.len());
    let path = &target[..end];
    (!path.is_empty()).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(content: &str) -> Vec<(String, ImportKind, usize)> {
        extract_dependencies(content)
            .into_iter()
            .map(|d| (d.source, d.import_kind, d.line))
            .collect()
    }

    #[test]
    fn test_static_imports() {
        let content = "import { a } from './a.md';\nimport b from \"../b\"\nimport './side-effect.md'\nexport * from './c.md'";
        assert_eq!(
            sources(content),
            vec![
                ("./a.md".to_string(), ImportKind::Import, 1),
                ("../b".to_string(), ImportKind::Import, 2),
                ("./side-effect.md".to_string(), ImportKind::Import, 3),
                ("./c.md".to_string(), ImportKind::Import, 4),
            ]
        );
    }

    #[test]
    fn test_dynamic_and_require() {
        let content = "# Loader\n\nconst x = await import('./lazy.md');\nconst y = require(\"./config\");";
        assert_eq!(
            sources(content),
            vec![
                ("./lazy.md".to_string(), ImportKind::DynamicImport, 3),
                ("./config".to_string(), ImportKind::Require, 4),
            ]
        );
    }

    #[test]
    fn test_multiple_on_one_line_ordered_by_column() {
        let content = "const a = require('./a'), b = import('./b');";
        let deps = extract_dependencies(content);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].source, "./a");
        assert_eq!(deps[1].source, "./b");
        assert_eq!(deps[0].raw_text, content);
    }

    #[test]
    fn test_markdown_links() {
        let content = "See [auth](./rules/auth.md#setup) and [docs](https://example.com).\n![img](./logo.png)\n[top](#top) [mail](mailto:a@b.c)";
        assert_eq!(
            sources(content),
            vec![("./rules/auth.md".to_string(), ImportKind::Link, 1)]
        );
    }

    #[test]
    fn test_prose_is_ignored() {
        let content = "We import data from many places.\nRequire approval before merging.";
        assert!(extract_dependencies(content).is_empty());
    }

    #[test]
    fn test_import_kind_roundtrip() {
        for kind in [
            ImportKind::Import,
            ImportKind::DynamicImport,
            ImportKind::Require,
            ImportKind::Link,
        ] {
            assert_eq!(ImportKind::from_str(kind.as_str()), Some(kind));
        }
    }
}
