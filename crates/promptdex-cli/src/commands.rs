//! Subcommand handlers.

use crate::output;
use crate::Command;
use anyhow::Result;
use promptdex_core::search::MetadataFilter;
use promptdex_core::{
    Direction, DocIndex, DocumentType, FanOutOptions, FullTextOptions, MetadataOptions,
    PromptdexError, StrategyKind,
};
use serde_json::Value;

pub(crate) async fn dispatch(index: &DocIndex, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Index { full } => {
            if full {
                let result = index.index_full().await?;
                output::index_result(&result, json)
            } else {
                let result = index.index_incremental().await?;
                output::incremental_result(&result, json)
            }
        }

        Command::Search {
            query,
            limit,
            doc_type,
            strategies,
        } => {
            let mut options = FanOutOptions {
                limit,
                document_type: parse_doc_type(doc_type.as_deref())?,
                ..index.search_options()
            };
            if !strategies.is_empty() {
                options.strategies = strategies
                    .iter()
                    .map(|s| parse_strategy(s))
                    .collect::<std::result::Result<_, _>>()?;
            }
            let results = index.search(&query, &options).await;
            output::fanout_results(&results, json)
        }

        Command::Text {
            query,
            limit,
            offset,
            doc_type,
            strict,
        } => {
            let options = FullTextOptions {
                document_type: parse_doc_type(doc_type.as_deref())?,
                limit,
                offset,
                strict,
            };
            let results = index.search_fulltext(&query, &options)?;
            output::search_results(&results, json)
        }

        Command::Filter {
            conditions,
            limit,
            offset,
        } => {
            let filter = parse_conditions(&conditions)?;
            let results = index.search_metadata(&filter, &MetadataOptions { limit, offset })?;
            output::search_results(&results, json)
        }

        Command::Deps {
            path,
            direction,
            max_depth,
        } => {
            let direction = Direction::from_str(&direction).ok_or_else(|| {
                PromptdexError::validation("direction", format!("unknown direction {:?}", direction))
            })?;
            let related = index.related(&path, direction, max_depth)?;
            output::related_files(&related, json)
        }

        Command::EntryPoints => output::paths(&index.entry_points()?, json),
        Command::Leaves => output::paths(&index.leaf_nodes()?, json),
        Command::Graph => output::graph(&index.dependency_graph()?, json),
        Command::Stats => output::stats(&index.stats()?, json),
    }
}

fn parse_doc_type(value: Option<&str>) -> Result<Option<DocumentType>, PromptdexError> {
    value
        .map(|s| {
            DocumentType::from_str(s).ok_or_else(|| {
                PromptdexError::validation("type", format!("unknown document type {:?}", s))
            })
        })
        .transpose()
}

fn parse_strategy(value: &str) -> Result<StrategyKind, PromptdexError> {
    StrategyKind::from_str(value.trim()).ok_or_else(|| {
        PromptdexError::validation("strategies", format!("unknown strategy {:?}", value))
    })
}

/// Parse `KEY=VALUE` arguments into a filter.
///
/// Keys other than `type`, `path`, and `frontmatter.*` address frontmatter
/// fields. Values are read as JSON when possible (`true`, `3`, `null`,
/// `["a","b"]`) and as plain strings otherwise.
pub(crate) fn parse_conditions(conditions: &[String]) -> Result<MetadataFilter, PromptdexError> {
    let mut filter = MetadataFilter::new();
    for condition in conditions {
        let (key, raw) = condition.split_once('=').ok_or_else(|| {
            PromptdexError::validation(condition.as_str(), "expected KEY=VALUE")
        })?;
        let key = if key == "type" || key == "path" || key.starts_with("frontmatter.") {
            key.to_string()
        } else {
            format!("frontmatter.{}", key)
        };
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        filter.insert(key, value);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_conditions() {
        let filter = parse_conditions(&[
            "type=rule".to_string(),
            "tags=security".to_string(),
            "alwaysApply=true".to_string(),
            "frontmatter.meta.owner=\"web\"".to_string(),
            "labels=[\"a\",\"b\"]".to_string(),
        ])
        .unwrap();

        let expected = MetadataFilter::new()
            .with("type", "rule")
            .with("frontmatter.tags", "security")
            .with("frontmatter.alwaysApply", true)
            .with("frontmatter.meta.owner", "web")
            .with("frontmatter.labels", json!(["a", "b"]));
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_parse_conditions_requires_separator() {
        let err = parse_conditions(&["novalue".to_string()]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_parse_doc_type_and_strategy() {
        assert_eq!(parse_doc_type(Some("story-map")).unwrap(), Some(DocumentType::StoryMap));
        assert_eq!(parse_doc_type(None).unwrap(), None);
        assert!(parse_doc_type(Some("essay")).is_err());
        assert_eq!(parse_strategy(" metadata").unwrap(), StrategyKind::Metadata);
        assert!(parse_strategy("vector").is_err());
    }
}
