//! Frontmatter extraction.
//!
//! A document may open with a YAML block delimited by `---` lines. The block is
//! converted into a JSON object; anything that is not a well-formed mapping
//! leaves the document with empty metadata and its full text as body.

use serde_json::{Map, Number, Value};
use tracing::warn;

/// Keys that could redefine object structure in consumers of the JSON.
const RESERVED_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

const OPEN_DELIMITER: &str = "---";
const CLOSE_DELIMITERS: &[&str] = &["---", "..."];

/// A document split into metadata and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Always a JSON object.
    pub frontmatter: Value,
    pub body: String,
}

impl ParsedDocument {
    fn without_frontmatter(raw: &str) -> Self {
        Self {
            frontmatter: Value::Object(Map::new()),
            body: raw.to_string(),
        }
    }
}

/// Split a leading frontmatter block from the body.
///
/// Never fails: unterminated blocks, invalid YAML, and non-mapping YAML all
/// yield empty metadata and the unmodified input as body.
pub fn parse_frontmatter(raw: &str) -> ParsedDocument {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return ParsedDocument::without_frontmatter(raw);
    };
    if first.trim_end() != OPEN_DELIMITER {
        return ParsedDocument::without_frontmatter(raw);
    }

    let mut offset = first.len();
    let mut block_end = None;
    for line in lines {
        if CLOSE_DELIMITERS.contains(&line.trim_end()) {
            block_end = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let Some((yaml_end, body_start)) = block_end else {
        return ParsedDocument::without_frontmatter(raw);
    };

    let yaml = &text[first.len()..yaml_end];
    let body = text[body_start..].to_string();

    if yaml.trim().is_empty() {
        return ParsedDocument {
            frontmatter: Value::Object(Map::new()),
            body,
        };
    }

    match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
        Ok(serde_yaml::Value::Mapping(mapping)) => ParsedDocument {
            frontmatter: Value::Object(mapping_to_object(mapping)),
            body,
        },
        Ok(_) => ParsedDocument::without_frontmatter(raw),
        Err(e) => {
            warn!("Ignoring malformed frontmatter: {}", e);
            ParsedDocument::without_frontmatter(raw)
        }
    }
}

fn mapping_to_object(mapping: serde_yaml::Mapping) -> Map<String, Value> {
    let mut object = Map::new();
    for (key, value) in mapping {
        let Some(key) = key_to_string(&key) else {
            continue;
        };
        if RESERVED_KEYS.contains(&key.as_str()) {
            warn!("Dropping reserved frontmatter key {:?}", key);
            continue;
        }
        object.insert(key, yaml_to_json(value));
    }
    object
}

fn key_to_string(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Tagged(tagged) => key_to_string(&tagged.value),
        _ => None,
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(mapping_to_object(mapping)),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}
