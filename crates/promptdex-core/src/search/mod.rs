//! Search strategies and the fan-out aggregator.
//!
//! - [`search_fulltext`]: bm25-ranked FTS5 search with snippets
//! - [`search_metadata`]: conjunctive filters over type, path, and frontmatter
//! - [`FanOutSearch`]: runs strategies concurrently and merges by path
//!
//! Every strategy reports scores where higher is better.

mod fanout;
mod fulltext;
mod metadata;
mod snippet;
mod types;

pub use fanout::{
    FanOutOptions, FanOutSearch, FullTextStrategy, MetadataStrategy, SearchStrategy,
    StrategyOptions, StrategyWeights,
};
pub use fulltext::{search_fulltext, FullTextOptions};
pub use metadata::{
    search_metadata, search_metadata_query, validate_field_path, MetadataFilter, MetadataOptions,
    MetadataQuery,
};
pub use snippet::extract_snippet;
pub use types::{FanOutResult, SearchResult, StrategyKind};
