//! API implementation submodules.
//!
//! Each submodule contains `impl DocIndex` blocks that extend the public API
//! with domain-specific methods. The struct definition remains in `lib.rs`.

mod builder;
mod graph;
mod indexing;
mod search;

pub use builder::DocIndexBuilder;
