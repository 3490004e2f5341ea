//! Basic usage example - index a directory and print stats

use promptdex_core::{DocIndex, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Get path from args or use current directory
    let path = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());

    println!("Opening index for: {}", path);
    let index = DocIndex::open(&path)?;

    let result = index.index_incremental().await?;
    println!(
        "Updated {}, deleted {}, unchanged {}",
        result.updated, result.deleted, result.unchanged
    );
    for error in &result.errors {
        println!("  ! {}", error);
    }

    let stats = index.stats()?;
    println!("{} documents, {} edges", stats.documents, stats.edges);
    for (doc_type, count) in &stats.by_type {
        println!("  - {}: {}", doc_type, count);
    }

    index.close()
}
