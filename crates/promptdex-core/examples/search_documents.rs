//! Fan-out search example

use promptdex_core::{DocIndex, FanOutOptions, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Get path and query from args
    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).map(|s| s.as_str()).unwrap_or(".");
    let query = args.get(2).map(|s| s.as_str()).unwrap_or("authentication");

    let index = DocIndex::open(path)?;
    index.index_incremental().await?;

    println!("Searching for '{}'...", query);
    let results = index.search(query, &FanOutOptions::default()).await;

    println!("Found {} matches:", results.len());
    for hit in results {
        println!(
            "  - {} [{}] {:.3}",
            hit.result.path, hit.result.document_type, hit.relevance_score
        );
    }

    index.close()
}
