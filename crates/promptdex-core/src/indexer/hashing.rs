//! Content fingerprints for change detection.
//!
//! SHA256 over the raw file bytes, as lowercase hex. Both entry points produce
//! identical digests for identical bytes.

use crate::error::{PromptdexError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for streaming reads.
const CHUNK_SIZE: usize = 64 * 1024;

/// Hash bytes already in memory.
pub fn compute_file_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash a file by streaming it, without holding it in memory.
///
/// Used by incremental indexing to decide whether a file needs re-parsing.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| PromptdexError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| PromptdexError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_hash_empty() {
        assert_eq!(
            compute_file_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = compute_file_hash(b"# Title\n\nBody");
        let b = compute_file_hash(b"# Title\n\nBody");
        let c = compute_file_hash(b"# Title\n\nBody!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_streaming_matches_in_memory() {
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&content).unwrap();
        file.flush().unwrap();

        assert_eq!(hash_file(file.path()).unwrap(), compute_file_hash(&content));
    }

    #[test]
    fn test_hash_missing_file() {
        let err = hash_file("/nonexistent/promptdex/file.md").unwrap_err();
        assert!(matches!(err, PromptdexError::Io { path: Some(_), .. }));
    }
}
