//! Deterministic content fingerprinting.
//!
//! Pure, total over any byte sequence; used both for [`Chunk::content_hash`]
//! (spec §3) and for the file-level hashes the Indexer Orchestrator uses to
//! decide which files need reindexing (spec §4.10).
//!
//! [`Chunk::content_hash`]: crate::domain::models::Chunk::content_hash

use sha2::{Digest, Sha256};

/// Returns the lowercase-hex SHA-256 digest of `data`.
pub fn content_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_a_pure_function_of_its_input() {
        let a = content_hash(b"fn foo() {}");
        let b = content_hash(b"fn foo() {}");
        assert_eq!(a, b);
    }

    #[test]
    fn differs_for_different_input() {
        let a = content_hash(b"fn foo() {}");
        let b = content_hash(b"fn bar() {}");
        assert_ne!(a, b);
    }

    #[test]
    fn produces_64_hex_characters() {
        let h = content_hash(b"");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
