//! Content hashing for embedding invalidation.

use xxhash_rust::xxh3::xxh3_64;

/// Hash bullet text for embedding-cache keys and embedding-row invalidation.
/// Stable across process restarts and platforms (xxh3 is a pure function of
/// the bytes, no seed randomization).
pub fn hash_text(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Render a content hash as a fixed-width hex string, used as the on-disk
/// cache-file name component.
pub fn hash_hex(text: &str) -> String {
    format!("{:016x}", hash_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_hash() {
        assert_eq!(hash_text("hello world"), hash_text("hello world"));
    }

    #[test]
    fn different_text_different_hash() {
        assert_ne!(hash_text("hello"), hash_text("world"));
    }

    #[test]
    fn hex_is_fixed_width() {
        assert_eq!(hash_hex("x").len(), 16);
    }
}
