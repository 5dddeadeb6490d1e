//! Bullet ID generation.
//!
//! IDs are `b-` followed by 8 lowercase base32 characters of random entropy
//!. Callers are responsible for retrying on collision against
//! the live ID set of the node they're writing into — this module only knows
//! how to mint candidates, not how to check uniqueness.

use data_encoding::{Encoding, Specification};
use rand::RngCore;
use std::sync::OnceLock;

/// Lowercase base32 alphabet (Crockford-style, no padding) used for bullet IDs.
fn encoding() -> &'static Encoding {
    static ENCODING: OnceLock<Encoding> = OnceLock::new();
    ENCODING.get_or_init(|| {
        let mut spec = Specification::new();
        spec.symbols.push_str("0123456789abcdefghjkmnpqrstvwxyz");
        spec.encoding().unwrap()
    })
}

/// Number of random bytes needed to produce 8 base32 characters (8 * 5 bits = 40 bits).
const ENTROPY_BYTES: usize = 5;

/// A single candidate bullet ID, `b-` plus 8 lowercase base32 characters.
pub fn generate_candidate() -> String {
    let mut buf = [0u8; ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut buf);
    let encoded = encoding().encode(&buf);
    format!("b-{}", &encoded[..8])
}

/// Mint a fresh bullet ID that is not already present in `live_ids`, retrying
/// on collision. Collisions are astronomically unlikely (40 bits of entropy)
/// but the spec requires retry rather than trusting the birthday bound.
pub fn generate_unique<'a>(mut is_live: impl FnMut(&str) -> bool) -> String {
    loop {
        let candidate = generate_candidate();
        if !is_live(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn candidates_have_expected_shape() {
        let id = generate_candidate();
        assert!(id.starts_with("b-"));
        assert_eq!(id.len(), 10);
        assert!(id[2..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn candidates_are_practically_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_candidate()));
        }
    }

    #[test]
    fn generate_unique_retries_on_collision() {
        let mut calls = 0;
        let id = generate_unique(|_| {
            calls += 1;
            calls < 3
        });
        assert_eq!(calls, 3);
        assert!(id.starts_with("b-"));
    }
}
