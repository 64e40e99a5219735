//! Short ids for scenario addressing

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 8;

/// Produces a short string id from a numeric seed
pub trait ShortId: Send + Sync {
    fn short_id(&self, seed: u64) -> String;
}

/// Deterministic generator: the same seed always yields the same id
#[derive(Clone, Copy, Debug, Default)]
pub struct SeededShortId;

impl ShortId for SeededShortId {
    fn short_id(&self, seed: u64) -> String {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..ID_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        let id = SeededShortId.short_id(3);
        assert_eq!(id.len(), ID_LEN);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_deterministic_per_seed() {
        assert_eq!(SeededShortId.short_id(42), SeededShortId.short_id(42));
        assert_ne!(SeededShortId.short_id(1), SeededShortId.short_id(2));
    }
}
