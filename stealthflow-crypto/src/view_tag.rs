//! Shared secret hashing and view tags.
//!
//! Both parties hash the x coordinate of the ECDH point:
//!
//! ```text
//! h        = keccak256(BE32(S.x))
//! view_tag = h[0]
//! ```
//!
//! A recipient compares the view tag before doing anything else, so ~255 of
//! every 256 foreign announcements cost one scalar multiplication and one
//! hash.
//!
//! ## Security
//!
//! View tags leak 1 byte of the hash. The remaining 248 bits still hide the
//! stealth key offset, and the tag alone cannot identify the recipient.

use std::fmt;

use k256::Scalar;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use stealthflow_core::constants::VIEW_TAG_SPACE;
use stealthflow_core::types::U256;

use crate::hash::{keccak256, reduce_to_scalar};

/// Keccak-256 of the shared secret x coordinate.
///
/// Sensitive: together with the spending key it yields the stealth key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecretHash([u8; 32]);

impl SharedSecretHash {
    /// The view tag, `h[0]`.
    pub fn view_tag(&self) -> u8 {
        self.0[0]
    }

    /// The hash as a 256-bit integer.
    pub fn to_word(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    /// The hash reduced modulo N.
    pub fn to_scalar(&self) -> Scalar {
        reduce_to_scalar(&self.0)
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SharedSecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecretHash([REDACTED])")
    }
}

/// Hashes the shared secret x coordinate.
pub fn hash_shared_secret(shared_x: &U256) -> SharedSecretHash {
    SharedSecretHash(keccak256(shared_x.as_be_bytes()))
}

/// Computes the view tag for a shared secret x coordinate.
pub fn compute_view_tag(shared_x: &U256) -> u8 {
    hash_shared_secret(shared_x).view_tag()
}

/// Checks a view tag against a shared secret hash in constant time.
pub fn verify_view_tag(hash: &SharedSecretHash, expected_tag: u8) -> bool {
    hash.view_tag().ct_eq(&expected_tag).into()
}

/// View tag distribution tracker.
///
/// Useful for analyzing the distribution of view tags in a ledger.
#[derive(Debug, Clone)]
pub struct ViewTagStats {
    /// Count of each view tag value
    pub distribution: Vec<u64>,
    /// Total number of tags analyzed
    pub total: u64,
}

impl Default for ViewTagStats {
    fn default() -> Self {
        Self {
            distribution: vec![0; VIEW_TAG_SPACE],
            total: 0,
        }
    }
}

impl ViewTagStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a view tag.
    pub fn add(&mut self, tag: u8) {
        self.distribution[tag as usize] += 1;
        self.total += 1;
    }

    /// Returns the most common view tag.
    pub fn most_common(&self) -> Option<(u8, u64)> {
        self.distribution
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .map(|(tag, &count)| (tag as u8, count))
    }

    /// Expected count per tag under a uniform distribution.
    pub fn expected_uniform_count(&self) -> f64 {
        self.total as f64 / VIEW_TAG_SPACE as f64
    }

    /// Chi-squared statistic for uniformity (255 degrees of freedom).
    pub fn chi_squared(&self) -> f64 {
        let expected = self.expected_uniform_count();
        if expected == 0.0 {
            return 0.0;
        }

        self.distribution
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                (diff * diff) / expected
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_view_tag_is_first_hash_byte() {
        let x = U256::from_be_bytes([42u8; 32]);
        let hash = keccak256(&[42u8; 32]);
        assert_eq!(compute_view_tag(&x), hash[0]);
        assert_eq!(hash_shared_secret(&x).to_word(), U256::from_be_bytes(hash));
    }

    #[test]
    fn test_small_x_is_padded() {
        // BE32 encoding: a small x hashes as 31 zero bytes then the value
        let mut padded = [0u8; 32];
        padded[31] = 7;
        assert_eq!(
            hash_shared_secret(&U256::from_u64(7)).as_bytes(),
            &keccak256(&padded)
        );
    }

    #[test]
    fn test_verify_view_tag() {
        let hash = hash_shared_secret(&U256::from_be_bytes([99u8; 32]));
        let correct = hash.view_tag();

        assert!(verify_view_tag(&hash, correct));
        assert!(!verify_view_tag(&hash, correct.wrapping_add(1)));
    }

    #[test]
    fn test_debug_redacted() {
        let hash = hash_shared_secret(&U256::from_u64(1));
        assert_eq!(format!("{:?}", hash), "SharedSecretHash([REDACTED])");
    }

    #[test]
    fn test_view_tag_distribution() {
        let mut rng = ChaCha20Rng::seed_from_u64(0x5eed);
        let mut stats = ViewTagStats::new();

        for _ in 0..10000 {
            let x: [u8; 32] = rng.gen();
            stats.add(compute_view_tag(&U256::from_be_bytes(x)));
        }

        // Critical value at p=0.001 with 255 degrees of freedom is ~330
        let chi_sq = stats.chi_squared();
        assert!(chi_sq < 500.0, "View tags are not uniformly distributed: χ² = {}", chi_sq);
    }

    #[test]
    fn test_view_tag_stats() {
        let mut stats = ViewTagStats::new();

        stats.add(0);
        stats.add(0);
        stats.add(1);
        stats.add(255);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.distribution[255], 1);

        let (most_common, count) = stats.most_common().unwrap();
        assert_eq!(most_common, 0);
        assert_eq!(count, 2);
    }
}
