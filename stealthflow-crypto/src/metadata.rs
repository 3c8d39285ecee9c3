//! Amount encryption keyed by the shared secret.
//!
//! ```text
//! mask       = keccak256("stealthflow:metadata" || BE32(S.x))
//! ciphertext = [amount XOR mask]
//! ```
//!
//! The mask is unique per announcement because `S` is. Masks are recomputed
//! on every call and never cached.

use stealthflow_core::constants::DOMAIN_METADATA;
use stealthflow_core::types::{DecryptedAmount, U256};

use crate::hash::keccak256_concat;

/// Computes the metadata mask for a shared secret x coordinate.
pub fn metadata_mask(shared_x: &U256) -> U256 {
    U256::from_be_bytes(keccak256_concat(&[DOMAIN_METADATA, shared_x.as_be_bytes()]))
}

/// Encrypts an amount in base units. Returns a single-word ciphertext.
pub fn encrypt_metadata(shared_x: &U256, amount: U256) -> Vec<U256> {
    vec![amount ^ metadata_mask(shared_x)]
}

/// Decrypts an announcement ciphertext.
///
/// An empty ciphertext yields `Unknown`. Words after the first are ignored.
pub fn decrypt_metadata(shared_x: &U256, ciphertext: &[U256]) -> DecryptedAmount {
    match ciphertext.first() {
        Some(word) => DecryptedAmount::Known(*word ^ metadata_mask(shared_x)),
        None => DecryptedAmount::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::keccak256;
    use proptest::prelude::*;

    #[test]
    fn test_mask_is_domain_separated() {
        let x = U256::from_u64(0xdead_beef);
        assert_ne!(metadata_mask(&x), U256::from_be_bytes(keccak256(x.as_be_bytes())));

        let mut input = DOMAIN_METADATA.to_vec();
        input.extend_from_slice(x.as_be_bytes());
        assert_eq!(metadata_mask(&x), U256::from_be_bytes(keccak256(&input)));
    }

    #[test]
    fn test_round_trip() {
        let x = U256::from_be_bytes([7u8; 32]);
        let amount = U256::from_u128(1_500_000_000_000_000_000);

        let ct = encrypt_metadata(&x, amount);
        assert_eq!(ct.len(), 1);
        assert_ne!(ct[0], amount);
        assert_eq!(decrypt_metadata(&x, &ct), DecryptedAmount::Known(amount));
    }

    #[test]
    fn test_empty_ciphertext_is_unknown() {
        let x = U256::from_u64(1);
        let amount = decrypt_metadata(&x, &[]);
        assert!(amount.is_unknown());
        assert_eq!(amount.known(), None);
    }

    #[test]
    fn test_zero_amount_is_known() {
        let x = U256::from_u64(5);
        let ct = encrypt_metadata(&x, U256::ZERO);
        assert_eq!(decrypt_metadata(&x, &ct), DecryptedAmount::Known(U256::ZERO));
    }

    #[test]
    fn test_extra_words_ignored() {
        let x = U256::from_u64(9);
        let mut ct = encrypt_metadata(&x, U256::from_u64(42));
        ct.push(U256::from_u64(1234));
        assert_eq!(decrypt_metadata(&x, &ct).known(), Some(U256::from_u64(42)));
    }

    proptest! {
        #[test]
        fn prop_metadata_round_trip(x in any::<[u8; 32]>(), amount in any::<[u8; 32]>()) {
            let x = U256::from_be_bytes(x);
            let amount = U256::from_be_bytes(amount);
            let ct = encrypt_metadata(&x, amount);
            prop_assert_eq!(decrypt_metadata(&x, &ct), DecryptedAmount::Known(amount));
        }

        #[test]
        fn prop_wrong_key_does_not_decrypt(
            x in any::<[u8; 32]>(),
            y in any::<[u8; 32]>(),
            amount in any::<u128>(),
        ) {
            prop_assume!(x != y);
            let amount = U256::from_u128(amount);
            let ct = encrypt_metadata(&U256::from_be_bytes(x), amount);
            prop_assert_ne!(
                decrypt_metadata(&U256::from_be_bytes(y), &ct),
                DecryptedAmount::Known(amount)
            );
        }
    }
}
