//! Keccak-256 hashing and fixed-width encodings.
//!
//! Protocol hashes are Keccak-256 (the pre-NIST padding used by Ethereum and
//! Starknet). Inputs are fixed 32-byte big-endian words or domain tags
//! concatenated directly, so no length prefixes are added.
//!
//! ```text
//! shared secret hash = keccak256(BE32(S.x))
//! metadata mask      = keccak256("stealthflow:metadata" || BE32(S.x))
//! starknet_keccak(m) = keccak256(m) mod 2^250
//! hash_on_elements   = pedersen(fold(0, pedersen, xs), len(xs))
//! ```
//!
//! Account addresses use the Pedersen hash over Stark field elements.

use k256::elliptic_curve::ops::Reduce;
use k256::{FieldBytes, Scalar};
use sha3::{Digest, Keccak256};
use starknet_crypto::{pedersen_hash, Felt};

use stealthflow_core::constants::STARKNET_KECCAK_BITS;
use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::types::U256;

// ═══════════════════════════════════════════════════════════════════════════════
// KECCAK-256
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes Keccak-256 of `input`.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    Digest::update(&mut hasher, input);
    hasher.finalize().into()
}

/// Computes Keccak-256 over the concatenation of `parts`.
///
/// # Example
///
/// ```rust
/// use stealthflow_crypto::hash::{keccak256, keccak256_concat};
///
/// assert_eq!(keccak256_concat(&[b"hel", b"lo"]), keccak256(b"hello"));
/// ```
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        Digest::update(&mut hasher, part);
    }
    hasher.finalize().into()
}

// ═══════════════════════════════════════════════════════════════════════════════
// STARKNET HASHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Keccak-256 truncated to 250 bits, as Starknet derives selectors.
pub fn starknet_keccak(input: &[u8]) -> U256 {
    U256::from_be_bytes(keccak256(input)).mask_bits(STARKNET_KECCAK_BITS)
}

fn to_felt(word: &U256) -> Result<Felt> {
    let felt = Felt::from_bytes_be(word.as_be_bytes());
    if felt.to_bytes_be() != word.to_be_bytes() {
        return Err(StealthFlowError::ValidationError(format!(
            "{:#x} is not a Stark field element",
            word
        )));
    }
    Ok(felt)
}

/// Pedersen hash of two field elements.
pub fn pedersen(a: &U256, b: &U256) -> Result<U256> {
    let hash = pedersen_hash(&to_felt(a)?, &to_felt(b)?);
    Ok(U256::from_be_bytes(hash.to_bytes_be()))
}

/// Starknet `compute_hash_on_elements`: a Pedersen chain from zero, closed
/// with the element count.
///
/// Fails if any word is not below the Stark prime.
pub fn hash_on_elements(words: &[U256]) -> Result<U256> {
    let mut acc = Felt::ZERO;
    for word in words {
        acc = pedersen_hash(&acc, &to_felt(word)?);
    }
    let hash = pedersen_hash(&acc, &Felt::from(words.len() as u64));
    Ok(U256::from_be_bytes(hash.to_bytes_be()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCALAR REDUCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Interprets a 32-byte big-endian value as an integer modulo N.
pub fn reduce_to_scalar(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<k256::U256>>::reduce_bytes(FieldBytes::from_slice(bytes))
}
