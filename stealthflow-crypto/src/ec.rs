//! secp256k1 primitive layer.
//!
//! Pure functions over `k256`. Nothing here holds state, so every function
//! is safe to call from any number of threads. Any result at infinity is an
//! error: a valid payment never maps there.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::types::{KeyPair, Point, PrivateKey};

/// Out-of-range draws before giving up; each has probability ~2^-128.
const MAX_KEYGEN_ATTEMPTS: usize = 64;

/// Generates a key pair with a uniform scalar in `[1, N)` from the OS RNG.
///
/// # Errors
/// Returns `KeyGenerationError` if the RNG is unavailable.
pub fn generate_keypair() -> Result<KeyPair> {
    generate_keypair_with(&mut OsRng)
}

/// Generates a key pair from the given RNG by rejection sampling.
pub fn generate_keypair_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<KeyPair> {
    let mut bytes = Zeroizing::new([0u8; 32]);
    for _ in 0..MAX_KEYGEN_ATTEMPTS {
        rng.try_fill_bytes(&mut bytes[..])
            .map_err(|e| StealthFlowError::KeyGenerationError(e.to_string()))?;

        if let Ok(private_key) = PrivateKey::from_bytes(*bytes) {
            return KeyPair::from_private_key(private_key);
        }
    }

    Err(StealthFlowError::KeyGenerationError(
        "RNG produced no scalar below the curve order".into(),
    ))
}

/// Computes `k × G`.
pub fn get_public_key(k: &PrivateKey) -> Result<Point> {
    k.public_key()
}

/// Computes `k × p`.
///
/// # Errors
/// Returns `PointAtInfinity` if the product is the identity.
pub fn point_mul(k: &PrivateKey, p: &Point) -> Result<Point> {
    Point::from_projective(p.to_projective() * k.to_scalar(), "point_mul")
}

/// Computes `p1 + p2`.
///
/// # Errors
/// Returns `PointAtInfinity` if `p1 == -p2`.
pub fn point_add(p1: &Point, p2: &Point) -> Result<Point> {
    Point::from_projective(p1.to_projective() + p2.to_projective(), "point_add")
}

/// Computes `-p`.
pub fn point_neg(p: &Point) -> Result<Point> {
    Point::from_projective(-p.to_projective(), "point_neg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use stealthflow_core::types::U256;

    fn key(k: u64) -> PrivateKey {
        PrivateKey::from_bytes(U256::from_u64(k).to_be_bytes()).unwrap()
    }

    #[test]
    fn test_generate_keypair() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        assert_ne!(a.public_key, b.public_key);
        assert_eq!(get_public_key(&a.private_key).unwrap(), a.public_key);
    }

    #[test]
    fn test_seeded_keypair_is_reproducible() {
        let a = generate_keypair_with(&mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let b = generate_keypair_with(&mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a.public_key, b.public_key);
    }

    #[test]
    fn test_mul_matches_generator() {
        let g = get_public_key(&key(1)).unwrap();
        assert_eq!(point_mul(&key(5), &g).unwrap(), get_public_key(&key(5)).unwrap());
    }

    #[test]
    fn test_add_is_scalar_add() {
        let p2 = get_public_key(&key(2)).unwrap();
        let p3 = get_public_key(&key(3)).unwrap();
        assert_eq!(point_add(&p2, &p3).unwrap(), get_public_key(&key(5)).unwrap());
        assert_eq!(point_add(&p2, &p2).unwrap(), get_public_key(&key(4)).unwrap());
    }

    #[test]
    fn test_add_inverse_is_infinity() {
        let p = get_public_key(&key(9)).unwrap();
        let neg = point_neg(&p).unwrap();
        let err = point_add(&p, &neg).unwrap_err();
        assert!(matches!(err, StealthFlowError::PointAtInfinity("point_add")));
    }

    #[test]
    fn test_diffie_hellman_symmetry() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        let ab = point_mul(&a.private_key, &b.public_key).unwrap();
        let ba = point_mul(&b.private_key, &a.public_key).unwrap();
        assert_eq!(ab, ba);
    }
}
