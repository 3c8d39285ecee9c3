//! Stealth address derivation and matching.
//!
//! ## Sender
//!
//! ```text
//! (e, E)       = fresh key pair
//! S            = e × V
//! h            = keccak256(BE32(S.x)),  view_tag = h[0]
//! stealth_pub  = K + (h mod N) × G
//! ```
//!
//! ## Recipient
//!
//! ```text
//! S            = v × E                  (= e × V)
//! h[0] != tag  → NoMatch
//! stealth_priv = (k + h) mod N
//! ```
//!
//! `V`/`v` are the viewing keys, `K`/`k` the spending keys.

use std::fmt;

use k256::ProjectivePoint;
use subtle::ConstantTimeEq;

use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::types::{KeyPair, Point, PrivateKey, U256};

use crate::ec::{generate_keypair, point_add, point_mul};
use crate::view_tag::{hash_shared_secret, verify_view_tag, SharedSecretHash};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Output of the sender-side derivation.
///
/// The ephemeral private key stays inside this value; it is only needed to
/// encrypt metadata in the same flow and is zeroized when dropped.
#[derive(Clone)]
pub struct StealthAddress {
    /// One-time public key receiving the payment
    pub stealth_pub: Point,
    /// Ephemeral public key published in the announcement
    pub ephemeral_pub: Point,
    /// First byte of the shared secret hash
    pub view_tag: u8,
    ephemeral_priv: PrivateKey,
    shared_secret: Point,
}

impl StealthAddress {
    /// Ephemeral private key (sender-only secret).
    pub fn ephemeral_priv(&self) -> &PrivateKey {
        &self.ephemeral_priv
    }

    /// x coordinate of the shared secret, the metadata key.
    pub fn shared_x(&self) -> &U256 {
        self.shared_secret.x()
    }
}

impl fmt::Debug for StealthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StealthAddress")
            .field("stealth_pub", &self.stealth_pub)
            .field("ephemeral_pub", &self.ephemeral_pub)
            .field("view_tag", &self.view_tag)
            .field("ephemeral_priv", &self.ephemeral_priv)
            .field("shared_secret", &"[REDACTED]")
            .finish()
    }
}

/// ECDH point shared by sender and recipient, with its hash.
#[derive(Clone)]
pub struct SharedSecret {
    /// `v × E`
    pub point: Point,
    /// `keccak256(BE32(point.x))`
    pub hash: SharedSecretHash,
}

impl SharedSecret {
    /// x coordinate of the shared point.
    pub fn x(&self) -> &U256 {
        self.point.x()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// Result of the recipient-side view tag check.
#[derive(Clone, Debug)]
pub enum StealthMatch {
    /// View tag differs; the announcement is for someone else
    NoMatch,
    /// View tag matches; the shared secret is ready for key reconstruction
    Match(SharedSecret),
}

impl StealthMatch {
    /// Returns true on a view tag match.
    pub fn is_match(&self) -> bool {
        matches!(self, StealthMatch::Match(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SENDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives a fresh stealth address for a recipient's meta-address.
///
/// # Errors
/// Fails if the RNG is unavailable or any point is at infinity.
pub fn generate_stealth_address(view_pub: &Point, spend_pub: &Point) -> Result<StealthAddress> {
    let ephemeral = generate_keypair()?;
    generate_stealth_address_with(ephemeral, view_pub, spend_pub)
}

/// Derives a stealth address using the given ephemeral key pair.
pub fn generate_stealth_address_with(
    ephemeral: KeyPair,
    view_pub: &Point,
    spend_pub: &Point,
) -> Result<StealthAddress> {
    let shared_secret = point_mul(&ephemeral.private_key, view_pub)?;
    let hash = hash_shared_secret(shared_secret.x());
    let stealth_pub = derive_stealth_pub(spend_pub, &hash)?;

    Ok(StealthAddress {
        stealth_pub,
        ephemeral_pub: ephemeral.public_key,
        view_tag: hash.view_tag(),
        ephemeral_priv: ephemeral.private_key,
        shared_secret,
    })
}

/// Computes `spend_pub + (h mod N) × G`.
pub fn derive_stealth_pub(spend_pub: &Point, hash: &SharedSecretHash) -> Result<Point> {
    let offset = Point::from_projective(ProjectivePoint::GENERATOR * hash.to_scalar(), "stealth offset")?;
    point_add(spend_pub, &offset).map_err(|_| {
        StealthFlowError::StealthDerivationError("stealth public key is the point at infinity".into())
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECIPIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Checks whether an announcement may be addressed to `view_priv`.
///
/// Costs one scalar multiplication and one hash. A `Match` only means the
/// view tags agree; reconstruct the key and compare it to be certain.
pub fn check_stealth_payment(
    view_priv: &PrivateKey,
    ephemeral_pub: &Point,
    view_tag: u8,
) -> Result<StealthMatch> {
    let point = point_mul(view_priv, ephemeral_pub)?;
    let hash = hash_shared_secret(point.x());

    if !verify_view_tag(&hash, view_tag) {
        return Ok(StealthMatch::NoMatch);
    }

    Ok(StealthMatch::Match(SharedSecret { point, hash }))
}

/// Reconstructs the stealth private key `(spend_priv + h) mod N`.
///
/// # Errors
/// Returns `InvalidScalar` if the sum is zero.
pub fn compute_stealth_priv_key(spend_priv: &PrivateKey, hash: &SharedSecretHash) -> Result<PrivateKey> {
    PrivateKey::from_scalar(spend_priv.to_scalar() + hash.to_scalar())
}

/// Checks in constant time that `stealth_priv × G == stealth_pub`.
pub fn verify_stealth_key(stealth_priv: &PrivateKey, stealth_pub: &Point) -> Result<bool> {
    let derived = stealth_priv.public_key()?;
    let lhs = [derived.x().to_be_bytes(), derived.y().to_be_bytes()].concat();
    let rhs = [stealth_pub.x().to_be_bytes(), stealth_pub.y().to_be_bytes()].concat();
    Ok(lhs.ct_eq(&rhs).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::{generate_keypair_with, get_public_key};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use stealthflow_core::types::RecipientKeys;

    fn key(k: u64) -> PrivateKey {
        PrivateKey::from_bytes(U256::from_u64(k).to_be_bytes()).unwrap()
    }

    fn fixed_recipient() -> RecipientKeys {
        RecipientKeys::from_private_keys(key(0xA11CE), key(0xB0B)).unwrap()
    }

    #[test]
    fn test_basic_send_and_claim() {
        let recipient = fixed_recipient();
        let stealth =
            generate_stealth_address(&recipient.view.public_key, &recipient.spend.public_key).unwrap();

        let shared = match check_stealth_payment(
            recipient.view_private(),
            &stealth.ephemeral_pub,
            stealth.view_tag,
        )
        .unwrap()
        {
            StealthMatch::Match(shared) => shared,
            StealthMatch::NoMatch => panic!("recipient must match its own payment"),
        };

        assert_eq!(shared.x(), stealth.shared_x());

        let stealth_priv = compute_stealth_priv_key(recipient.spend_private(), &shared.hash).unwrap();
        assert_eq!(get_public_key(&stealth_priv).unwrap(), stealth.stealth_pub);
        assert!(verify_stealth_key(&stealth_priv, &stealth.stealth_pub).unwrap());
    }

    #[test]
    fn test_debug_redacts_shared_secret() {
        let recipient = fixed_recipient();
        let stealth = generate_stealth_address_with(
            KeyPair::from_private_key(key(0xE1)).unwrap(),
            &recipient.view.public_key,
            &recipient.spend.public_key,
        )
        .unwrap();
        let shared_hex = format!("{:x}", stealth.shared_x());

        let debug = format!("{:?}", stealth);
        assert!(!debug.contains(&shared_hex));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains(&format!("{:x}", stealth.stealth_pub.x())));

        let matched = check_stealth_payment(recipient.view_private(), &stealth.ephemeral_pub, stealth.view_tag).unwrap();
        let debug = format!("{:?}", matched);
        assert!(matched.is_match());
        assert!(!debug.contains(&shared_hex));
        assert_eq!(debug, "Match(SharedSecret([REDACTED]))");
    }

    #[test]
    fn test_round_trip_soundness_many() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for _ in 0..32 {
            let view = generate_keypair_with(&mut rng).unwrap();
            let spend = generate_keypair_with(&mut rng).unwrap();
            let ephemeral = generate_keypair_with(&mut rng).unwrap();

            let stealth =
                generate_stealth_address_with(ephemeral, &view.public_key, &spend.public_key).unwrap();

            let StealthMatch::Match(shared) =
                check_stealth_payment(&view.private_key, &stealth.ephemeral_pub, stealth.view_tag).unwrap()
            else {
                panic!("expected match");
            };

            let stealth_priv = compute_stealth_priv_key(&spend.private_key, &shared.hash).unwrap();
            assert_eq!(stealth_priv.public_key().unwrap(), stealth.stealth_pub);
        }
    }

    #[test]
    fn test_deterministic_with_fixed_ephemeral() {
        let recipient = fixed_recipient();
        let eph = KeyPair::from_private_key(key(12345)).unwrap();

        let a = generate_stealth_address_with(
            eph.clone(),
            &recipient.view.public_key,
            &recipient.spend.public_key,
        )
        .unwrap();
        let b = generate_stealth_address_with(eph, &recipient.view.public_key, &recipient.spend.public_key)
            .unwrap();

        assert_eq!(a.stealth_pub, b.stealth_pub);
        assert_eq!(a.view_tag, b.view_tag);
        assert_eq!(a.ephemeral_priv().as_bytes(), b.ephemeral_priv().as_bytes());
    }

    #[test]
    fn test_wrong_recipient() {
        let recipient = fixed_recipient();
        let stranger = RecipientKeys::from_private_keys(key(777), key(888)).unwrap();

        let stealth =
            generate_stealth_address(&recipient.view.public_key, &recipient.spend.public_key).unwrap();

        match check_stealth_payment(stranger.view_private(), &stealth.ephemeral_pub, stealth.view_tag)
            .unwrap()
        {
            StealthMatch::NoMatch => {}
            StealthMatch::Match(shared) => {
                // View tag collision: the reconstructed key still must not fit
                let wrong = compute_stealth_priv_key(stranger.spend_private(), &shared.hash).unwrap();
                assert!(!verify_stealth_key(&wrong, &stealth.stealth_pub).unwrap());
            }
        }
    }

    #[test]
    fn test_view_tag_filter_rate() {
        let mut rng = ChaCha20Rng::seed_from_u64(0xF117E5);
        let recipient = fixed_recipient();
        let trials = 4096;
        let mut matches = 0;

        for i in 0..trials {
            let unrelated = generate_keypair_with(&mut rng).unwrap();
            let tag = (i % 256) as u8;
            if check_stealth_payment(recipient.view_private(), &unrelated.public_key, tag)
                .unwrap()
                .is_match()
            {
                matches += 1;
            }
        }

        // Expected 16 false positives; allow generous slack
        assert!(matches < 48, "too many view tag matches: {}", matches);
    }

    #[test]
    fn test_stealth_pub_differs_per_payment() {
        let recipient = fixed_recipient();
        let a = generate_stealth_address(&recipient.view.public_key, &recipient.spend.public_key).unwrap();
        let b = generate_stealth_address(&recipient.view.public_key, &recipient.spend.public_key).unwrap();

        assert_ne!(a.stealth_pub, b.stealth_pub);
        assert_ne!(a.ephemeral_pub, b.ephemeral_pub);
    }

    #[test]
    fn test_verify_stealth_key_rejects_other_point() {
        let k = key(99);
        let other = key(100).public_key().unwrap();
        assert!(!verify_stealth_key(&k, &other).unwrap());
    }
}
