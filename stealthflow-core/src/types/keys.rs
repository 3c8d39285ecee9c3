//! Key types for StealthFlow.
//!
//! This module defines the key structures used in the protocol:
//!
//! - [`Point`]: Affine secp256k1 point, validated on construction
//! - [`PrivateKey`]: Scalar in `[1, N)`, zeroized on drop
//! - [`KeyPair`]: Private key with its public point
//! - [`RecipientKeys`]: Viewing and spending key pairs of one recipient

use std::fmt;

use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::PrimeField;
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::SCALAR_SIZE;
use crate::error::{Result, StealthFlowError};
use crate::types::word::U256;

// ═══════════════════════════════════════════════════════════════════════════════
// CURVE POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Affine point on secp256k1.
///
/// A `Point` always lies on the curve and is never the point at infinity;
/// every constructor checks this.
#[derive(Clone, Copy)]
pub struct Point {
    x: U256,
    y: U256,
    affine: AffinePoint,
}

impl Point {
    /// Creates a point from affine coordinates.
    ///
    /// # Errors
    /// Returns `InvalidPoint` if `(x, y)` is not on secp256k1.
    pub fn from_coordinates(x: U256, y: U256) -> Result<Self> {
        let encoded = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(x.as_be_bytes()),
            FieldBytes::from_slice(y.as_be_bytes()),
            false,
        );

        let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or_else(|| {
                StealthFlowError::InvalidPoint(format!("({:#x}, {:#x}) is not on secp256k1", x, y))
            })?;

        Ok(Self { x, y, affine })
    }

    /// Creates a point from a projective result, rejecting infinity.
    ///
    /// `operation` names the computation for the error message.
    pub fn from_projective(point: ProjectivePoint, operation: &'static str) -> Result<Self> {
        if point == ProjectivePoint::IDENTITY {
            return Err(StealthFlowError::PointAtInfinity(operation));
        }

        let affine = point.to_affine();
        let encoded = affine.to_encoded_point(false);
        match (encoded.x(), encoded.y()) {
            (Some(x), Some(y)) => Ok(Self {
                x: U256::from_be_slice(x)?,
                y: U256::from_be_slice(y)?,
                affine,
            }),
            _ => Err(StealthFlowError::PointAtInfinity(operation)),
        }
    }

    /// The x coordinate.
    pub fn x(&self) -> &U256 {
        &self.x
    }

    /// The y coordinate.
    pub fn y(&self) -> &U256 {
        &self.y
    }

    /// The point in affine form for curve arithmetic.
    pub fn as_affine(&self) -> &AffinePoint {
        &self.affine
    }

    /// The point in projective form for curve arithmetic.
    pub fn to_projective(&self) -> ProjectivePoint {
        ProjectivePoint::from(self.affine)
    }

    /// Coordinates as Cairo 128-bit halves `[x_low, x_high, y_low, y_high]`.
    pub fn to_split_words(&self) -> [U256; 4] {
        let (x_low, x_high) = self.x.split();
        let (y_low, y_high) = self.y.split();
        [
            U256::from_u128(x_low),
            U256::from_u128(x_high),
            U256::from_u128(y_low),
            U256::from_u128(y_high),
        ]
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for Point {}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({:#x}, {:#x})", self.x, self.y)
    }
}

#[derive(Serialize, Deserialize)]
struct PointRepr {
    x: U256,
    y: U256,
}

impl Serialize for Point {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PointRepr { x: self.x, y: self.y }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = PointRepr::deserialize(deserializer)?;
        Point::from_coordinates(repr.x, repr.y).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRIVATE KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// secp256k1 private scalar in `[1, N)`.
///
/// This key is sensitive and will be automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; SCALAR_SIZE],
}

impl PrivateKey {
    /// Creates a private key from its 32-byte big-endian encoding.
    ///
    /// # Errors
    /// Returns `InvalidScalar` for zero or values not below the curve order.
    pub fn from_bytes(bytes: [u8; SCALAR_SIZE]) -> Result<Self> {
        let scalar = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(&bytes)))
            .ok_or_else(|| StealthFlowError::InvalidScalar("value is not below the curve order".into()))?;
        Self::from_scalar(scalar)
    }

    /// Creates a private key from a curve scalar.
    pub fn from_scalar(scalar: Scalar) -> Result<Self> {
        if scalar == Scalar::ZERO {
            return Err(StealthFlowError::InvalidScalar("value is zero".into()));
        }

        let mut bytes = [0u8; SCALAR_SIZE];
        bytes.copy_from_slice(&scalar.to_repr());
        Ok(Self { bytes })
    }

    /// Parses a hex key, with or without `0x`, left-padding short input.
    pub fn from_hex(s: &str) -> Result<Self> {
        let word = U256::parse(&format!("0x{}", s.trim().trim_start_matches("0x")))
            .map_err(|_| StealthFlowError::InvalidScalar("not a hex scalar".into()))?;
        Self::from_bytes(word.to_be_bytes())
    }

    /// Returns the scalar for curve arithmetic.
    pub fn to_scalar(&self) -> Scalar {
        // Range was checked on construction, so this never fails.
        Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(&self.bytes)))
            .unwrap_or(Scalar::ZERO)
    }

    /// Returns the big-endian encoding.
    pub fn as_bytes(&self) -> &[u8; SCALAR_SIZE] {
        &self.bytes
    }

    /// Returns the key as a zero-padded `0x` hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Computes `self × G`.
    pub fn public_key(&self) -> Result<Point> {
        Point::from_projective(ProjectivePoint::GENERATOR * self.to_scalar(), "public key derivation")
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A private key with its public point.
#[derive(Clone)]
pub struct KeyPair {
    /// Private scalar (sensitive)
    pub private_key: PrivateKey,
    /// Public point `private_key × G`
    pub public_key: Point,
}

impl KeyPair {
    /// Builds a key pair by deriving the public point.
    pub fn from_private_key(private_key: PrivateKey) -> Result<Self> {
        let public_key = private_key.public_key()?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Returns the public key.
    pub fn public(&self) -> &Point {
        &self.public_key
    }

    /// Returns the private key.
    pub fn private(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECIPIENT KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete key set of a recipient.
///
/// The viewing pair detects payments, the spending pair controls them.
#[derive(Clone, Debug)]
pub struct RecipientKeys {
    /// Viewing keys, used to compute shared secrets while scanning
    pub view: KeyPair,
    /// Spending keys, used to reconstruct stealth private keys
    pub spend: KeyPair,
}

impl RecipientKeys {
    /// Rebuilds the key set from the two private scalars.
    pub fn from_private_keys(view: PrivateKey, spend: PrivateKey) -> Result<Self> {
        Ok(Self {
            view: KeyPair::from_private_key(view)?,
            spend: KeyPair::from_private_key(spend)?,
        })
    }

    /// Returns the viewing private key.
    pub fn view_private(&self) -> &PrivateKey {
        &self.view.private_key
    }

    /// Returns the spending private key.
    pub fn spend_private(&self) -> &PrivateKey {
        &self.spend.private_key
    }

    /// Returns the publishable meta-address.
    pub fn meta_address(&self) -> crate::types::MetaAddress {
        crate::types::MetaAddress::new(self.view.public_key, self.spend.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CURVE_ORDER;

    /// Generator coordinates from SEC 2.
    const GX: &str = "0x79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const GY: &str = "0x483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

    fn one() -> PrivateKey {
        PrivateKey::from_bytes(U256::from_u64(1).to_be_bytes()).unwrap()
    }

    #[test]
    fn test_generator_point() {
        let g = one().public_key().unwrap();
        assert_eq!(g.x(), &U256::parse(GX).unwrap());
        assert_eq!(g.y(), &U256::parse(GY).unwrap());
    }

    #[test]
    fn test_point_validation() {
        let x = U256::parse(GX).unwrap();
        let y = U256::parse(GY).unwrap();
        assert!(Point::from_coordinates(x, y).is_ok());

        let bad_y = y ^ U256::from_u64(1);
        let err = Point::from_coordinates(x, bad_y).unwrap_err();
        assert!(matches!(err, StealthFlowError::InvalidPoint(_)));

        assert!(Point::from_coordinates(U256::ZERO, U256::ZERO).is_err());
    }

    #[test]
    fn test_identity_rejected() {
        let err = Point::from_projective(ProjectivePoint::IDENTITY, "test").unwrap_err();
        assert!(matches!(err, StealthFlowError::PointAtInfinity("test")));
    }

    #[test]
    fn test_private_key_range() {
        assert!(PrivateKey::from_bytes([0u8; 32]).is_err());
        assert!(PrivateKey::from_bytes(CURVE_ORDER).is_err());

        let mut below = CURVE_ORDER;
        below[31] -= 1;
        assert!(PrivateKey::from_bytes(below).is_ok());
    }

    #[test]
    fn test_private_key_hex() {
        let key = PrivateKey::from_hex("0x2a").unwrap();
        assert_eq!(key.as_bytes()[31], 0x2a);
        assert_eq!(key.to_hex().len(), 66);

        let same = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(same.as_bytes(), key.as_bytes());

        assert!(PrivateKey::from_hex("zz").is_err());
        assert!(PrivateKey::from_hex("0").is_err());
    }

    #[test]
    fn test_private_key_debug_redacted() {
        let key = PrivateKey::from_hex("0xdeadbeef").unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("deadbeef"));

        let pair = KeyPair::from_private_key(key).unwrap();
        assert!(!format!("{:?}", pair).contains("deadbeef"));
    }

    #[test]
    fn test_point_serde() {
        let g = one().public_key().unwrap();
        let json = serde_json::to_string(&g).unwrap();
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);

        let bad = r#"{"x":"0x1","y":"0x1"}"#;
        assert!(serde_json::from_str::<Point>(bad).is_err());
    }

    #[test]
    fn test_split_words() {
        let g = one().public_key().unwrap();
        let [x_low, x_high, y_low, y_high] = g.to_split_words();
        let (xl, xh) = g.x().split();
        assert_eq!(x_low, U256::from_u128(xl));
        assert_eq!(x_high, U256::from_u128(xh));
        assert_eq!(
            U256::from_halves(y_low.to_u128().unwrap(), y_high.to_u128().unwrap()),
            *g.y()
        );
    }
}
