//! Fixed-width 256-bit words.
//!
//! [`U256`] carries every on-chain integer StealthFlow touches: amounts,
//! ciphertext words, scheme ids, felts and curve coordinates. The value is
//! kept as 32 big-endian bytes so hashing and XOR operate on the canonical
//! encoding directly. Text conversion goes through `num-bigint`.

use std::fmt;
use std::ops::BitXor;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StealthFlowError};

/// Byte offset where the low 128-bit half starts.
const LOW_HALF: usize = 16;

/// Unsigned 256-bit integer stored as 32 big-endian bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct U256([u8; 32]);

impl U256 {
    /// The zero word.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a word from its big-endian encoding.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a word from a big-endian slice of at most 32 significant bytes.
    ///
    /// Leading zero bytes beyond 32 are accepted.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self> {
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let significant = &bytes[first..];
        if significant.len() > 32 {
            return Err(StealthFlowError::ValidationError(format!(
                "value needs {} bytes, maximum is 32",
                significant.len()
            )));
        }

        let mut out = [0u8; 32];
        out[32 - significant.len()..].copy_from_slice(significant);
        Ok(Self(out))
    }

    /// Returns the big-endian encoding.
    pub const fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Borrows the big-endian encoding.
    pub fn as_be_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Creates a word from a `u64`.
    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    /// Creates a word from a `u128`.
    pub fn from_u128(value: u128) -> Self {
        Self::from_halves(value, 0)
    }

    /// Joins Cairo-style 128-bit halves: `low + (high << 128)`.
    pub fn from_halves(low: u128, high: u128) -> Self {
        let mut out = [0u8; 32];
        out[..LOW_HALF].copy_from_slice(&high.to_be_bytes());
        out[LOW_HALF..].copy_from_slice(&low.to_be_bytes());
        Self(out)
    }

    /// Splits into `(low, high)` 128-bit halves.
    pub fn split(&self) -> (u128, u128) {
        let mut high = [0u8; 16];
        let mut low = [0u8; 16];
        high.copy_from_slice(&self.0[..LOW_HALF]);
        low.copy_from_slice(&self.0[LOW_HALF..]);
        (u128::from_be_bytes(low), u128::from_be_bytes(high))
    }

    /// Returns the value as `u128` if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        let (low, high) = self.split();
        (high == 0).then_some(low)
    }

    /// Returns the value as `u64` if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|v| u64::try_from(v).ok())
    }

    /// Returns true if the word is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Number of significant bits.
    pub fn bits(&self) -> u32 {
        match self.0.iter().position(|b| *b != 0) {
            Some(i) => (32 - i as u32) * 8 - self.0[i].leading_zeros(),
            None => 0,
        }
    }

    /// Reduces the word modulo `2^bits`.
    pub fn mask_bits(&self, bits: u32) -> Self {
        if bits >= 256 {
            return *self;
        }

        let boundary = 32 - (bits / 8) as usize;
        let rem = bits % 8;
        let mut out = self.0;
        for (i, byte) in out.iter_mut().enumerate() {
            if i + 1 < boundary {
                *byte = 0;
            } else if i + 1 == boundary {
                *byte &= (1u8 << rem) - 1;
            }
        }
        Self(out)
    }

    /// Converts from an arbitrary-precision integer.
    pub fn from_biguint(value: &BigUint) -> Result<Self> {
        Self::from_be_slice(&value.to_bytes_be())
    }

    /// Converts to an arbitrary-precision integer.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Parses a `0x`-prefixed hex or a plain decimal integer.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (digits, radix) = match text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
        {
            Some(hex) => (hex, 16),
            None => (text, 10),
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(StealthFlowError::ValidationError(format!(
                "not an integer: {:?}",
                text
            )));
        }

        let value = BigUint::parse_bytes(digits.as_bytes(), radix).ok_or_else(|| {
            StealthFlowError::ValidationError(format!("not an integer: {:?}", text))
        })?;
        Self::from_biguint(&value)
    }

    /// Minimal lower-case hex with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self)
    }

    /// Zero-padded 64-digit lower-case hex with `0x` prefix.
    pub fn to_padded_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl BitXor for U256 {
    type Output = U256;

    fn bitxor(self, rhs: U256) -> U256 {
        let mut out = [0u8; 32];
        for (o, (a, b)) in out.iter_mut().zip(self.0.iter().zip(rhs.0.iter())) {
            *o = a ^ b;
        }
        U256(out)
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl From<[u8; 32]> for U256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::LowerHex for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        f.write_str(&self.to_biguint().to_str_radix(16))
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({:#x})", self)
    }
}

impl FromStr for U256 {
    type Err = StealthFlowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// Serde implementation that uses hex strings
impl Serialize for U256 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
