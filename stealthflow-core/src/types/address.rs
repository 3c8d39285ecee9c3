//! Address types for StealthFlow.
//!
//! - [`MetaAddress`]: Published address for receiving private payments
//! - [`StealthAccountAddress`]: One-time Starknet account for a specific payment

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{META_ADDRESS_FIELDS, META_ADDRESS_PREFIX, STARKNET_ADDRESS_BITS};
use crate::error::{Result, StealthFlowError};
use crate::types::keys::Point;
use crate::types::word::U256;

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A recipient's reusable public identity.
///
/// String form:
///
/// ```text
/// st:starknet:0x<viewX>,0x<viewY>,0x<spendX>,0x<spendY>
/// ```
///
/// Senders only need this to create payments the recipient can find.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaAddress {
    /// Viewing public key, used for shared secret agreement
    pub view_pub: Point,
    /// Spending public key, the base of every stealth key
    pub spend_pub: Point,
}

impl MetaAddress {
    /// Creates a meta-address from its two public keys.
    pub fn new(view_pub: Point, spend_pub: Point) -> Self {
        Self {
            view_pub,
            spend_pub,
        }
    }

    /// Encodes as `st:starknet:0x..,0x..,0x..,0x..`.
    pub fn to_meta_string(&self) -> String {
        format!(
            "{}{:#x},{:#x},{:#x},{:#x}",
            META_ADDRESS_PREFIX,
            self.view_pub.x(),
            self.view_pub.y(),
            self.spend_pub.x(),
            self.spend_pub.y()
        )
    }

    /// Parses the string form.
    ///
    /// The prefix is stripped when present. The rest must be exactly four
    /// comma-separated integers (`0x` hex or decimal) forming two curve
    /// points. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let body = s.strip_prefix(META_ADDRESS_PREFIX).unwrap_or(s);

        let fields: Vec<&str> = body.split(',').collect();
        if fields.len() != META_ADDRESS_FIELDS {
            return None;
        }

        let mut words = [U256::ZERO; META_ADDRESS_FIELDS];
        for (word, field) in words.iter_mut().zip(fields) {
            *word = U256::parse(field).ok()?;
        }

        let view_pub = Point::from_coordinates(words[0], words[1]).ok()?;
        let spend_pub = Point::from_coordinates(words[2], words[3]).ok()?;
        Some(Self::new(view_pub, spend_pub))
    }
}

impl fmt::Display for MetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_meta_string())
    }
}

impl FromStr for MetaAddress {
    type Err = StealthFlowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            StealthFlowError::InvalidMetaAddress(format!(
                "expected {}<viewX>,<viewY>,<spendX>,<spendY> with valid curve points",
                META_ADDRESS_PREFIX
            ))
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH ACCOUNT ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Starknet address of a stealth account (a felt below 2^251).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "U256", into = "U256")]
pub struct StealthAccountAddress(U256);

impl StealthAccountAddress {
    /// Wraps a word, rejecting values of 2^251 or more.
    pub fn new(value: U256) -> Result<Self> {
        if value.bits() > STARKNET_ADDRESS_BITS {
            return Err(StealthFlowError::ValidationError(format!(
                "{:#x} exceeds a Starknet address",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Parses a `0x` hex or decimal address.
    pub fn parse(s: &str) -> Result<Self> {
        Self::new(U256::parse(s)?)
    }

    /// Returns the address as a word.
    pub fn as_word(&self) -> &U256 {
        &self.0
    }
}

impl TryFrom<U256> for StealthAccountAddress {
    type Error = StealthFlowError;

    fn try_from(value: U256) -> Result<Self> {
        Self::new(value)
    }
}

impl From<StealthAccountAddress> for U256 {
    fn from(address: StealthAccountAddress) -> Self {
        address.0
    }
}

impl fmt::Display for StealthAccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_padded_hex())
    }
}

impl fmt::Debug for StealthAccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StealthAccountAddress({})", self)
    }
}
