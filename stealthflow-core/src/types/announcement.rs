//! Announcement types for the StealthFlow ledger.
//!
//! Senders emit an announcement alongside every stealth payment. It carries
//! the ephemeral public key, the view tag and the encrypted amount, which is
//! everything a recipient needs to recognise the payment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_CIPHERTEXT_WORDS, SCHEME_ID_SECP256K1};
use crate::error::{Result, StealthFlowError};
use crate::types::keys::Point;
use crate::types::word::U256;

/// Stable identity of an announcement: transaction hash plus block number.
///
/// Used for deduplication when scan ranges overlap.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    /// Normalized (trimmed, lower-case) transaction hash
    pub tx_hash: String,
    /// Block containing the transaction
    pub block_number: u64,
}

impl RecordId {
    /// Creates an identity, normalizing the hash.
    pub fn new(tx_hash: &str, block_number: u64) -> Self {
        Self {
            tx_hash: normalize_tx_hash(tx_hash),
            block_number,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tx_hash, self.block_number)
    }
}

/// Normalizes a tx hash for indexing (lowercase, trimmed).
pub fn normalize_tx_hash(hash: &str) -> String {
    hash.trim().to_lowercase()
}

/// The fields a sender submits through the announce call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementPayload {
    /// Stealth scheme (1 = secp256k1 + Keccak-256)
    pub scheme_id: U256,
    /// First byte of the shared secret hash
    pub view_tag: u8,
    /// Sender's one-time public key
    pub ephemeral_pub: Point,
    /// Encrypted metadata; empty when the amount was not disclosed
    pub ciphertext: Vec<U256>,
}

impl AnnouncementPayload {
    /// Creates a payload for the default scheme.
    pub fn new(ephemeral_pub: Point, view_tag: u8, ciphertext: Vec<U256>) -> Self {
        Self {
            scheme_id: U256::from_u64(SCHEME_ID_SECP256K1),
            view_tag,
            ephemeral_pub,
            ciphertext,
        }
    }

    /// Checks the payload fits the on-chain format.
    pub fn validate(&self) -> Result<()> {
        if self.ciphertext.len() > MAX_CIPHERTEXT_WORDS {
            return Err(StealthFlowError::InvalidAnnouncement(format!(
                "ciphertext has {} words, maximum is {}",
                self.ciphertext.len(),
                MAX_CIPHERTEXT_WORDS
            )));
        }
        Ok(())
    }
}

/// An announcement as read back from the ledger.
///
/// Immutable once produced; every scanner sees the same records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    /// Stealth scheme (1 = secp256k1 + Keccak-256)
    pub scheme_id: U256,
    /// View tag for efficient filtering (first byte of hash)
    pub view_tag: u8,
    /// Sender's one-time public key
    pub ephemeral_pub: Point,
    /// Encrypted metadata words
    pub ciphertext: Vec<U256>,
    /// Account that submitted the announcement
    pub caller: U256,
    /// Block containing the announcement
    pub block_number: u64,
    /// Transaction that emitted the announcement
    pub tx_hash: String,
}

impl AnnouncementRecord {
    /// Attaches ledger position to a submitted payload.
    pub fn from_payload(
        payload: AnnouncementPayload,
        caller: U256,
        block_number: u64,
        tx_hash: impl Into<String>,
    ) -> Self {
        Self {
            scheme_id: payload.scheme_id,
            view_tag: payload.view_tag,
            ephemeral_pub: payload.ephemeral_pub,
            ciphertext: payload.ciphertext,
            caller,
            block_number,
            tx_hash: tx_hash.into(),
        }
    }

    /// Returns the deduplication identity.
    pub fn id(&self) -> RecordId {
        RecordId::new(&self.tx_hash, self.block_number)
    }

    /// Returns the sender-controlled part of the record.
    pub fn payload(&self) -> AnnouncementPayload {
        AnnouncementPayload {
            scheme_id: self.scheme_id,
            view_tag: self.view_tag,
            ephemeral_pub: self.ephemeral_pub,
            ciphertext: self.ciphertext.clone(),
        }
    }

    /// Validates the announcement structure.
    ///
    /// The ephemeral key is already a valid curve point by construction.
    pub fn validate(&self) -> Result<()> {
        let hash = normalize_tx_hash(&self.tx_hash);
        let digits = hash.strip_prefix("0x").unwrap_or(&hash);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StealthFlowError::InvalidAnnouncement(format!(
                "tx_hash must be hex, got {:?}",
                self.tx_hash
            )));
        }

        self.payload().validate()
    }
}

/// Builder for creating announcement records with optional fields.
#[derive(Default)]
pub struct AnnouncementBuilder {
    ephemeral_pub: Option<Point>,
    view_tag: Option<u8>,
    scheme_id: Option<U256>,
    ciphertext: Vec<U256>,
    caller: Option<U256>,
    block_number: Option<u64>,
    tx_hash: Option<String>,
}

impl AnnouncementBuilder {
    /// Creates a new announcement builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ephemeral public key (required).
    pub fn ephemeral_pub(mut self, key: Point) -> Self {
        self.ephemeral_pub = Some(key);
        self
    }

    /// Sets the view tag (required).
    pub fn view_tag(mut self, tag: u8) -> Self {
        self.view_tag = Some(tag);
        self
    }

    /// Sets the scheme id (optional, defaults to secp256k1).
    pub fn scheme_id(mut self, id: U256) -> Self {
        self.scheme_id = Some(id);
        self
    }

    /// Sets the ciphertext (optional, defaults to empty).
    pub fn ciphertext(mut self, words: Vec<U256>) -> Self {
        self.ciphertext = words;
        self
    }

    /// Sets the caller (optional, defaults to zero).
    pub fn caller(mut self, caller: U256) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Sets the block number (required).
    pub fn block_number(mut self, num: u64) -> Self {
        self.block_number = Some(num);
        self
    }

    /// Sets the transaction hash (required).
    pub fn tx_hash(mut self, hash: impl Into<String>) -> Self {
        self.tx_hash = Some(hash.into());
        self
    }

    /// Builds the record.
    pub fn build(self) -> Result<AnnouncementRecord> {
        let ephemeral_pub = self
            .ephemeral_pub
            .ok_or_else(|| StealthFlowError::ValidationError("ephemeral_pub is required".into()))?;

        let view_tag = self
            .view_tag
            .ok_or_else(|| StealthFlowError::ValidationError("view_tag is required".into()))?;

        let block_number = self
            .block_number
            .ok_or_else(|| StealthFlowError::ValidationError("block_number is required".into()))?;

        let tx_hash = self
            .tx_hash
            .ok_or_else(|| StealthFlowError::ValidationError("tx_hash is required".into()))?;

        let mut payload = AnnouncementPayload::new(ephemeral_pub, view_tag, self.ciphertext);
        if let Some(id) = self.scheme_id {
            payload.scheme_id = id;
        }

        let record = AnnouncementRecord::from_payload(
            payload,
            self.caller.unwrap_or(U256::ZERO),
            block_number,
            tx_hash,
        );
        record.validate()?;
        Ok(record)
    }
}

/// Statistics about announcements in a ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnouncementStats {
    /// Total number of announcements
    pub total_count: u64,
    /// Announcements per view tag (for distribution analysis)
    pub view_tag_distribution: Vec<u64>,
    /// Lowest block seen
    pub first_block: Option<u64>,
    /// Highest block seen
    pub last_block: Option<u64>,
    /// Announcements without an encrypted amount
    pub undisclosed_amount_count: u64,
}

impl Default for AnnouncementStats {
    fn default() -> Self {
        Self {
            total_count: 0,
            view_tag_distribution: vec![0; 256],
            first_block: None,
            last_block: None,
            undisclosed_amount_count: 0,
        }
    }
}

impl AnnouncementStats {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates stats with a new announcement.
    pub fn add(&mut self, record: &AnnouncementRecord) {
        self.total_count += 1;
        self.view_tag_distribution[record.view_tag as usize] += 1;

        let block = record.block_number;
        self.first_block = Some(self.first_block.map_or(block, |b| b.min(block)));
        self.last_block = Some(self.last_block.map_or(block, |b| b.max(block)));

        if record.ciphertext.is_empty() {
            self.undisclosed_amount_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::keys::PrivateKey;

    fn ephemeral() -> Point {
        PrivateKey::from_hex("0x1234").unwrap().public_key().unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let record = AnnouncementBuilder::new()
            .ephemeral_pub(ephemeral())
            .view_tag(0x42)
            .block_number(10)
            .tx_hash("0xABC")
            .build()
            .unwrap();

        assert_eq!(record.scheme_id, U256::from_u64(1));
        assert_eq!(record.caller, U256::ZERO);
        assert!(record.ciphertext.is_empty());
        assert_eq!(record.id(), RecordId::new("0xabc", 10));
    }

    #[test]
    fn test_builder_missing_fields() {
        let err = AnnouncementBuilder::new().view_tag(1).build().unwrap_err();
        assert!(err.is_validation_error());

        let err = AnnouncementBuilder::new()
            .ephemeral_pub(ephemeral())
            .view_tag(1)
            .block_number(1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("tx_hash"));
    }

    #[test]
    fn test_validate_tx_hash() {
        let build = |hash: &str| {
            AnnouncementBuilder::new()
                .ephemeral_pub(ephemeral())
                .view_tag(1)
                .block_number(1)
                .tx_hash(hash)
                .build()
        };
        assert!(build("0x01").is_ok());
        assert!(build("  0xDEADbeef ").is_ok());
        assert!(build("").is_err());
        assert!(build("0x").is_err());
        assert!(build("0xnothex").is_err());
    }

    #[test]
    fn test_ciphertext_limit() {
        let payload = AnnouncementPayload::new(
            ephemeral(),
            1,
            vec![U256::ZERO; MAX_CIPHERTEXT_WORDS + 1],
        );
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_record_id_normalization() {
        assert_eq!(RecordId::new(" 0xAB ", 5), RecordId::new("0xab", 5));
        assert_ne!(RecordId::new("0xab", 5), RecordId::new("0xab", 6));
        assert_eq!(RecordId::new("0xAB", 5).to_string(), "0xab@5");
    }

    #[test]
    fn test_stats() {
        let mut stats = AnnouncementStats::new();
        for (block, tag) in [(7u64, 0x42u8), (3, 0x42), (9, 0x01)] {
            let record = AnnouncementBuilder::new()
                .ephemeral_pub(ephemeral())
                .view_tag(tag)
                .block_number(block)
                .tx_hash(format!("0x{:x}", block))
                .build()
                .unwrap();
            stats.add(&record);
        }

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.view_tag_distribution[0x42], 2);
        assert_eq!(stats.first_block, Some(3));
        assert_eq!(stats.last_block, Some(9));
        assert_eq!(stats.undisclosed_amount_count, 3);
    }

    #[test]
    fn test_record_serde() {
        let record = AnnouncementBuilder::new()
            .ephemeral_pub(ephemeral())
            .view_tag(9)
            .ciphertext(vec![U256::from_u64(77)])
            .block_number(4)
            .tx_hash("0x4")
            .build()
            .unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: AnnouncementRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
