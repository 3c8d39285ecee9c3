//! Recipient-side results of a successful scan.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StealthFlowError};
use crate::types::address::StealthAccountAddress;
use crate::types::announcement::RecordId;
use crate::types::keys::{Point, PrivateKey};
use crate::types::word::U256;

/// Amount recovered from an announcement's ciphertext.
///
/// `Unknown` means the sender did not encrypt an amount; it is never
/// reported as zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum DecryptedAmount {
    /// Amount in token base units
    Known(U256),
    /// No amount was encrypted; consult the balance instead
    Unknown,
}

impl DecryptedAmount {
    /// Returns the amount if known.
    pub fn known(&self) -> Option<U256> {
        match self {
            DecryptedAmount::Known(amount) => Some(*amount),
            DecryptedAmount::Unknown => None,
        }
    }

    /// Returns true if no amount was encrypted.
    pub fn is_unknown(&self) -> bool {
        matches!(self, DecryptedAmount::Unknown)
    }
}

/// A payment the recipient has found and can spend.
///
/// Holds the stealth private key, so it must stay inside the recipient's
/// process. The key is skipped when serialized.
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveredFund {
    /// Announcement this fund came from
    pub record_id: RecordId,
    /// One-time public key controlling the funds
    pub stealth_pub: Point,
    /// Private key for `stealth_pub` (sensitive)
    #[serde(skip_serializing)]
    pub stealth_priv: PrivateKey,
    /// Starknet account derived from `stealth_pub`
    pub stealth_address: StealthAccountAddress,
    /// Sender's ephemeral public key
    pub ephemeral_pub: Point,
    /// Decrypted amount
    pub amount: DecryptedAmount,
    /// Balance read from the ledger when the amount was unknown
    pub observed_balance: Option<U256>,
    /// Token contract the scanner was watching
    pub token: U256,
}

impl DiscoveredFund {
    /// Transaction that carried the announcement.
    pub fn tx_hash(&self) -> &str {
        &self.record_id.tx_hash
    }

    /// Block that carried the announcement.
    pub fn block_number(&self) -> u64 {
        self.record_id.block_number
    }

    /// Best known amount: decrypted, else observed balance.
    pub fn claimable_amount(&self) -> Option<U256> {
        self.amount.known().or(self.observed_balance)
    }
}

/// Everything a claim executor needs to sweep a stealth account.
#[derive(Clone, Debug)]
pub struct ClaimRequest {
    /// Account holding the funds
    pub stealth_address: StealthAccountAddress,
    /// Key controlling the account (sensitive)
    pub stealth_priv: PrivateKey,
    /// Where the funds go
    pub destination: U256,
    /// Token contract
    pub token: U256,
    /// Amount to move, in base units
    pub amount: U256,
}

impl ClaimRequest {
    /// Builds a claim for the full known amount of `fund`.
    ///
    /// # Errors
    /// Returns `ValidationError` if neither the decrypted amount nor an
    /// observed balance is available, or the amount is zero.
    pub fn from_fund(fund: &DiscoveredFund, destination: U256) -> Result<Self> {
        let amount = fund.claimable_amount().ok_or_else(|| {
            StealthFlowError::ValidationError(format!(
                "amount of {} is unknown; look up the balance of {} first",
                fund.record_id, fund.stealth_address
            ))
        })?;

        if amount.is_zero() {
            return Err(StealthFlowError::ValidationError(format!(
                "nothing to claim at {}",
                fund.stealth_address
            )));
        }

        Ok(Self {
            stealth_address: fund.stealth_address,
            stealth_priv: fund.stealth_priv.clone(),
            destination,
            token: fund.token,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fund(amount: DecryptedAmount, observed: Option<U256>) -> DiscoveredFund {
        let key = PrivateKey::from_hex("0x77").unwrap();
        let point = key.public_key().unwrap();
        DiscoveredFund {
            record_id: RecordId::new("0x1", 1),
            stealth_pub: point,
            stealth_priv: key,
            stealth_address: StealthAccountAddress::parse("0x99").unwrap(),
            ephemeral_pub: point,
            amount,
            observed_balance: observed,
            token: U256::from_u64(5),
        }
    }

    #[test]
    fn test_unknown_is_not_zero() {
        assert_ne!(DecryptedAmount::Unknown, DecryptedAmount::Known(U256::ZERO));
        assert_eq!(DecryptedAmount::Unknown.known(), None);
        assert!(DecryptedAmount::Unknown.is_unknown());
    }

    #[test]
    fn test_claim_from_known_amount() {
        let f = fund(DecryptedAmount::Known(U256::from_u64(10)), None);
        let claim = ClaimRequest::from_fund(&f, U256::from_u64(3)).unwrap();
        assert_eq!(claim.amount, U256::from_u64(10));
        assert_eq!(claim.token, U256::from_u64(5));
    }

    #[test]
    fn test_claim_falls_back_to_balance() {
        let f = fund(DecryptedAmount::Unknown, Some(U256::from_u64(4)));
        let claim = ClaimRequest::from_fund(&f, U256::from_u64(3)).unwrap();
        assert_eq!(claim.amount, U256::from_u64(4));

        let f = fund(DecryptedAmount::Unknown, None);
        assert!(ClaimRequest::from_fund(&f, U256::from_u64(3)).is_err());

        let f = fund(DecryptedAmount::Known(U256::ZERO), None);
        assert!(ClaimRequest::from_fund(&f, U256::from_u64(3)).is_err());
    }

    #[test]
    fn test_serialized_fund_has_no_key() {
        let f = fund(DecryptedAmount::Known(U256::from_u64(1)), None);
        let json = serde_json::to_string(&f).unwrap();
        assert!(!json.contains("stealth_priv"));
        assert!(json.contains("\"status\":\"known\""));
    }
}
