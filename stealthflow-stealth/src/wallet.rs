//! StealthFlow wallet implementation.
//!
//! The wallet manages the recipient's key pairs and provides high-level
//! operations for receiving stealth payments.

use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use stealthflow_core::constants::PROTOCOL_VERSION;
use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::types::{
    AnnouncementRecord, DecryptedAmount, DiscoveredFund, MetaAddress, Point, PrivateKey, RecipientKeys, U256,
};
use stealthflow_crypto::generate_keypair;
use stealthflow_crypto::metadata::decrypt_metadata;
use stealthflow_crypto::{check_stealth_payment, compute_stealth_priv_key, StealthMatch};

use crate::discovery::{scan_announcements, DiscoveryContext, ScanStats};

/// Configuration for wallet creation.
#[derive(Clone, Debug, Default)]
pub struct WalletConfig {
    /// Optional label shown by tooling
    pub label: Option<String>,
}

/// Key material recovered for one announcement.
#[derive(Clone, Debug)]
pub struct DiscoveredKeys {
    /// One-time public key
    pub stealth_pub: Point,
    /// Its private key (sensitive)
    pub stealth_priv: PrivateKey,
    /// Decrypted amount
    pub amount: DecryptedAmount,
}

/// A StealthFlow wallet containing keys for receiving private payments.
///
/// The wallet holds:
/// - Viewing keys: for scanning announcements
/// - Spending keys: for reconstructing stealth private keys
pub struct StealthWallet {
    keys: RecipientKeys,
    meta_address: MetaAddress,
    config: WalletConfig,
}

impl StealthWallet {
    /// Generates a new wallet with random keys.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stealthflow_stealth::StealthWallet;
    ///
    /// let wallet = StealthWallet::generate()?;
    /// println!("Meta-address: {}", wallet.meta_address());
    /// # Ok::<(), stealthflow_core::StealthFlowError>(())
    /// ```
    pub fn generate() -> Result<Self> {
        Self::generate_with_config(WalletConfig::default())
    }

    /// Generates a new wallet with custom configuration.
    pub fn generate_with_config(config: WalletConfig) -> Result<Self> {
        let view = generate_keypair()?;
        let spend = generate_keypair()?;
        let keys = RecipientKeys { view, spend };

        Ok(Self {
            meta_address: keys.meta_address(),
            keys,
            config,
        })
    }

    /// Creates a wallet from existing private keys.
    pub fn from_private_keys(view: PrivateKey, spend: PrivateKey) -> Result<Self> {
        let keys = RecipientKeys::from_private_keys(view, spend)?;
        Ok(Self {
            meta_address: keys.meta_address(),
            keys,
            config: WalletConfig::default(),
        })
    }

    /// Returns the meta-address for publishing.
    pub fn meta_address(&self) -> &MetaAddress {
        &self.meta_address
    }

    /// Returns the full key set.
    pub fn keys(&self) -> &RecipientKeys {
        &self.keys
    }

    /// Returns the wallet label, if any.
    pub fn label(&self) -> Option<&str> {
        self.config.label.as_deref()
    }

    /// Attempts to discover a payment from announcement fields.
    ///
    /// # Returns
    ///
    /// `Ok(Some(DiscoveredKeys))` if the view tag matches
    /// `Ok(None)` if the view tag doesn't match
    /// `Err(_)` if a curve operation fails
    pub fn try_discover(
        &self,
        ephemeral_pub: &Point,
        view_tag: u8,
        ciphertext: &[U256],
    ) -> Result<Option<DiscoveredKeys>> {
        let shared = match check_stealth_payment(self.keys.view_private(), ephemeral_pub, view_tag)? {
            StealthMatch::NoMatch => return Ok(None),
            StealthMatch::Match(shared) => shared,
        };

        let stealth_priv = compute_stealth_priv_key(self.keys.spend_private(), &shared.hash)?;
        Ok(Some(DiscoveredKeys {
            stealth_pub: stealth_priv.public_key()?,
            amount: decrypt_metadata(shared.x(), ciphertext),
            stealth_priv,
        }))
    }

    /// Scans records without deduplication or balance lookups.
    pub fn scan(&self, records: &[AnnouncementRecord], ctx: &DiscoveryContext) -> (Vec<DiscoveredFund>, ScanStats) {
        scan_announcements(records, &self.keys, ctx)
    }

    /// Exports the private keys for storage.
    pub fn to_key_file(&self) -> KeyFile {
        KeyFile {
            version: PROTOCOL_VERSION,
            view_private_key: self.keys.view_private().to_hex(),
            spend_private_key: self.keys.spend_private().to_hex(),
        }
    }

    /// Restores a wallet from a key file.
    pub fn from_key_file(file: &KeyFile) -> Result<Self> {
        if file.version != PROTOCOL_VERSION {
            return Err(StealthFlowError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: file.version,
            });
        }
        Self::from_private_keys(
            PrivateKey::from_hex(&file.view_private_key)?,
            PrivateKey::from_hex(&file.spend_private_key)?,
        )
    }
}

impl std::fmt::Debug for StealthWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthWallet")
            .field("meta_address", &self.meta_address)
            .field("config", &self.config)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// Serializable key file (plain hex keys, keep it private).
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyFile {
    /// Version for forward compatibility
    pub version: u8,
    /// Viewing private key (hex)
    pub view_private_key: String,
    /// Spending private key (hex)
    pub spend_private_key: String,
}

impl KeyFile {
    /// Reads a key file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = zeroize::Zeroizing::new(std::fs::read_to_string(path)?);
        Ok(serde_json::from_str(&data)?)
    }

    /// Writes the key file to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = zeroize::Zeroizing::new(serde_json::to_string_pretty(self)?);
        std::fs::write(path, data.as_bytes())?;
        Ok(())
    }
}

impl std::fmt::Debug for KeyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFile")
            .field("version", &self.version)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::create_stealth_payment;

    #[test]
    fn test_wallet_generation() {
        let wallet = StealthWallet::generate().unwrap();
        let parsed = MetaAddress::parse(&wallet.meta_address().to_meta_string()).unwrap();
        assert_eq!(&parsed, wallet.meta_address());
    }

    #[test]
    fn test_wallet_with_config() {
        let config = WalletConfig {
            label: Some("savings".into()),
        };
        let wallet = StealthWallet::generate_with_config(config).unwrap();
        assert_eq!(wallet.label(), Some("savings"));
    }

    #[test]
    fn test_wallet_try_discover_match() {
        let wallet = StealthWallet::generate().unwrap();
        let payment = create_stealth_payment(wallet.meta_address(), Some(U256::from_u64(900))).unwrap();
        let ann = &payment.announcement;

        let found = wallet
            .try_discover(&ann.ephemeral_pub, ann.view_tag, &ann.ciphertext)
            .unwrap()
            .unwrap();

        assert_eq!(found.stealth_pub, payment.stealth_pub);
        assert_eq!(found.amount, DecryptedAmount::Known(U256::from_u64(900)));
    }

    #[test]
    fn test_wallet_try_discover_wrong_tag() {
        let wallet = StealthWallet::generate().unwrap();
        let payment = create_stealth_payment(wallet.meta_address(), None).unwrap();
        let ann = &payment.announcement;

        let result = wallet
            .try_discover(&ann.ephemeral_pub, ann.view_tag.wrapping_add(1), &ann.ciphertext)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_wallet_try_discover_wrong_key() {
        let wallet1 = StealthWallet::generate().unwrap();
        let wallet2 = StealthWallet::generate().unwrap();
        let payment = create_stealth_payment(wallet1.meta_address(), None).unwrap();
        let ann = &payment.announcement;

        // On a 1/256 view tag collision the rebuilt key still differs
        if let Some(found) = wallet2.try_discover(&ann.ephemeral_pub, ann.view_tag, &ann.ciphertext).unwrap() {
            assert_ne!(found.stealth_pub, payment.stealth_pub);
        }
    }

    #[test]
    fn test_key_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");

        let wallet = StealthWallet::generate().unwrap();
        wallet.to_key_file().save(&path).unwrap();

        let restored = StealthWallet::from_key_file(&KeyFile::load(&path).unwrap()).unwrap();
        assert_eq!(restored.meta_address(), wallet.meta_address());
    }

    #[test]
    fn test_key_file_version_checked() {
        let mut file = StealthWallet::generate().unwrap().to_key_file();
        file.version = PROTOCOL_VERSION + 1;
        assert!(matches!(
            StealthWallet::from_key_file(&file),
            Err(StealthFlowError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let wallet = StealthWallet::generate().unwrap();
        let file = wallet.to_key_file();
        assert!(!format!("{:?}", file).contains(&file.view_private_key));
        assert!(format!("{:?}", wallet).contains("[REDACTED]"));
    }
}
