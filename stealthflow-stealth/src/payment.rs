//! Stealth payment creation (sender side).

use serde::{Deserialize, Serialize};
use tracing::debug;

use stealthflow_core::constants::STRK_TOKEN_ADDRESS;
use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::types::{AnnouncementPayload, MetaAddress, Point, StealthAccountAddress, U256};
use stealthflow_crypto::metadata::encrypt_metadata;
use stealthflow_crypto::{derive_account_address, generate_stealth_address, AccountDeployment};

/// Stealth payment: address to send to and announcement to publish.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StealthPayment {
    /// The one-time public key controlling the funds
    pub stealth_pub: Point,
    /// The stealth account to send funds to
    pub stealth_address: StealthAccountAddress,
    /// The announcement to publish (ephemeral key, view tag, encrypted amount)
    pub announcement: AnnouncementPayload,
    /// Amount encrypted into the announcement, if any
    pub amount: Option<U256>,
    /// Token being sent
    pub token: U256,
}

/// Creates a stealth payment with the default deployment and token.
///
/// With `amount == None` the announcement carries no ciphertext and the
/// recipient falls back to a balance lookup.
pub fn create_stealth_payment(meta_address: &MetaAddress, amount: Option<U256>) -> Result<StealthPayment> {
    let builder = StealthPaymentBuilder::new().recipient(*meta_address);
    match amount {
        Some(amount) => builder.amount(amount).build(),
        None => builder.build(),
    }
}

/// Builder for stealth payments with optional fields.
#[derive(Default)]
pub struct StealthPaymentBuilder {
    meta_address: Option<MetaAddress>,
    amount: Option<U256>,
    token: Option<U256>,
    deployment: Option<AccountDeployment>,
    scheme_id: Option<U256>,
}

impl StealthPaymentBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recipient meta-address (required).
    pub fn recipient(mut self, meta_address: MetaAddress) -> Self {
        self.meta_address = Some(meta_address);
        self
    }

    /// Sets the amount to encrypt into the announcement.
    pub fn amount(mut self, amount: U256) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the token contract (defaults to STRK).
    pub fn token(mut self, token: U256) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets the account deployment used for the stealth address.
    pub fn deployment(mut self, deployment: AccountDeployment) -> Self {
        self.deployment = Some(deployment);
        self
    }

    /// Overrides the scheme id.
    pub fn scheme_id(mut self, id: U256) -> Self {
        self.scheme_id = Some(id);
        self
    }

    /// Derives the stealth address and builds the announcement.
    pub fn build(self) -> Result<StealthPayment> {
        let meta_address = self
            .meta_address
            .ok_or_else(|| StealthFlowError::ValidationError("recipient meta-address is required".into()))?;
        let deployment = self.deployment.unwrap_or_default();

        let stealth = generate_stealth_address(&meta_address.view_pub, &meta_address.spend_pub)?;
        let ciphertext = match self.amount {
            Some(amount) => encrypt_metadata(stealth.shared_x(), amount),
            None => Vec::new(),
        };
        let stealth_address = derive_account_address(&stealth.stealth_pub, &deployment)?;

        let mut announcement = AnnouncementPayload::new(stealth.ephemeral_pub, stealth.view_tag, ciphertext);
        if let Some(scheme_id) = self.scheme_id {
            announcement.scheme_id = scheme_id;
        }
        announcement.validate()?;

        debug!(
            stealth_address = %stealth_address,
            view_tag = stealth.view_tag,
            amount_disclosed = self.amount.is_some(),
            "created stealth payment"
        );

        // `stealth` drops here, zeroizing the ephemeral private key
        Ok(StealthPayment {
            stealth_pub: stealth.stealth_pub,
            stealth_address,
            announcement,
            amount: self.amount,
            token: self.token.unwrap_or(STRK_TOKEN_ADDRESS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealthflow_core::types::{DecryptedAmount, PrivateKey, RecipientKeys};
    use stealthflow_crypto::metadata::decrypt_metadata;
    use stealthflow_crypto::{check_stealth_payment, compute_stealth_priv_key, StealthMatch};

    fn recipient() -> RecipientKeys {
        RecipientKeys::from_private_keys(
            PrivateKey::from_hex("0x1111").unwrap(),
            PrivateKey::from_hex("0x2222").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_stealth_payment() {
        let keys = recipient();
        let amount = U256::from_u128(2_500_000_000_000_000_000);
        let payment = create_stealth_payment(&keys.meta_address(), Some(amount)).unwrap();

        assert_eq!(payment.announcement.ciphertext.len(), 1);
        assert_eq!(payment.amount, Some(amount));
        assert_eq!(payment.token, STRK_TOKEN_ADDRESS);
        assert!(payment.announcement.validate().is_ok());
    }

    #[test]
    fn test_recipient_recovers_payment() {
        let keys = recipient();
        let amount = U256::from_u64(42);
        let payment = create_stealth_payment(&keys.meta_address(), Some(amount)).unwrap();
        let ann = &payment.announcement;

        let StealthMatch::Match(shared) =
            check_stealth_payment(keys.view_private(), &ann.ephemeral_pub, ann.view_tag).unwrap()
        else {
            panic!("recipient must match");
        };

        let stealth_priv = compute_stealth_priv_key(keys.spend_private(), &shared.hash).unwrap();
        assert_eq!(stealth_priv.public_key().unwrap(), payment.stealth_pub);
        assert_eq!(
            decrypt_metadata(shared.x(), &ann.ciphertext),
            DecryptedAmount::Known(amount)
        );
        assert_eq!(
            derive_account_address(&payment.stealth_pub, &AccountDeployment::default()).unwrap(),
            payment.stealth_address
        );
    }

    #[test]
    fn test_payment_without_amount() {
        let payment = create_stealth_payment(&recipient().meta_address(), None).unwrap();
        assert!(payment.announcement.ciphertext.is_empty());
        assert_eq!(payment.amount, None);
    }

    #[test]
    fn test_each_payment_is_unlinkable() {
        let meta = recipient().meta_address();
        let a = create_stealth_payment(&meta, None).unwrap();
        let b = create_stealth_payment(&meta, None).unwrap();

        assert_ne!(a.stealth_address, b.stealth_address);
        assert_ne!(a.announcement.ephemeral_pub, b.announcement.ephemeral_pub);
    }

    #[test]
    fn test_payment_builder() {
        let deployment = AccountDeployment::with_class_hash(U256::from_u64(0xC1A55));
        let payment = StealthPaymentBuilder::new()
            .recipient(recipient().meta_address())
            .amount(U256::from_u64(100))
            .token(U256::from_u64(0xE7))
            .deployment(deployment)
            .scheme_id(U256::from_u64(2))
            .build()
            .unwrap();

        assert_eq!(payment.token, U256::from_u64(0xE7));
        assert_eq!(payment.announcement.scheme_id, U256::from_u64(2));
        assert_eq!(
            deployment.derive_address(&payment.stealth_pub).unwrap(),
            payment.stealth_address
        );
    }

    #[test]
    fn test_payment_builder_missing_recipient() {
        let result = StealthPaymentBuilder::new().amount(U256::from_u64(1)).build();
        assert!(matches!(result, Err(StealthFlowError::ValidationError(_))));
    }

    #[test]
    fn test_payment_serialization() {
        let payment = create_stealth_payment(&recipient().meta_address(), Some(U256::from_u64(7))).unwrap();

        let json = serde_json::to_string(&payment).unwrap();
        let restored: StealthPayment = serde_json::from_str(&json).unwrap();
        assert_eq!(payment.stealth_address, restored.stealth_address);
        assert_eq!(payment.announcement, restored.announcement);
    }
}
