//! Stealth account address derivation.
//!
//! Each stealth public key controls a Starknet account whose address is fixed
//! before deployment:
//!
//! ```text
//! salt     = stealth_pub.x mod 2^251
//! calldata = [x_low, x_high, y_low, y_high]
//! address  = H("STARKNET_CONTRACT_ADDRESS", deployer, salt, class_hash, H(calldata))
//!            mod (2^251 - 256)
//! ```
//!
//! `H` is Starknet's `compute_hash_on_elements` (a Pedersen chain closed with
//! the element count). The deployer defaults to the Universal Deployer.

use stealthflow_core::constants::{
    DOMAIN_CONTRACT_ADDRESS, L2_ADDRESS_UPPER_BOUND, LEGACY_ADDRESS_HEX_CHARS,
    STARKNET_ADDRESS_BITS, STEALTH_ACCOUNT_CLASS_HASH, UDC_ADDRESS,
};
use stealthflow_core::error::Result;
use stealthflow_core::types::{Point, StealthAccountAddress, U256};

use crate::hash::hash_on_elements;

/// Parameters of the stealth account deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountDeployment {
    /// Class hash of the stealth account contract
    pub class_hash: U256,
    /// Deployer address; zero when the account deploys itself
    pub deployer: U256,
}

impl Default for AccountDeployment {
    fn default() -> Self {
        Self {
            class_hash: STEALTH_ACCOUNT_CLASS_HASH,
            deployer: UDC_ADDRESS,
        }
    }
}

impl AccountDeployment {
    /// Uses a custom class hash with the default deployer.
    pub fn with_class_hash(class_hash: U256) -> Self {
        Self {
            class_hash,
            ..Self::default()
        }
    }

    /// Default class hash with a zero deployer (`deploy_account` or a
    /// non-unique UDC deployment).
    pub fn self_deployed() -> Self {
        Self {
            deployer: U256::ZERO,
            ..Self::default()
        }
    }

    /// Constructor calldata for a stealth public key.
    pub fn constructor_calldata(stealth_pub: &Point) -> [U256; 4] {
        stealth_pub.to_split_words()
    }

    /// Derives the account address for a stealth public key.
    pub fn derive_address(&self, stealth_pub: &Point) -> Result<StealthAccountAddress> {
        derive_account_address(stealth_pub, self)
    }
}

/// Derives the deterministic account address for a stealth public key.
///
/// Fails if the class hash or deployer is not a Stark field element.
pub fn derive_account_address(
    stealth_pub: &Point,
    deployment: &AccountDeployment,
) -> Result<StealthAccountAddress> {
    let salt = stealth_pub.x().mask_bits(STARKNET_ADDRESS_BITS);
    let calldata_hash = hash_on_elements(&AccountDeployment::constructor_calldata(stealth_pub))?;
    let prefix = U256::from_be_slice(DOMAIN_CONTRACT_ADDRESS)?;

    let hash = hash_on_elements(&[
        prefix,
        deployment.deployer,
        salt,
        deployment.class_hash,
        calldata_hash,
    ])?;

    // The hash is below the Stark prime, so one subtraction reduces it.
    let address = if hash >= L2_ADDRESS_UPPER_BOUND {
        U256::from_biguint(&(hash.to_biguint() - L2_ADDRESS_UPPER_BOUND.to_biguint()))?
    } else {
        hash
    };

    StealthAccountAddress::new(address)
}

/// Truncates the x coordinate's hex form to fit a felt.
///
/// Two keys can collide under truncation and the result is not the deployed
/// account address.
#[deprecated(note = "use derive_account_address")]
pub fn legacy_truncated_address(stealth_pub: &Point) -> Result<StealthAccountAddress> {
    let hex = stealth_pub.x().to_hex();
    let digits = hex.trim_start_matches("0x");
    let kept = &digits[..digits.len().min(LEGACY_ADDRESS_HEX_CHARS)];
    StealthAccountAddress::parse(&format!("0x{}", kept))
}
