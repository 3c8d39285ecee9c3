//! # StealthFlow Cryptography
//!
//! secp256k1 stealth address primitives for the StealthFlow protocol.
//!
//! This crate provides:
//!
//! - **EC**: key generation, scalar multiplication, point addition
//! - **Hash**: Keccak-256, `starknet_keccak` and Pedersen element hashing
//! - **View Tags**: shared secret hashing for fast scanning
//! - **Derivation**: sender derivation and recipient matching
//! - **Metadata**: amount encryption keyed by the shared secret
//! - **Address**: deterministic stealth account addresses
//!
//! ## Security Properties
//!
//! - Curve arithmetic and view tag comparison are constant-time
//! - Private keys and shared secret hashes are zeroized on drop
//! - Domain separators keep the metadata mask apart from key derivation
//!
//! ## Example
//!
//! ```rust
//! use stealthflow_crypto::{
//!     check_stealth_payment, compute_stealth_priv_key, generate_keypair,
//!     generate_stealth_address, StealthMatch,
//! };
//!
//! let view = generate_keypair()?;
//! let spend = generate_keypair()?;
//!
//! // Sender derives a one-time address
//! let stealth = generate_stealth_address(&view.public_key, &spend.public_key)?;
//!
//! // Recipient checks the announcement and rebuilds the key
//! if let StealthMatch::Match(shared) =
//!     check_stealth_payment(&view.private_key, &stealth.ephemeral_pub, stealth.view_tag)?
//! {
//!     let key = compute_stealth_priv_key(&spend.private_key, &shared.hash)?;
//!     assert_eq!(key.public_key()?, stealth.stealth_pub);
//! }
//! # Ok::<(), stealthflow_core::StealthFlowError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod address;
pub mod derive;
pub mod ec;
pub mod hash;
pub mod metadata;
pub mod view_tag;

// Re-export main functions at crate root
pub use address::{derive_account_address, AccountDeployment};
pub use derive::{
    check_stealth_payment, compute_stealth_priv_key, derive_stealth_pub, generate_stealth_address,
    generate_stealth_address_with, verify_stealth_key, SharedSecret, StealthAddress, StealthMatch,
};
pub use ec::{generate_keypair, generate_keypair_with, get_public_key, point_add, point_mul};
pub use hash::{keccak256, starknet_keccak};
pub use metadata::{decrypt_metadata, encrypt_metadata};
pub use view_tag::{compute_view_tag, SharedSecretHash};
