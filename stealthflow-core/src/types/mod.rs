//! Domain types for StealthFlow.
//!
//! - [`U256`]: Fixed-width on-chain integer
//! - [`Point`], [`PrivateKey`], [`KeyPair`]: secp256k1 key material
//! - [`MetaAddress`]: Published address for receiving private payments
//! - [`AnnouncementRecord`]: Published ephemeral key, view tag and ciphertext
//! - [`DiscoveredFund`]: A payment found by the recipient

mod address;
mod announcement;
mod fund;
mod keys;
mod word;

pub use address::*;
pub use announcement::*;
pub use fund::*;
pub use keys::*;
pub use word::*;
