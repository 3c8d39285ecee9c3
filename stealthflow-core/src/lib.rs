//! # StealthFlow Core
//!
//! Core types, errors, and traits for the StealthFlow stealth address protocol.
//!
//! This crate provides the foundational building blocks used by all other StealthFlow crates:
//!
//! - **Types**: Keys, points, meta-addresses, announcements and discovered funds
//! - **Errors**: One error enum with classification helpers
//! - **Constants**: Curve, protocol and Starknet constants
//! - **Event codec**: Cairo layout of the `Announcement` event
//! - **Units**: Token amount formatting and parsing
//! - **Traits**: Ledger, balance and claim collaborators
//!
//! ## Example
//!
//! ```rust
//! use stealthflow_core::{MetaAddress, TokenUnits, U256};
//!
//! let units = TokenUnits::default();
//! let wei = units.parse("1.5").unwrap();
//! assert_eq!(units.format(&wei), "1.5000");
//!
//! assert!(MetaAddress::parse("st:starknet:0x1,0x2").is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;
pub mod units;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, StealthFlowError};
pub use event::{
    decode_announcement_event, decode_ephemeral_pubkey, encode_announce_calldata,
    encode_announcement_event, RawEvent,
};
pub use traits::*;
pub use types::*;
pub use units::TokenUnits;
