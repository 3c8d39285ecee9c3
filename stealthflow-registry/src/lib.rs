//! # StealthFlow Registry
//!
//! Announcement storage and token balances for the StealthFlow protocol.
//!
//! This crate provides local stand-ins for the on-chain collaborators:
//!
//! - **Memory**: fast in-memory announcement ledger for development and testing
//! - **File**: persistent ledger for the CLI and single-node deployments
//! - **Ledger**: token balances and claim execution
//!
//! ## Example
//!
//! ```rust
//! use stealthflow_core::traits::{AnnouncementSource, AnnouncementWriter};
//! use stealthflow_core::types::{AnnouncementPayload, PrivateKey, U256};
//! use stealthflow_registry::MemoryRegistry;
//!
//! # tokio_test::block_on(async {
//! let registry = MemoryRegistry::new();
//! let ephemeral = PrivateKey::from_hex("0x42")?.public_key()?;
//!
//! // Publish an announcement
//! let id = registry.announce(AnnouncementPayload::new(ephemeral, 0x42, vec![]), U256::ZERO).await?;
//!
//! // Fetch a block range
//! let records = registry.fetch_announcements(0, id.block_number).await?;
//! assert_eq!(records.len(), 1);
//! # Ok::<(), stealthflow_core::StealthFlowError>(())
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod ledger;
mod memory;

pub use file::FileRegistry;
pub use ledger::MemoryLedger;
pub use memory::{announcement_selector, MemoryRegistry};
