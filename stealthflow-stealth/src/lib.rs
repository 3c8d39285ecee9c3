//! # StealthFlow Stealth Address Protocol
//!
//! High-level API for creating and discovering stealth payments.
//!
//! This crate provides:
//!
//! - **Wallet**: recipient key sets, meta-addresses and key files
//! - **Payments**: one-time addresses plus the announcement to publish
//! - **Discovery**: scanning announcements for incoming payments
//!
//! ## Quick Start
//!
//! ```rust
//! use stealthflow_core::types::{AnnouncementRecord, U256};
//! use stealthflow_stealth::{create_stealth_payment, DiscoveryContext, StealthWallet};
//!
//! // Recipient: generate keys and publish the meta-address
//! let wallet = StealthWallet::generate()?;
//! let meta_address = wallet.meta_address().to_meta_string();
//!
//! // Sender: create a payment for 1 STRK
//! let payment = create_stealth_payment(&meta_address.parse()?, Some(U256::from_u128(10u128.pow(18))))?;
//! // Send funds to payment.stealth_address, publish payment.announcement
//!
//! // Recipient: discover payments
//! let record = AnnouncementRecord::from_payload(payment.announcement, U256::ZERO, 1, "0x1");
//! let (funds, _stats) = wallet.scan(&[record], &DiscoveryContext::default());
//! assert_eq!(funds[0].stealth_address, payment.stealth_address);
//! # Ok::<(), stealthflow_core::StealthFlowError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod discovery;
pub mod payment;
pub mod wallet;

pub use discovery::{scan_announcement, scan_announcements, DiscoveryContext, ScanResult, ScanStats};
pub use payment::{create_stealth_payment, StealthPayment, StealthPaymentBuilder};
pub use wallet::{DiscoveredKeys, KeyFile, StealthWallet, WalletConfig};
