//! Interfaces to the collaborators around the stealth core.
//!
//! The core never talks to a chain directly. Ledger access, balance queries
//! and claim execution are injected through these traits so the same
//! scanner runs against an RPC node, an indexer or an in-memory ledger.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AnnouncementPayload, AnnouncementRecord, ClaimRequest, RecordId, StealthAccountAddress, U256,
};

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER READ
// ═══════════════════════════════════════════════════════════════════════════════

/// Read access to published announcements.
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    /// Highest block the source can serve.
    async fn latest_block(&self) -> Result<u64>;

    /// Announcements in `[from_block, to_block]`, in ledger order.
    ///
    /// Failures should use a recoverable error so scanners retry the range.
    async fn fetch_announcements(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<AnnouncementRecord>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER WRITE
// ═══════════════════════════════════════════════════════════════════════════════

/// Write access used by senders.
#[async_trait]
pub trait AnnouncementWriter: Send + Sync {
    /// Emits a new announcement on behalf of `caller`.
    ///
    /// Returns the identity of the stored record.
    async fn announce(&self, payload: AnnouncementPayload, caller: U256) -> Result<RecordId>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCES & CLAIMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Token balance queries, used when an announcement carries no amount.
#[async_trait]
pub trait BalanceLookup: Send + Sync {
    /// Current balance of `address` in token base units.
    async fn balance_of(&self, address: &StealthAccountAddress) -> Result<U256>;
}

/// Moves funds out of a stealth account.
#[async_trait]
pub trait ClaimExecutor: Send + Sync {
    /// Executes the claim and returns a transaction reference.
    async fn execute_claim(&self, request: &ClaimRequest) -> Result<String>;
}
