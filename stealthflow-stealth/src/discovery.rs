//! Payment discovery (recipient scan).
//!
//! Per announcement:
//!
//! 1. view tag check (one scalar multiplication, one hash)
//! 2. on match, rebuild the stealth key, decrypt the amount and derive the
//!    stealth account address
//!
//! Discovery is pure; deduplication and balance lookups belong to the
//! scanner that owns the session.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use stealthflow_core::constants::{SCHEME_ID_SECP256K1, STRK_TOKEN_ADDRESS};
use stealthflow_core::error::StealthFlowError;
use stealthflow_core::types::{AnnouncementRecord, DiscoveredFund, RecipientKeys, U256};
use stealthflow_crypto::metadata::decrypt_metadata;
use stealthflow_crypto::{
    check_stealth_payment, compute_stealth_priv_key, derive_account_address, get_public_key,
    AccountDeployment, StealthMatch,
};

/// Settings shared by every announcement in a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscoveryContext {
    /// Deployment used to derive stealth account addresses
    pub deployment: AccountDeployment,
    /// Token contract reported on discovered funds
    pub token: U256,
}

impl Default for DiscoveryContext {
    fn default() -> Self {
        Self {
            deployment: AccountDeployment::default(),
            token: STRK_TOKEN_ADDRESS,
        }
    }
}

/// Result of scanning a single announcement.
#[derive(Debug)]
pub enum ScanResult {
    /// View tag didn't match - not for this recipient
    NotForUs,
    /// View tag matched - payment discovered
    Discovered(Box<DiscoveredFund>),
    /// The announcement could not be processed
    Failed(StealthFlowError),
}

impl ScanResult {
    /// Returns true if a payment was discovered.
    pub fn is_discovered(&self) -> bool {
        matches!(self, ScanResult::Discovered(_))
    }

    /// Returns the discovered fund if present.
    pub fn into_fund(self) -> Option<DiscoveredFund> {
        match self {
            ScanResult::Discovered(fund) => Some(*fund),
            _ => None,
        }
    }
}

/// Statistics for scanning operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Total announcements scanned
    pub total: u64,
    /// Announcements rejected by the view tag
    pub filtered: u64,
    /// View tag matches
    pub matches: u64,
    /// Announcements that failed to process
    pub errors: u64,
    /// Time spent scanning in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scan result.
    pub fn record(&mut self, result: &ScanResult) {
        self.total += 1;
        match result {
            ScanResult::NotForUs => self.filtered += 1,
            ScanResult::Discovered(_) => self.matches += 1,
            ScanResult::Failed(_) => self.errors += 1,
        }
    }

    /// Adds another run's counters to this one.
    pub fn merge(&mut self, other: &ScanStats) {
        self.total += other.total;
        self.filtered += other.filtered;
        self.matches += other.matches;
        self.errors += other.errors;
        self.duration_ms += other.duration_ms;
    }

    /// Returns the scan rate (announcements per second).
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total as f64 / self.duration_ms as f64) * 1000.0
        }
    }

    /// Returns the filter efficiency (percentage of announcements filtered).
    pub fn filter_efficiency(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.filtered as f64 / self.total as f64) * 100.0
        }
    }
}

/// Scans one announcement for `keys`.
pub fn scan_announcement(
    record: &AnnouncementRecord,
    keys: &RecipientKeys,
    ctx: &DiscoveryContext,
) -> ScanResult {
    if record.scheme_id != U256::from_u64(SCHEME_ID_SECP256K1) {
        trace!(record = %record.id(), scheme = %record.scheme_id, "skipping foreign scheme");
        return ScanResult::NotForUs;
    }

    let shared = match check_stealth_payment(keys.view_private(), &record.ephemeral_pub, record.view_tag) {
        Ok(StealthMatch::NoMatch) => return ScanResult::NotForUs,
        Ok(StealthMatch::Match(shared)) => shared,
        Err(e) => return ScanResult::Failed(e),
    };

    let stealth_priv = match compute_stealth_priv_key(keys.spend_private(), &shared.hash) {
        Ok(k) => k,
        Err(e) => return ScanResult::Failed(e),
    };
    let stealth_pub = match get_public_key(&stealth_priv) {
        Ok(p) => p,
        Err(e) => return ScanResult::Failed(e),
    };
    let stealth_address = match derive_account_address(&stealth_pub, &ctx.deployment) {
        Ok(a) => a,
        Err(e) => return ScanResult::Failed(e),
    };
    let amount = decrypt_metadata(shared.x(), &record.ciphertext);

    debug!(
        record = %record.id(),
        stealth_address = %stealth_address,
        amount_known = !amount.is_unknown(),
        "view tag match"
    );

    ScanResult::Discovered(Box::new(DiscoveredFund {
        record_id: record.id(),
        stealth_pub,
        stealth_priv,
        stealth_address,
        ephemeral_pub: record.ephemeral_pub,
        amount,
        observed_balance: None,
        token: ctx.token,
    }))
}

/// Scans announcements in order, returning discoveries and counters.
pub fn scan_announcements(
    records: &[AnnouncementRecord],
    keys: &RecipientKeys,
    ctx: &DiscoveryContext,
) -> (Vec<DiscoveredFund>, ScanStats) {
    let start = Instant::now();
    let mut stats = ScanStats::new();
    let mut funds = Vec::new();

    for record in records {
        let result = scan_announcement(record, keys, ctx);
        stats.record(&result);
        match result {
            ScanResult::Discovered(fund) => funds.push(*fund),
            ScanResult::Failed(e) => {
                error!(record = %record.id(), error = %e, "failed to process matching announcement")
            }
            ScanResult::NotForUs => {}
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    (funds, stats)
}
