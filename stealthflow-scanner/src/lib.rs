//! # StealthFlow Scanner
//!
//! Incremental scanning of announcement ledgers to discover payments.
//!
//! ## Features
//!
//! - **Block Batches**: scans `[next, next + batch_blocks)` per invocation
//! - **Resumable Scans**: tracks the last scanned block between invocations
//! - **Deduplication**: a fund is reported once per scanner, however often
//!   its block range is rescanned
//! - **Atomic Commits**: a failed fetch or balance query leaves the position
//!   untouched so the next poll retries the same range
//! - **Polling Loop**: cancellable periodic task delivering funds over a channel
//!
//! ## Example
//!
//! ```rust
//! use stealthflow_core::traits::AnnouncementWriter;
//! use stealthflow_core::types::U256;
//! use stealthflow_registry::MemoryRegistry;
//! use stealthflow_scanner::{Scanner, ScannerConfig};
//! use stealthflow_stealth::{create_stealth_payment, StealthWallet};
//!
//! # tokio_test::block_on(async {
//! let wallet = StealthWallet::generate()?;
//! let registry = MemoryRegistry::new();
//!
//! let payment = create_stealth_payment(wallet.meta_address(), Some(U256::from_u64(5)))?;
//! registry.announce(payment.announcement, U256::ZERO).await?;
//!
//! let scanner = Scanner::from_wallet(&wallet, ScannerConfig::new())?;
//! let funds = scanner.catch_up(&registry, None).await?;
//! assert_eq!(funds[0].stealth_address, payment.stealth_address);
//! # Ok::<(), stealthflow_core::StealthFlowError>(())
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use stealthflow_core::constants::{DEFAULT_BATCH_BLOCKS, DEFAULT_POLL_INTERVAL_MS, STRK_TOKEN_ADDRESS};
use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::traits::{AnnouncementSource, BalanceLookup};
use stealthflow_core::types::{AnnouncementRecord, DiscoveredFund, RecipientKeys, RecordId, U256};
use stealthflow_crypto::AccountDeployment;
use stealthflow_stealth::discovery::{scan_announcements, DiscoveryContext, ScanStats};
use stealthflow_stealth::StealthWallet;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Scanner configuration.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Blocks fetched per invocation
    pub batch_blocks: u64,
    /// Interval between invocations of the polling loop
    pub poll_interval: Duration,
    /// First block to scan when no position exists
    pub start_block: u64,
    /// Token reported on discovered funds
    pub token: U256,
    /// Deployment used to derive stealth account addresses
    pub deployment: AccountDeployment,
    /// Whether catch-up stops after the first invocation with a discovery
    pub stop_on_first: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            batch_blocks: DEFAULT_BATCH_BLOCKS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            start_block: 0,
            token: STRK_TOKEN_ADDRESS,
            deployment: AccountDeployment::default(),
            stop_on_first: false,
        }
    }
}

impl ScannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of blocks per invocation.
    pub fn batch_blocks(mut self, blocks: u64) -> Self {
        self.batch_blocks = blocks;
        self
    }

    /// Sets the polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the first block to scan.
    pub fn start_block(mut self, block: u64) -> Self {
        self.start_block = block;
        self
    }

    /// Sets the token reported on funds.
    pub fn token(mut self, token: U256) -> Self {
        self.token = token;
        self
    }

    /// Sets the stealth account deployment.
    pub fn deployment(mut self, deployment: AccountDeployment) -> Self {
        self.deployment = deployment;
        self
    }

    /// Enables stopping catch-up on the first discovery.
    pub fn stop_on_first(mut self) -> Self {
        self.stop_on_first = true;
        self
    }

    /// Checks the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.batch_blocks == 0 {
            return Err(StealthFlowError::ConfigError("batch_blocks must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(StealthFlowError::ConfigError("poll_interval must be positive".into()));
        }
        Ok(())
    }

    fn discovery_context(&self) -> DiscoveryContext {
        DiscoveryContext {
            deployment: self.deployment,
            token: self.token,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRESS & POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Catch-up progress in blocks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Blocks to scan in this catch-up
    pub total: u64,
    /// Blocks scanned so far
    pub scanned: u64,
    /// Discoveries found so far
    pub discoveries: u64,
    /// Current scan rate (blocks per second)
    pub rate: f64,
    /// Estimated time remaining in seconds
    pub eta_seconds: Option<f64>,
    /// Percentage complete (0-100)
    pub percent: f64,
}

impl ScanProgress {
    /// Creates a new progress tracker.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            scanned: 0,
            discoveries: 0,
            rate: 0.0,
            eta_seconds: None,
            percent: 0.0,
        }
    }

    /// Updates progress with new values.
    pub fn update(&mut self, scanned: u64, discoveries: u64, elapsed_ms: u64) {
        self.scanned = scanned;
        self.discoveries = discoveries;

        if elapsed_ms > 0 {
            self.rate = (scanned as f64 / elapsed_ms as f64) * 1000.0;
        }

        if self.total > 0 {
            self.percent = (scanned as f64 / self.total as f64) * 100.0;

            if self.rate > 0.0 {
                let remaining = self.total.saturating_sub(scanned);
                self.eta_seconds = Some(remaining as f64 / self.rate);
            }
        } else {
            self.percent = 100.0;
        }
    }
}

/// Scan position for resumable scanning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPosition {
    /// Last block whose announcements were fully processed
    pub last_scanned_block: Option<u64>,
    /// Announcements processed in this session
    pub total_scanned: u64,
    /// Funds reported in this session
    pub total_discoveries: u64,
}

impl ScanPosition {
    /// Creates a new scan position.
    pub fn new() -> Self {
        Self::default()
    }

    /// First block of the next invocation.
    pub fn next_block(&self, start_block: u64) -> u64 {
        match self.last_scanned_block {
            Some(block) => block.saturating_add(1).max(start_block),
            None => start_block,
        }
    }
}

/// Outcome of one scan invocation.
#[derive(Clone, Debug)]
pub struct ScanReport {
    /// Block range processed, `None` when already at the head
    pub range: Option<(u64, u64)>,
    /// Newly discovered funds, in ledger order
    pub funds: Vec<DiscoveredFund>,
    /// Counters for this invocation
    pub stats: ScanStats,
    /// Announcements that matched the view tag but could not be processed
    pub failed: u64,
    /// Whether the position now equals the source head
    pub reached_head: bool,
}

impl ScanReport {
    /// Returns true if any matching announcement failed to process.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Mutable scan session state, committed as a unit.
#[derive(Debug, Default)]
struct ScanState {
    position: ScanPosition,
    seen: HashSet<RecordId>,
    stats: ScanStats,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Scanner for one recipient's session.
///
/// Owns the recipient keys and the only mutable scan state. Concurrent calls
/// on the same scanner are serialized at commit time, so a fund is never
/// reported twice.
pub struct Scanner {
    keys: RecipientKeys,
    config: ScannerConfig,
    state: RwLock<ScanState>,
}

impl Scanner {
    /// Creates a scanner for `keys`.
    ///
    /// # Errors
    /// Returns `ConfigError` for an unusable configuration.
    pub fn new(keys: RecipientKeys, config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            keys,
            config,
            state: RwLock::new(ScanState::default()),
        })
    }

    /// Creates a scanner from a wallet's keys.
    pub fn from_wallet(wallet: &StealthWallet, config: ScannerConfig) -> Result<Self> {
        Self::new(wallet.keys().clone(), config)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns the current scan position.
    pub fn position(&self) -> ScanPosition {
        self.state.read().position.clone()
    }

    /// Returns the cumulative statistics.
    pub fn stats(&self) -> ScanStats {
        self.state.read().stats.clone()
    }

    /// Returns a summary of the session so far.
    pub fn summary(&self) -> ScanSummary {
        let state = self.state.read();
        ScanSummary::new(&state.stats, &state.position)
    }

    /// Returns true if the record has already been reported.
    pub fn is_seen(&self, id: &RecordId) -> bool {
        self.state.read().seen.contains(id)
    }

    /// Resets position, statistics and the seen set.
    pub fn reset(&self) {
        *self.state.write() = ScanState::default();
    }

    /// Moves the position so the next invocation starts at `block`.
    ///
    /// Already reported funds stay deduplicated.
    pub fn rewind_to(&self, block: u64) {
        self.state.write().position.last_scanned_block = block.checked_sub(1);
    }

    /// Scans records already in hand, without touching the position.
    ///
    /// Returns only funds not reported before, in input order.
    pub fn scan_records(&self, records: &[AnnouncementRecord]) -> Vec<DiscoveredFund> {
        let (funds, stats) = self.discover(records);
        self.commit(funds, &stats, None, records.len() as u64)
    }

    /// Runs one invocation: fetch the next batch, discover, commit.
    ///
    /// Funds with an unknown amount get their balance looked up when
    /// `balances` is given. Any fetch or lookup error is returned and
    /// nothing is committed.
    #[instrument(skip(self, source, balances))]
    pub async fn poll_once(
        &self,
        source: &dyn AnnouncementSource,
        balances: Option<&dyn BalanceLookup>,
    ) -> Result<ScanReport> {
        let latest = source.latest_block().await?;
        let from = self.position().next_block(self.config.start_block);

        if from > latest {
            debug!(from, latest, "Already at head");
            return Ok(ScanReport {
                range: None,
                funds: Vec::new(),
                stats: ScanStats::new(),
                failed: 0,
                reached_head: true,
            });
        }

        let to = from.saturating_add(self.config.batch_blocks - 1).min(latest);
        let records = source.fetch_announcements(from, to).await?;
        let (mut funds, stats) = self.discover(&records);

        if let Some(balances) = balances {
            for fund in funds.iter_mut().filter(|f| f.amount.is_unknown()) {
                let balance = balances.balance_of(&fund.stealth_address).await?;
                fund.observed_balance = Some(balance);
            }
        }

        let funds = self.commit(funds, &stats, Some(to), records.len() as u64);

        if stats.errors > 0 {
            warn!(from, to, failed = stats.errors, "Matching announcements could not be processed");
        }

        debug!(
            from,
            to,
            records = records.len(),
            filtered = stats.filtered,
            discoveries = funds.len(),
            "Scanned batch"
        );

        Ok(ScanReport {
            range: Some((from, to)),
            funds,
            failed: stats.errors,
            stats,
            reached_head: to == latest,
        })
    }

    /// Polls until the source head is reached.
    pub async fn catch_up(
        &self,
        source: &dyn AnnouncementSource,
        balances: Option<&dyn BalanceLookup>,
    ) -> Result<Vec<DiscoveredFund>> {
        self.catch_up_with_progress(source, balances, None).await
    }

    /// Polls until the head is reached, reporting progress after each batch.
    #[instrument(skip(self, source, balances, progress_callback))]
    pub async fn catch_up_with_progress(
        &self,
        source: &dyn AnnouncementSource,
        balances: Option<&dyn BalanceLookup>,
        progress_callback: Option<&ProgressCallback>,
    ) -> Result<Vec<DiscoveredFund>> {
        let start = Instant::now();
        let first = self.position().next_block(self.config.start_block);
        let latest = source.latest_block().await?;
        let mut progress = ScanProgress::new((latest + 1).saturating_sub(first));
        let mut discoveries = Vec::new();

        info!(from = first, to = latest, "Starting catch-up");

        loop {
            let report = self.poll_once(source, balances).await?;
            let found = !report.funds.is_empty();
            discoveries.extend(report.funds);

            if let (Some(callback), Some((_, to))) = (progress_callback, report.range) {
                progress.update((to + 1).saturating_sub(first), discoveries.len() as u64, start.elapsed().as_millis() as u64);
                callback(progress.clone());
            }

            if self.config.stop_on_first && found {
                info!("Stopping on first discovery");
                break;
            }
            if report.reached_head {
                break;
            }
        }

        let summary = self.summary();
        info!(
            discoveries = discoveries.len(),
            scanned = summary.total_scanned,
            last_block = ?summary.last_scanned_block,
            rate = format!("{:.2}/s", summary.rate),
            "Catch-up complete"
        );

        Ok(discoveries)
    }

    /// Polls at the configured interval until `stop` turns true.
    ///
    /// The stop signal is checked before every invocation; a running batch
    /// always finishes. Failed invocations are logged and retried on the
    /// next tick. New funds are sent to `sink` in ledger order; the loop
    /// also ends when the receiver is dropped.
    pub async fn run(
        &self,
        source: &dyn AnnouncementSource,
        balances: Option<&dyn BalanceLookup>,
        mut stop: watch::Receiver<bool>,
        sink: mpsc::Sender<DiscoveredFund>,
    ) -> ScanSummary {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.config.poll_interval.as_millis() as u64, "Scanner started");

        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    // A dropped sender also stops the loop
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            if *stop.borrow() {
                break;
            }

            match self.poll_once(source, balances).await {
                Ok(report) => {
                    for fund in report.funds {
                        if sink.send(fund).await.is_err() {
                            info!("Fund receiver dropped, stopping scanner");
                            return self.summary();
                        }
                    }
                }
                Err(e) => warn!(error = %e, "scan failed, will retry"),
            }
        }

        let summary = self.summary();
        info!(scanned = summary.total_scanned, discoveries = summary.discoveries, "Scanner stopped");
        summary
    }

    /// Runs discovery and drops duplicates within the batch and already seen ids.
    fn discover(&self, records: &[AnnouncementRecord]) -> (Vec<DiscoveredFund>, ScanStats) {
        let (funds, stats) = scan_announcements(records, &self.keys, &self.config.discovery_context());

        let state = self.state.read();
        let mut batch = HashSet::new();
        let funds = funds
            .into_iter()
            .filter(|f| !state.seen.contains(&f.record_id) && batch.insert(f.record_id.clone()))
            .collect();

        (funds, stats)
    }

    /// Commits one invocation; returns the funds that are still new.
    fn commit(
        &self,
        funds: Vec<DiscoveredFund>,
        stats: &ScanStats,
        scanned_to: Option<u64>,
        scanned: u64,
    ) -> Vec<DiscoveredFund> {
        let mut state = self.state.write();

        // Another invocation may have reported some of these since discovery
        let fresh: Vec<DiscoveredFund> = funds
            .into_iter()
            .filter(|f| !state.seen.contains(&f.record_id))
            .collect();

        for fund in &fresh {
            state.seen.insert(fund.record_id.clone());
        }
        if let Some(to) = scanned_to {
            let last = state.position.last_scanned_block.map_or(to, |b| b.max(to));
            state.position.last_scanned_block = Some(last);
        }
        state.position.total_scanned += scanned;
        state.position.total_discoveries += fresh.len() as u64;
        state.stats.merge(stats);

        fresh
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("meta_address", &self.keys.meta_address())
            .field("config", &self.config)
            .field("position", &self.position())
            .finish()
    }
}

/// Scan result summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of announcements scanned
    pub total_scanned: u64,
    /// Announcements rejected by the view tag
    pub filtered: u64,
    /// Number of view tag matches
    pub matches: u64,
    /// Number of funds reported
    pub discoveries: u64,
    /// Number of errors
    pub errors: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Scan rate (announcements per second)
    pub rate: f64,
    /// Filter efficiency (% filtered by view tag)
    pub filter_efficiency: f64,
    /// Last fully scanned block
    pub last_scanned_block: Option<u64>,
}

impl ScanSummary {
    fn new(stats: &ScanStats, position: &ScanPosition) -> Self {
        Self {
            total_scanned: stats.total,
            filtered: stats.filtered,
            matches: stats.matches,
            discoveries: position.total_discoveries,
            errors: stats.errors,
            duration_ms: stats.duration_ms,
            rate: stats.rate(),
            filter_efficiency: stats.filter_efficiency(),
            last_scanned_block: position.last_scanned_block,
        }
    }
}
