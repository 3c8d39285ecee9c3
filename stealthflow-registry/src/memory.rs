//! In-memory announcement registry.
//!
//! Fast, thread-safe ledger suitable for development, testing,
//! and single-process deployments.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::event::{decode_announcement_event, encode_announcement_event, RawEvent};
use stealthflow_core::traits::{AnnouncementSource, AnnouncementWriter};
use stealthflow_core::types::{AnnouncementPayload, AnnouncementRecord, AnnouncementStats, RecordId, U256};
use stealthflow_crypto::hash::starknet_keccak;

/// Name of the announcement event emitted by the registry contract.
const ANNOUNCEMENT_EVENT: &[u8] = b"Announcement";

/// Selector of the announcement event, `starknet_keccak("Announcement")`.
pub fn announcement_selector() -> U256 {
    starknet_keccak(ANNOUNCEMENT_EVENT)
}

/// In-memory announcement ledger.
///
/// # Indexing
///
/// Records are indexed by:
/// - Record id: for direct lookup and duplicate rejection
/// - Block: for ordered range queries
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug)]
pub struct MemoryRegistry {
    /// Primary storage: record id → record
    records: DashMap<RecordId, AnnouncementRecord>,
    /// Block index: block → record ids in insertion order
    block_index: RwLock<BTreeMap<u64, Vec<RecordId>>>,
    /// Highest block the ledger reports
    latest_block: AtomicU64,
    /// Counter for locally emitted transactions
    next_tx: AtomicU64,
    /// Registry statistics
    stats: RwLock<AnnouncementStats>,
}

impl MemoryRegistry {
    /// Creates a new empty in-memory registry.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a registry with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            block_index: RwLock::new(BTreeMap::new()),
            latest_block: AtomicU64::new(0),
            next_tx: AtomicU64::new(1),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.stats.read().clone()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clears all records and resets the head.
    pub fn clear(&self) {
        self.records.clear();
        self.block_index.write().clear();
        self.latest_block.store(0, Ordering::SeqCst);
        self.next_tx.store(1, Ordering::SeqCst);
        *self.stats.write() = AnnouncementStats::new();
    }

    /// Moves the reported head forward (never backward).
    pub fn advance_to(&self, block: u64) {
        self.latest_block.fetch_max(block, Ordering::SeqCst);
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &RecordId) -> Option<AnnouncementRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    /// Inserts a record read from elsewhere.
    ///
    /// # Errors
    /// Returns `DuplicateAnnouncement` if the id is already stored.
    pub fn insert(&self, record: AnnouncementRecord) -> Result<RecordId> {
        record.validate()?;
        let id = record.id();

        let block = record.block_number;
        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(StealthFlowError::DuplicateAnnouncement(id.to_string()));
            }
            Entry::Vacant(slot) => {
                self.stats.write().add(&record);
                slot.insert(record);
            }
        }

        // Index before moving the head so readers never skip a stored record
        self.block_index.write().entry(block).or_default().push(id.clone());
        self.advance_to(block);

        Ok(id)
    }

    /// Decodes and inserts a raw announcement event.
    pub fn ingest_event(&self, event: &RawEvent) -> Result<RecordId> {
        if event.keys.first() != Some(&announcement_selector()) {
            return Err(StealthFlowError::MalformedEvent("not an announcement event".into()));
        }
        self.insert(decode_announcement_event(event)?)
    }

    /// Returns all records in ledger order (for export/backup).
    pub fn all_records(&self) -> Vec<AnnouncementRecord> {
        self.range(0, u64::MAX)
    }

    /// Returns records as raw events in ledger order.
    pub fn events(&self, from_block: u64, to_block: u64) -> Vec<RawEvent> {
        let selector = announcement_selector();
        self.range(from_block, to_block)
            .iter()
            .map(|record| encode_announcement_event(record, selector))
            .collect()
    }

    /// Imports records, skipping ones already present.
    ///
    /// Returns the number of new records.
    pub fn import(&self, records: Vec<AnnouncementRecord>) -> Result<usize> {
        let mut imported = 0;
        for record in records {
            match self.insert(record) {
                Ok(_) => imported += 1,
                Err(StealthFlowError::DuplicateAnnouncement(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(imported)
    }

    fn range(&self, from_block: u64, to_block: u64) -> Vec<AnnouncementRecord> {
        if from_block > to_block {
            return Vec::new();
        }

        // Release the index before touching the map; `insert` locks in the other order
        let ids: Vec<RecordId> = self
            .block_index
            .read()
            .range(from_block..=to_block)
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect();

        ids.iter().filter_map(|id| self.get(id)).collect()
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnnouncementSource for MemoryRegistry {
    async fn latest_block(&self) -> Result<u64> {
        Ok(self.latest_block.load(Ordering::SeqCst))
    }

    /// Retrieves records in `[from_block, to_block]`, ordered by block.
    #[instrument(skip(self))]
    async fn fetch_announcements(&self, from_block: u64, to_block: u64) -> Result<Vec<AnnouncementRecord>> {
        let records = self.range(from_block, to_block);
        debug!(from_block, to_block, count = records.len(), "Fetched announcements");
        Ok(records)
    }
}

#[async_trait]
impl AnnouncementWriter for MemoryRegistry {
    /// Emits the payload in a new block with a fresh transaction hash.
    #[instrument(skip(self, payload), fields(view_tag = payload.view_tag))]
    async fn announce(&self, payload: AnnouncementPayload, caller: U256) -> Result<RecordId> {
        payload.validate()?;

        let tx = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let block = self.latest_block.load(Ordering::SeqCst) + 1;
        let record = AnnouncementRecord::from_payload(payload, caller, block, format!("{:#066x}", tx));

        let id = self.insert(record)?;
        debug!(record = %id, "Announced");
        Ok(id)
    }
}
