//! File-based announcement registry with persistence.
//!
//! Stores records in a single file with automatic saves. Suitable for the
//! CLI and single-node deployments where durability is needed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::traits::{AnnouncementSource, AnnouncementWriter};
use stealthflow_core::types::{AnnouncementPayload, AnnouncementRecord, AnnouncementStats, RecordId, U256};

use crate::MemoryRegistry;

/// File-based announcement registry.
///
/// Uses a memory registry internally with periodic persistence to disk.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "SFLW"
/// version (1 byte): 1
/// latest block (8 bytes, LE)
/// count (8 bytes, LE): number of records
/// records (variable): JSON array
/// ```
pub struct FileRegistry {
    /// Path to the storage file
    path: PathBuf,
    /// In-memory storage
    memory: MemoryRegistry,
    /// Whether there are unsaved changes
    dirty: AtomicBool,
    /// Auto-save threshold (save after N writes)
    auto_save_threshold: u64,
    /// Writes since last save
    writes_since_save: AtomicU64,
    /// Re-read the file before answering head queries
    follow: bool,
}

/// File format magic bytes
const MAGIC: &[u8; 4] = b"SFLW";
/// Current file format version
const VERSION: u8 = 1;
/// Magic, version, head and count
const HEADER_LEN: usize = 21;

fn read_u64(bytes: &[u8]) -> Result<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StealthFlowError::SourceError("truncated registry header".into()))?;
    Ok(u64::from_le_bytes(array))
}

impl FileRegistry {
    /// Opens the registry at `path`, loading it if the file exists.
    ///
    /// The file is created on first save.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let registry = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryRegistry::new(),
            dirty: AtomicBool::new(false),
            auto_save_threshold: 0,
            writes_since_save: AtomicU64::new(0),
            follow: false,
        };

        if registry.path.exists() {
            registry.load().await?;
        }

        Ok(registry)
    }

    /// Opens a registry that saves after every `threshold + 1` writes.
    pub async fn with_auto_save(path: impl AsRef<Path>, threshold: u64) -> Result<Self> {
        let mut registry = Self::new(path).await?;
        registry.auto_save_threshold = threshold;
        Ok(registry)
    }

    /// Opens a read-only view that picks up records appended by other processes.
    pub async fn follow(path: impl AsRef<Path>) -> Result<Self> {
        let mut registry = Self::new(path).await?;
        registry.follow = true;
        Ok(registry)
    }

    /// Imports records saved to the file since it was last read.
    ///
    /// Returns the number of new records.
    pub async fn refresh(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let before = self.memory.len();
        self.load().await?;
        Ok(self.memory.len() - before)
    }

    /// Loads records from the file.
    #[instrument(skip(self))]
    async fn load(&self) -> Result<()> {
        let mut file = fs::File::open(&self.path).await.map_err(|e| {
            StealthFlowError::IoError(std::io::Error::new(e.kind(), format!("Failed to open registry file: {}", e)))
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;

        if contents.len() < HEADER_LEN {
            return Err(StealthFlowError::SourceError("registry file too short".into()));
        }

        if &contents[0..4] != MAGIC {
            return Err(StealthFlowError::SourceError("invalid registry magic bytes".into()));
        }

        let version = contents[4];
        if version != VERSION {
            return Err(StealthFlowError::VersionMismatch {
                expected: VERSION,
                actual: version,
            });
        }

        let latest_block = read_u64(&contents[5..13])?;
        let count = read_u64(&contents[13..21])?;
        info!(count, latest_block, "Loading announcements from file");

        let records: Vec<AnnouncementRecord> = serde_json::from_slice(&contents[HEADER_LEN..])?;
        if records.len() as u64 != count {
            return Err(StealthFlowError::SourceError(format!(
                "header says {} records, file holds {}",
                count,
                records.len()
            )));
        }

        self.memory.import(records)?;
        self.memory.advance_to(latest_block);
        self.dirty.store(false, Ordering::SeqCst);
        debug!("Registry loaded successfully");

        Ok(())
    }

    /// Saves records to the file.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<()> {
        let records = self.memory.all_records();
        let count = records.len() as u64;
        let latest_block = self.memory.latest_block().await?;

        info!(count, path = ?self.path, "Saving registry to file");

        let serialized = serde_json::to_vec(&records)?;

        let mut contents = Vec::with_capacity(HEADER_LEN + serialized.len());
        contents.extend_from_slice(MAGIC);
        contents.push(VERSION);
        contents.extend_from_slice(&latest_block.to_le_bytes());
        contents.extend_from_slice(&count.to_le_bytes());
        contents.extend_from_slice(&serialized);

        // Write atomically (write to temp, then rename)
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;

        self.dirty.store(false, Ordering::SeqCst);
        self.writes_since_save.store(0, Ordering::SeqCst);

        debug!("Registry saved successfully");
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Forces a save if dirty.
    pub async fn flush(&self) -> Result<()> {
        if self.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory registry for direct access.
    pub fn memory(&self) -> &MemoryRegistry {
        &self.memory
    }

    /// Returns statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.memory.stats()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Inserts an externally read record and marks the file dirty.
    pub async fn insert(&self, record: AnnouncementRecord) -> Result<RecordId> {
        let id = self.memory.insert(record)?;
        self.mark_written().await?;
        Ok(id)
    }

    async fn mark_written(&self) -> Result<()> {
        self.dirty.store(true, Ordering::SeqCst);
        let writes = self.writes_since_save.fetch_add(1, Ordering::SeqCst);
        if writes >= self.auto_save_threshold {
            self.save().await?;
        }
        Ok(())
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        if self.is_dirty() {
            warn!(path = ?self.path, "FileRegistry dropped with unsaved changes");
        }
    }
}

#[async_trait]
impl AnnouncementSource for FileRegistry {
    async fn latest_block(&self) -> Result<u64> {
        if self.follow {
            let added = self.refresh().await?;
            if added > 0 {
                debug!(added, "Picked up new announcements");
            }
        }
        self.memory.latest_block().await
    }

    async fn fetch_announcements(&self, from_block: u64, to_block: u64) -> Result<Vec<AnnouncementRecord>> {
        self.memory.fetch_announcements(from_block, to_block).await
    }
}

#[async_trait]
impl AnnouncementWriter for FileRegistry {
    async fn announce(&self, payload: AnnouncementPayload, caller: U256) -> Result<RecordId> {
        let id = self.memory.announce(payload, caller).await?;
        self.mark_written().await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealthflow_core::types::PrivateKey;
    use tempfile::tempdir;

    fn payload(view_tag: u8) -> AnnouncementPayload {
        let eph = PrivateKey::from_bytes(U256::from_u64(view_tag as u64 + 1).to_be_bytes())
            .unwrap()
            .public_key()
            .unwrap();
        AnnouncementPayload::new(eph, view_tag, vec![U256::from_u64(3)])
    }

    #[tokio::test]
    async fn test_new_empty_registry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        let registry = FileRegistry::with_auto_save(&path, 100).await.unwrap();
        assert!(registry.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        let saved = {
            let registry = FileRegistry::with_auto_save(&path, 100).await.unwrap();
            registry.announce(payload(0x01), U256::ZERO).await.unwrap();
            registry.announce(payload(0x02), U256::ZERO).await.unwrap();
            registry.memory().advance_to(40);
            registry.save().await.unwrap();
            registry.memory().all_records()
        };

        let registry = FileRegistry::new(&path).await.unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.latest_block().await.unwrap(), 40);
        assert_eq!(registry.fetch_announcements(0, 40).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_dirty_tracking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        let registry = FileRegistry::with_auto_save(&path, 100).await.unwrap();
        assert!(!registry.is_dirty());

        registry.announce(payload(0x01), U256::ZERO).await.unwrap();
        assert!(registry.is_dirty());

        registry.flush().await.unwrap();
        assert!(!registry.is_dirty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_default_saves_every_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        let registry = FileRegistry::new(&path).await.unwrap();
        registry.announce(payload(0x01), U256::ZERO).await.unwrap();
        assert!(!registry.is_dirty());

        let reopened = FileRegistry::new(&path).await.unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[tokio::test]
    async fn test_auto_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        // Saves when writes_since_save reaches 2, i.e. on the third write
        let registry = FileRegistry::with_auto_save(&path, 2).await.unwrap();
        registry.announce(payload(0x01), U256::ZERO).await.unwrap();
        registry.announce(payload(0x02), U256::ZERO).await.unwrap();
        assert!(!path.exists());

        registry.announce(payload(0x03), U256::ZERO).await.unwrap();

        let registry2 = FileRegistry::new(&path).await.unwrap();
        assert_eq!(registry2.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        fs::write(&path, b"invalid data with enough bytes").await.unwrap();
        assert!(FileRegistry::new(&path).await.is_err());

        fs::write(&path, b"short").await.unwrap();
        assert!(FileRegistry::new(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        let mut contents = MAGIC.to_vec();
        contents.push(VERSION + 1);
        contents.extend_from_slice(&[0u8; 16]);
        contents.extend_from_slice(b"[]");
        fs::write(&path, contents).await.unwrap();

        assert!(matches!(
            FileRegistry::new(&path).await,
            Err(StealthFlowError::VersionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_follow_picks_up_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");

        let follower = FileRegistry::follow(&path).await.unwrap();
        assert_eq!(follower.latest_block().await.unwrap(), 0);

        let writer = FileRegistry::new(&path).await.unwrap();
        let id = writer.announce(payload(0x07), U256::ZERO).await.unwrap();

        assert_eq!(follower.latest_block().await.unwrap(), id.block_number);
        assert_eq!(follower.fetch_announcements(0, id.block_number).await.unwrap().len(), 1);
        assert_eq!(follower.refresh().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_atomic_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.sflw");
        let temp_path = path.with_extension("tmp");

        let registry = FileRegistry::new(&path).await.unwrap();
        registry.announce(payload(0x01), U256::ZERO).await.unwrap();

        assert!(!temp_path.exists());
        assert!(path.exists());
    }
}
