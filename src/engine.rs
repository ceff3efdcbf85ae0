//! Engine Module
//!
//! The persistent ordered key-value store that backs sorted sets.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Commit write batches atomically (one WAL record, one memtable apply)
//! - Serve point reads and snapshot range scans
//! - Trigger flushes when MemTable is full
//! - Manage crash recovery on startup

use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::Result;
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::StorageManager;
use crate::store::{bounds_are_empty, Direction, ScanIter, Store, WriteBatch};
use crate::wal::{WalRecovery, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (batch/flush/compact): hold `commit_lock` exclusively, so
///   only ONE write runs at a time and readers never see a half-applied
///   batch or a flush in progress.
///   Order: commit_lock → WAL → memtable → storage (on flush)
///
/// - **Reads** (get/scan): hold `commit_lock` shared, so any number of
///   readers run together and each sees one consistent state.
pub struct Engine {
    config: Config,

    /// Directory for all data files (SSTables)
    storage_dir: PathBuf,

    /// Write-ahead log for durability
    wal: Mutex<WalWriter>,

    /// In-memory table for recent writes (internal RwLock)
    memtable: MemTable,

    /// Persistent storage manager (internal RwLock on sstables vec)
    storage: StorageManager,

    /// Writers exclusive, readers shared
    commit_lock: RwLock<()>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load existing SSTables
    /// 3. Recover from WAL if it exists (whole batches only)
    /// 4. Flush recovered data and truncate the WAL
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let storage_dir = config.data_dir.join(Self::SSTABLE_DIR);
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&storage_dir)?;
        let memtable = MemTable::new();

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    truncated = recovery.was_truncated,
                    "WAL recovery finished"
                );
            }

            for entry in &entries {
                memtable.apply(&entry.operations);
            }

            // Make recovered data durable in an SSTable before the WAL is reset
            if !memtable.is_empty() {
                tracing::info!(
                    entries = memtable.entry_count(),
                    "flushing recovered entries to SSTable"
                );
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.truncate()?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            sstables = storage.sstable_count(),
            "engine opened"
        );

        Ok(Self {
            config,
            storage_dir,
            wal: Mutex::new(wal),
            memtable,
            storage,
            commit_lock: RwLock::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let _read = self.commit_lock.read();

        if let Some(entry) = self.memtable.get(key) {
            return Ok(entry.into_value());
        }
        self.storage.get(key)
    }

    /// Commit a batch atomically
    ///
    /// Steps:
    /// 1. Acquire commit lock
    /// 2. Append the whole batch as one WAL record (durability)
    /// 3. Apply it to the MemTable under one lock
    /// 4. Flush if the MemTable is over its limit
    ///
    /// An error means the batch was not applied. Failures after step 3 are
    /// logged instead of returned.
    pub fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let _write = self.commit_lock.write();

        let operations = batch.into_operations();
        let lsn = self.wal.lock().append_batch(operations.clone())?;
        let new_size = self.memtable.apply(&operations);

        tracing::trace!(lsn, ops = operations.len(), "batch committed");

        // The batch is durable and visible from here on, so a failed flush
        // must not fail the write. The memtable keeps its entries and the
        // next write over the limit tries again.
        if new_size >= self.config.memtable_size_limit {
            if let Err(e) = self.flush_internal() {
                tracing::warn!(lsn, error = %e, "flush after commit failed");
            }
        }

        Ok(())
    }

    /// Put a single key-value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write_batch(batch)
    }

    /// Delete a single key
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write_batch(batch)
    }

    /// Live entries within the bounds, as of one point in time
    pub fn scan_range(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        direction: Direction,
    ) -> Result<ScanIter> {
        if bounds_are_empty(lower, upper) {
            return Ok(ScanIter::empty());
        }

        let _read = self.commit_lock.read();

        let mut merged: BTreeMap<Vec<u8>, MemTableEntry> = self.storage.scan(lower, upper)?;
        for (key, entry) in self.memtable.range(lower, upper) {
            merged.insert(key, entry);
        }

        let pairs = merged
            .into_iter()
            .filter_map(|(k, e)| e.into_value().map(|v| (k, v)))
            .collect();

        Ok(ScanIter::from_sorted(pairs, direction))
    }

    /// Flush memtable to disk (public API)
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> Result<()> {
        let _write = self.commit_lock.write();
        self.flush_internal()
    }

    /// Flush, then merge all SSTables into one
    ///
    /// Returns the number of live entries in the compacted table.
    pub fn compact(&self) -> Result<u64> {
        let _write = self.commit_lock.write();
        self.flush_internal()?;
        self.storage.compact()
    }

    /// Internal flush implementation (called with commit lock held)
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();

        // Entries are now durable in an SSTable
        self.wal.lock().truncate()?;

        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Flushes any pending data and syncs to disk
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.wal.lock().sync()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the storage directory path (where SSTables are stored)
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Get the current memtable size
    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Store for Engine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Engine::get(self, key)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.write_batch(batch)
    }

    fn scan(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        direction: Direction,
    ) -> Result<ScanIter> {
        self.scan_range(lower, upper, direction)
    }
}
