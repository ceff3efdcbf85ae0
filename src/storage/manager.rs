//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for point reads
//! - Merge SSTables for range scans (newest version of each key wins)
//! - Create new SSTables from MemTable flushes
//! - Full compaction into a single table

use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Result, ZsetError};
use crate::memtable::{MemTable, MemTableEntry};

use super::{SSTable, SSTableBuilder, SSTableReader};

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock. Reads take the write half because
///   `SSTableReader` seeks its file handle.
/// - `next_sstable_id`: Atomic counter (lock-free)
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    /// Next ID for creating new SSTables
    next_sstable_id: AtomicU64,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing SSTable files
    /// 3. Open readers for each (loads indexes into RAM)
    /// 4. Order by ID descending (newest first)
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = Self::parse_sstable_id(&file_path) {
                    sstable_ids.push(id);
                }
            }
        }

        // Newest first (highest ID first)
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let sstables = sstable_ids
            .iter()
            .map(|&id| SSTableReader::open(&Self::sstable_path_with_dir(path, id)))
            .collect::<Result<Vec<_>>>()?;

        let next_id = sstable_ids.first().map(|&id| id + 1).unwrap_or(1);

        tracing::debug!(
            dir = %path.display(),
            tables = sstables.len(),
            next_id,
            "storage opened"
        );

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key not found, or found tombstone (deleted)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut sstables = self.sstables.write();

        for reader in sstables.iter_mut() {
            if !reader.might_contain(key) {
                continue;
            }
            if let Some(found) = reader.get(key)? {
                return Ok(found);
            }
        }

        Ok(None)
    }

    /// Merged view of all SSTables within the given bounds, ascending
    ///
    /// Tombstones are kept (as `MemTableEntry::Tombstone`) so a caller
    /// layering a memtable on top can still let them shadow older data.
    pub fn scan(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> Result<BTreeMap<Vec<u8>, MemTableEntry>> {
        let mut merged = BTreeMap::new();
        let mut sstables = self.sstables.write();

        // Oldest first so newer tables overwrite
        for reader in sstables.iter_mut().rev() {
            for (key, value) in reader.range(lower, upper)? {
                let entry = match value {
                    Some(v) => MemTableEntry::Value(v),
                    None => MemTableEntry::Tombstone,
                };
                merged.insert(key, entry);
            }
        }

        Ok(merged)
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// Creates a new SSTable file from the MemTable's sorted entries,
    /// opens a reader for it, and adds it to the front of the list.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(ZsetError::Storage("Cannot flush empty MemTable".to_string()));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let metadata = builder.finish()?;

        let reader = SSTableReader::open(&path)?;
        self.sstables.write().insert(0, reader);

        tracing::info!(
            id,
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "memtable flushed to SSTable"
        );

        Ok(metadata)
    }

    /// Merge every SSTable into one, dropping tombstones and shadowed values
    ///
    /// Returns the number of live entries kept. Dropping tombstones is only
    /// sound because the merge covers every table.
    pub fn compact(&self) -> Result<u64> {
        let mut sstables = self.sstables.write();
        if sstables.len() <= 1 && sstables.iter().all(|t| t.entry_count() == 0) {
            return Ok(0);
        }

        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        for reader in sstables.iter_mut().rev() {
            for item in reader.iter()? {
                let (key, value) = item?;
                merged.insert(key, value);
            }
        }

        let old_paths: Vec<PathBuf> = sstables.iter().map(|t| t.path().to_path_buf()).collect();
        let live: Vec<_> = merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();

        let mut replacement = Vec::new();
        if !live.is_empty() {
            let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
            let path = self.sstable_path(id);
            let mut builder = SSTableBuilder::new(&path)?;
            for (key, value) in &live {
                builder.add(key, value)?;
            }
            builder.finish()?;
            replacement.push(SSTableReader::open(&path)?);
        }

        *sstables = replacement;
        for path in &old_paths {
            fs::remove_file(path)?;
        }

        tracing::info!(
            merged_tables = old_paths.len(),
            live_entries = live.len(),
            "compaction finished"
        );

        Ok(live.len() as u64)
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("sstable_")?;
        id_str.parse().ok()
    }
}
