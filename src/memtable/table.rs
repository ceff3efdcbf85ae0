//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use super::MemTableEntry;
use crate::store::bounds_are_empty;
use crate::wal::Operation;

/// In-memory table for recent writes
pub struct MemTable {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    data: BTreeMap<Vec<u8>, MemTableEntry>,
    /// Approximate size in bytes (keys + values)
    size: usize,
}

impl Inner {
    fn insert(&mut self, key: Vec<u8>, entry: MemTableEntry) {
        let key_len = key.len();
        let added = key_len + entry_len(&entry);
        if let Some(old) = self.data.insert(key, entry) {
            self.size -= key_len + entry_len(&old);
        }
        self.size += added;
    }
}

fn entry_len(entry: &MemTableEntry) -> usize {
    match entry {
        MemTableEntry::Value(v) => v.len(),
        MemTableEntry::Tombstone => 0,
    }
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Get an entry by key (read lock)
    ///
    /// `Some(Tombstone)` means the key was deleted here and older layers
    /// must not be consulted.
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.inner.read().data.get(key).cloned()
    }

    /// Put a key-value pair (write lock); returns the new approximate size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let mut inner = self.inner.write();
        inner.insert(key, MemTableEntry::Value(value));
        inner.size
    }

    /// Delete a key (write lock, inserts tombstone); returns the new size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        let mut inner = self.inner.write();
        inner.insert(key, MemTableEntry::Tombstone);
        inner.size
    }

    /// Apply a batch under a single write lock; returns the new size
    ///
    /// Readers observe either none or all of the batch.
    pub fn apply(&self, operations: &[Operation]) -> usize {
        let mut inner = self.inner.write();
        for op in operations {
            match op {
                Operation::Put { key, value } => {
                    inner.insert(key.clone(), MemTableEntry::Value(value.clone()))
                }
                Operation::Delete { key } => inner.insert(key.clone(), MemTableEntry::Tombstone),
            }
        }
        inner.size
    }

    /// Entries (tombstones included) within the given key bounds, ascending
    pub fn range(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Vec<(Vec<u8>, MemTableEntry)> {
        if bounds_are_empty(lower, upper) {
            return Vec::new();
        }
        self.inner
            .read()
            .data
            .range::<[u8], _>((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    /// Get entry count (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.inner.read().data.len()
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Get an iterator over all entries (for flush)
    ///
    /// Returns entries in sorted key order. The iterator owns a copy of the
    /// data, so the table can keep accepting writes while it is consumed.
    pub fn iter(&self) -> MemTableIterator {
        let entries: Vec<_> = self
            .inner
            .read()
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        MemTableIterator {
            inner: entries.into_iter(),
        }
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.data.clear();
        inner.size = 0;
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over MemTable entries
pub struct MemTableIterator {
    inner: std::vec::IntoIter<(Vec<u8>, MemTableEntry)>,
}

impl Iterator for MemTableIterator {
    type Item = (Vec<u8>, MemTableEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
