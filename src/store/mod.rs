//! Store Module
//!
//! The ordered key-value contract the sorted-set layer is built on.
//!
//! ## Contract
//! - `get`: point read
//! - `write`: atomic batch (all operations become visible together, or none)
//! - `scan`: bounded range read in raw byte order, forward or reverse, over a
//!   point-in-time view
//!
//! Two implementations ship with the crate: [`MemoryStore`] (a locked
//! `BTreeMap`) and the persistent [`Engine`](crate::engine::Engine).

mod memory;

use std::ops::Bound;
use std::sync::Arc;

use crate::error::Result;
use crate::wal::Operation;

pub use memory::MemoryStore;

/// A `(key, value)` pair returned by scans
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Scan traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order
    Forward,
    /// Descending key order
    Reverse,
}

/// Ordered, batch-writable key-value store
pub trait Store: Send + Sync {
    /// Point read
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Commit a batch atomically
    fn write(&self, batch: WriteBatch) -> Result<()>;

    /// Range read over `(lower, upper)` in the given direction
    ///
    /// The iterator sees the store as of the call, whatever is written while
    /// it is being consumed. Empty or inverted bounds yield an empty scan.
    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, direction: Direction)
        -> Result<ScanIter>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        (**self).write(batch)
    }

    fn scan(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        direction: Direction,
    ) -> Result<ScanIter> {
        (**self).scan(lower, upper, direction)
    }
}

// =============================================================================
// Write Batch
// =============================================================================

/// An ordered list of puts and deletes committed as one unit
///
/// Later operations on the same key win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    operations: Vec<Operation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a put
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.operations.push(Operation::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Stage a delete
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.operations.push(Operation::Delete { key: key.into() });
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Staged operations in insertion order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

// =============================================================================
// Scan Iterator
// =============================================================================

/// Iterator over one point-in-time view of a range
///
/// `MemoryStore` walks its snapshot lazily; `Engine` merges its memtable and
/// SSTables into a sorted buffer up front.
pub struct ScanIter {
    inner: Box<dyn Iterator<Item = KvPair> + Send>,
}

impl ScanIter {
    /// Wrap an iterator that already yields pairs in scan order
    pub fn new(iter: impl Iterator<Item = KvPair> + Send + 'static) -> Self {
        Self {
            inner: Box::new(iter),
        }
    }

    /// Wrap ascending pairs, reversing them for `Direction::Reverse`
    pub fn from_sorted(mut pairs: Vec<KvPair>, direction: Direction) -> Self {
        if direction == Direction::Reverse {
            pairs.reverse();
        }
        Self::new(pairs.into_iter())
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Iterator for ScanIter {
    type Item = KvPair;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// =============================================================================
// Bound Helpers
// =============================================================================

/// Whether no key can satisfy both bounds
///
/// `BTreeMap::range` panics on inverted bounds, so every range read checks
/// this first.
pub fn bounds_are_empty(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}
