//! In-memory store
//!
//! A copy-on-write `BTreeMap` behind a `parking_lot::RwLock`. Batches are
//! applied under a single write lock. A scan clones the `Arc` to pin the
//! current map and then walks it one key at a time, so a writer only copies
//! the map while some scan still holds the old one.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{bounds_are_empty, Direction, ScanIter, Store, WriteBatch};
use crate::error::Result;
use crate::wal::Operation;

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// Volatile ordered store, mostly for tests and benchmarks
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Arc<Tree>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut guard = self.data.write();
        let data = Arc::make_mut(&mut *guard);
        for op in batch.into_operations() {
            match op {
                Operation::Put { key, value } => {
                    data.insert(key, value);
                }
                Operation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        direction: Direction,
    ) -> Result<ScanIter> {
        if bounds_are_empty(lower, upper) {
            return Ok(ScanIter::empty());
        }
        let snapshot = Arc::clone(&*self.data.read());
        Ok(ScanIter::new(SnapshotCursor {
            tree: snapshot,
            lower: to_owned_bound(lower),
            upper: to_owned_bound(upper),
            direction,
        }))
    }
}

/// Lazy walk over a pinned map
///
/// Each step narrows the remaining bounds past the key just returned.
struct SnapshotCursor {
    tree: Arc<Tree>,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    direction: Direction,
}

impl Iterator for SnapshotCursor {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let lower = as_slice_bound(&self.lower);
        let upper = as_slice_bound(&self.upper);
        if bounds_are_empty(lower, upper) {
            return None;
        }

        let mut range = self.tree.range::<[u8], _>((lower, upper));
        let (key, value) = match self.direction {
            Direction::Forward => range.next(),
            Direction::Reverse => range.next_back(),
        }?;
        let pair = (key.clone(), value.clone());

        match self.direction {
            Direction::Forward => self.lower = Bound::Excluded(pair.0.clone()),
            Direction::Reverse => self.upper = Bound::Excluded(pair.0.clone()),
        }
        Some(pair)
    }
}

fn to_owned_bound(bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(key) => Bound::Included(key.to_vec()),
        Bound::Excluded(key) => Bound::Excluded(key.to_vec()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn as_slice_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(key) => Bound::Included(key.as_slice()),
        Bound::Excluded(key) => Bound::Excluded(key.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}
