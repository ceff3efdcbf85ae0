//! Storage Module
//!
//! Persistent storage layer using an SSTable format.
//!
//! ## Responsibilities
//! - Persist flushed memtables to disk in sorted format
//! - Point lookups and merged range scans across tables
//! - Full compaction (drops tombstones and shadowed values)
//!
//! See [`sstable`] for the file layout.

mod manager;
pub mod sstable;

pub use manager::StorageManager;
pub use sstable::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader};
