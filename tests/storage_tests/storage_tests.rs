//! Storage test suite
//!
//! SSTable format tests and StorageManager tests share one binary.

mod manager_tests;
mod sstable_tests;
