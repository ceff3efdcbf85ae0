//! Per-collection metadata
//!
//! One `{ version, size }` record per collection. Every sub-key embeds the
//! version, so deleting the record (or moving to a new version) makes all
//! older sub-keys unreachable at once; they are reclaimed later by
//! `ZSet::purge_stale`.
//!
//! Versions come from a store-wide sequence: a fresh collection gets
//! `previous + 1`, starting from 0. The sequence is an in-process atomic
//! seeded from the store on open, and each allocation persists the new high
//! mark in the same batch that first uses the version.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::keys;
use crate::error::{Result, ZsetError};
use crate::store::{Store, WriteBatch};

/// Metadata record of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Generation tag embedded in every sub-key
    pub version: u64,
    /// Number of live members
    pub size: u64,
}

impl Metadata {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| ZsetError::corruption(format!("undecodable metadata: {}", e)))
    }
}

/// Loads and stages metadata records and hands out versions
pub struct MetadataManager {
    /// Next version to allocate
    next_version: AtomicU64,
}

impl MetadataManager {
    /// Seed the version sequence from the store
    pub fn open<S: Store>(store: &S) -> Result<Self> {
        let next = match store.get(keys::VERSION_SEQUENCE_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    ZsetError::corruption("version sequence must be 8 bytes")
                })?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        tracing::debug!(next_version = next, "version sequence loaded");
        Ok(Self {
            next_version: AtomicU64::new(next),
        })
    }

    /// Point read; `None` means the collection is empty
    pub fn load<S: Store>(&self, store: &S, collection: &[u8]) -> Result<Option<Metadata>> {
        store
            .get(&keys::metadata_key(collection))?
            .map(|bytes| Metadata::decode(&bytes))
            .transpose()
    }

    /// Stage a size change and return the version sub-keys must use
    ///
    /// Reuses the current version when the collection exists, otherwise
    /// allocates a new one. The record is rewritten with the new size, or
    /// deleted once the size drops to zero.
    pub fn stage<S: Store>(
        &self,
        store: &S,
        collection: &[u8],
        delta: i64,
        batch: &mut WriteBatch,
    ) -> Result<u64> {
        let (version, size) = match self.load(store, collection)? {
            Some(meta) => (meta.version, meta.size as i64),
            None => (self.allocate_version(batch), 0),
        };
        self.stage_record(collection, version, size + delta, batch)?;
        Ok(version)
    }

    /// Stage a brand-new version holding `size` members
    ///
    /// Everything written under the previous version becomes unreachable.
    pub fn stage_reset(&self, collection: &[u8], size: u64, batch: &mut WriteBatch) -> Result<u64> {
        let version = self.allocate_version(batch);
        self.stage_record(collection, version, size as i64, batch)?;
        Ok(version)
    }

    /// Stage removal of the record (logical delete of the whole collection)
    pub fn stage_delete(&self, collection: &[u8], batch: &mut WriteBatch) {
        batch.delete(keys::metadata_key(collection));
    }

    fn stage_record(
        &self,
        collection: &[u8],
        version: u64,
        size: i64,
        batch: &mut WriteBatch,
    ) -> Result<()> {
        let key = keys::metadata_key(collection);
        if size <= 0 {
            batch.delete(key);
        } else {
            let meta = Metadata {
                version,
                size: size as u64,
            };
            batch.put(key, meta.encode()?);
        }
        Ok(())
    }

    fn allocate_version(&self, batch: &mut WriteBatch) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        batch.put(keys::VERSION_SEQUENCE_KEY, (version + 1).to_be_bytes().to_vec());
        tracing::trace!(version, "allocated collection version");
        version
    }
}
