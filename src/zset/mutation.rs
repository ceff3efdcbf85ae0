//! Mutating sorted-set operations
//!
//! Each call reads what it needs, decides, and commits exactly one batch
//! carrying both the sub-key changes and the metadata delta. Calls that
//! change nothing commit nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use super::codec::check_score;
use super::flags::{decide, AddFlags, Decision};
use super::keys;
use super::range::{LexRange, ScoreRange};
use super::{borrow_bound, MemberScore, ZSet};
use crate::error::{Result, ZsetError};
use crate::store::{Direction, Store, WriteBatch};

impl<S: Store> ZSet<S> {
    /// Add or update members
    ///
    /// Returns the number of members added, plus the number whose score
    /// changed when `flags.ch` is set. Duplicate members within one call take
    /// the last score given.
    pub fn add(&self, collection: &[u8], flags: AddFlags, members: &[MemberScore]) -> Result<u64> {
        flags.validate()?;

        let mut wanted: BTreeMap<&[u8], f64> = BTreeMap::new();
        for entry in members {
            wanted.insert(entry.member.as_slice(), check_score(entry.score)?);
        }

        let current = self.metadata(collection)?;
        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        for (member, score) in wanted {
            let existing = match current {
                Some(meta) => self.lookup(collection, meta.version, member)?,
                None => None,
            };
            match decide(existing, score, &flags) {
                Decision::Insert => inserts.push((member, score)),
                Decision::Update => {
                    if let Some(old) = existing {
                        updates.push((member, old, score));
                    }
                }
                Decision::Skip => {}
            }
        }

        if inserts.is_empty() && updates.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        let version = self
            .metadata
            .stage(&self.store, collection, inserts.len() as i64, &mut batch)?;
        for &(member, score) in &inserts {
            Self::stage_member(&mut batch, collection, version, member, score);
        }
        for &(member, old, new) in &updates {
            Self::restage_member(&mut batch, collection, version, member, old, new);
        }
        self.store.write(batch)?;

        tracing::debug!(
            inserted = inserts.len(),
            updated = updates.len(),
            version,
            "zset add"
        );

        let mut changed = inserts.len() as u64;
        if flags.ch {
            changed += updates.len() as u64;
        }
        Ok(changed)
    }

    /// Add `increment` to a member's score (0 when absent), returning the result
    pub fn incr_by(&self, collection: &[u8], member: &[u8], increment: f64) -> Result<f64> {
        check_score(increment)?;

        let current = self.metadata(collection)?;
        let existing = match current {
            Some(meta) => self.lookup(collection, meta.version, member)?,
            None => None,
        };

        let new = existing.unwrap_or(0.0) + increment;
        if new.is_nan() {
            return Err(ZsetError::invalid("resulting score is not a number"));
        }
        if existing == Some(new) {
            return Ok(new);
        }

        let mut batch = WriteBatch::new();
        let delta = if existing.is_some() { 0 } else { 1 };
        let version = self.metadata.stage(&self.store, collection, delta, &mut batch)?;
        match existing {
            Some(old) => Self::restage_member(&mut batch, collection, version, member, old, new),
            None => Self::stage_member(&mut batch, collection, version, member, new),
        }
        self.store.write(batch)?;

        tracing::debug!(score = new, version, "zset incr_by");
        Ok(new)
    }

    /// Remove members, returning how many were present
    pub fn remove(&self, collection: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(0),
        };

        let unique: BTreeSet<&[u8]> = members.iter().map(Vec::as_slice).collect();
        let mut present = Vec::new();
        for member in unique {
            if let Some(score) = self.lookup(collection, meta.version, member)? {
                present.push(MemberScore::new(member, score));
            }
        }
        self.remove_entries(collection, &present)
    }

    /// Remove every member whose score falls in `range`
    ///
    /// The LIMIT window and direction of `range` are ignored.
    pub fn remove_range_by_score(&self, collection: &[u8], range: &ScoreRange) -> Result<u64> {
        range.validate()?;
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(0),
        };

        let prefix = keys::score_prefix(collection, meta.version);
        let bounds = match range.key_bounds(&prefix) {
            Some(bounds) => bounds,
            None => return Ok(0),
        };
        let doomed = self
            .scan_scores(&prefix, &bounds, Direction::Forward)?
            .collect::<Result<Vec<_>>>()?;
        self.remove_entries(collection, &doomed)
    }

    /// Remove the members between two ranks (inclusive, ascending order)
    pub fn remove_range_by_rank(&self, collection: &[u8], start: i64, stop: i64) -> Result<u64> {
        let doomed = self.range_by_rank(collection, start, stop, false)?;
        self.remove_entries(collection, &doomed)
    }

    /// Remove every member inside a lexicographic range
    ///
    /// The LIMIT window and direction of `range` are ignored.
    pub fn remove_range_by_lex(&self, collection: &[u8], range: &LexRange) -> Result<u64> {
        range.validate()?;
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(0),
        };

        let prefix = keys::member_prefix(collection, meta.version);
        let bounds = match range.key_bounds(&prefix) {
            Some(bounds) => bounds,
            None => return Ok(0),
        };
        let doomed = self
            .scan_members(&prefix, &bounds, Direction::Forward)?
            .collect::<Result<Vec<_>>>()?;
        self.remove_entries(collection, &doomed)
    }

    /// Remove and return up to `count` members from one end
    ///
    /// Results come back in extraction order: ascending when popping from
    /// the min end, descending from the max end.
    pub fn pop(&self, collection: &[u8], count: i64, from_min: bool) -> Result<Vec<MemberScore>> {
        if count <= 0 {
            return Ok(Vec::new());
        }
        let popped = self.range_by_rank(collection, 0, count - 1, !from_min)?;
        self.remove_entries(collection, &popped)?;
        Ok(popped)
    }

    /// Drop the whole collection in O(1)
    ///
    /// Only the metadata record is removed; the orphaned sub-keys stay until
    /// [`ZSet::purge_stale`] reclaims them. Returns whether anything existed.
    pub fn delete(&self, collection: &[u8]) -> Result<bool> {
        if self.metadata(collection)?.is_none() {
            return Ok(false);
        }
        let mut batch = WriteBatch::new();
        self.metadata.stage_delete(collection, &mut batch);
        self.store.write(batch)?;
        tracing::debug!("zset deleted");
        Ok(true)
    }

    /// Replace the collection's contents under a fresh version
    ///
    /// Returns the new size. An empty `members` deletes the collection.
    pub fn overwrite(&self, collection: &[u8], members: &[MemberScore]) -> Result<u64> {
        let mut wanted: BTreeMap<&[u8], f64> = BTreeMap::new();
        for entry in members {
            wanted.insert(entry.member.as_slice(), check_score(entry.score)?);
        }

        if wanted.is_empty() {
            self.delete(collection)?;
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        let size = wanted.len() as u64;
        let version = self.metadata.stage_reset(collection, size, &mut batch)?;
        for (member, score) in wanted {
            Self::stage_member(&mut batch, collection, version, member, score);
        }
        self.store.write(batch)?;

        tracing::debug!(size, version, "zset overwritten");
        Ok(size)
    }

    /// Physically delete sub-keys left behind by abandoned versions
    ///
    /// Returns the number of keys removed.
    pub fn purge_stale(&self, collection: &[u8]) -> Result<u64> {
        let live = self.metadata(collection)?.map(|meta| meta.version);

        let mut batch = WriteBatch::new();
        for family in [keys::member_family(collection), keys::score_family(collection)] {
            let upper = keys::prefix_upper_bound(&family);
            let scan = self.store.scan(
                Bound::Included(family.as_slice()),
                borrow_bound(&upper),
                Direction::Forward,
            )?;
            for (key, _) in scan {
                if Some(keys::parse_version(&family, &key)?) != live {
                    batch.delete(key);
                }
            }
        }

        let purged = batch.len() as u64;
        if purged > 0 {
            self.store.write(batch)?;
            tracing::info!(purged, "stale sorted-set keys purged");
        }
        Ok(purged)
    }

    /// Delete already-resolved members in one batch
    fn remove_entries(&self, collection: &[u8], doomed: &[MemberScore]) -> Result<u64> {
        if doomed.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        let version =
            self.metadata
                .stage(&self.store, collection, -(doomed.len() as i64), &mut batch)?;
        for entry in doomed {
            Self::unstage_member(&mut batch, collection, version, &entry.member, entry.score);
        }
        self.store.write(batch)?;

        tracing::debug!(removed = doomed.len(), version, "zset remove");
        Ok(doomed.len() as u64)
    }
}
