//! Read-only sorted-set queries
//!
//! Every query resolves the collection's current version first and then
//! performs at most one scan, so each answer reflects a single point in
//! time of the store.

use std::ops::Bound;

use super::keys;
use super::range::{LexRange, ScoreRange};
use super::{direction_of, MemberScore, ZSet};
use crate::error::{Result, ZsetError};
use crate::store::{Direction, Store};

/// Resolve a possibly negative inclusive rank range against `size`
///
/// Negative ranks count from the end. The result is clamped to
/// `[0, size - 1]` and `None` when nothing remains.
pub fn resolve_rank_range(start: i64, stop: i64, size: u64) -> Option<(u64, u64)> {
    let size = i64::try_from(size).ok()?;
    let start = (if start < 0 { size + start } else { start }).max(0);
    let stop = (if stop < 0 { size + stop } else { stop }).min(size - 1);
    if start > stop || start >= size {
        return None;
    }
    Some((start as u64, stop as u64))
}

impl<S: Store> ZSet<S> {
    /// Score of a member; `NotFound` when the member or collection is absent
    pub fn score(&self, collection: &[u8], member: &[u8]) -> Result<f64> {
        let meta = self.metadata(collection)?.ok_or(ZsetError::NotFound)?;
        self.lookup(collection, meta.version, member)?
            .ok_or(ZsetError::NotFound)
    }

    /// Scores of several members, `None` for each absent one
    pub fn mscore(&self, collection: &[u8], members: &[Vec<u8>]) -> Result<Vec<Option<f64>>> {
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(vec![None; members.len()]),
        };
        members
            .iter()
            .map(|member| self.lookup(collection, meta.version, member))
            .collect()
    }

    /// Number of members
    pub fn card(&self, collection: &[u8]) -> Result<u64> {
        Ok(self.metadata(collection)?.map_or(0, |meta| meta.size))
    }

    /// 0-based position of a member, or `-1` when absent
    ///
    /// Counts the score-index entries strictly before (or, reversed, after)
    /// the member's own entry. Equal scores are ordered by member bytes.
    pub fn rank(&self, collection: &[u8], member: &[u8], reversed: bool) -> Result<i64> {
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(-1),
        };
        let score = match self.lookup(collection, meta.version, member)? {
            Some(score) => score,
            None => return Ok(-1),
        };

        let prefix = keys::score_prefix(collection, meta.version);
        let own = keys::score_key(collection, meta.version, score, member);
        let bounds = if reversed {
            (Bound::Excluded(own), keys::prefix_upper_bound(&prefix))
        } else {
            (Bound::Included(prefix.clone()), Bound::Excluded(own))
        };

        let mut before = 0;
        for entry in self.scan_scores(&prefix, &bounds, Direction::Forward)? {
            entry?;
            before += 1;
        }
        Ok(before)
    }

    /// Members between two ranks, both inclusive
    ///
    /// Negative ranks count from the end (`-1` is the last member).
    pub fn range_by_rank(
        &self,
        collection: &[u8],
        start: i64,
        stop: i64,
        reversed: bool,
    ) -> Result<Vec<MemberScore>> {
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(Vec::new()),
        };
        let (start, stop) = match resolve_rank_range(start, stop, meta.size) {
            Some(range) => range,
            None => return Ok(Vec::new()),
        };

        // Entries before `start` are still decoded so corruption surfaces
        let mut found = Vec::with_capacity((stop - start + 1) as usize);
        let ranked = self
            .scan_all_scores(collection, meta.version, direction_of(reversed))?
            .zip(0u64..);
        for (entry, rank) in ranked {
            if rank > stop {
                break;
            }
            let entry = entry?;
            if rank >= start {
                found.push(entry);
            }
        }
        Ok(found)
    }

    /// Members whose score falls in `range`, after its LIMIT window
    pub fn range_by_score(&self, collection: &[u8], range: &ScoreRange) -> Result<Vec<MemberScore>> {
        range.validate()?;
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(Vec::new()),
        };

        let prefix = keys::score_prefix(collection, meta.version);
        let bounds = match range.key_bounds(&prefix) {
            Some(bounds) => bounds,
            None => return Ok(Vec::new()),
        };
        let matches = self
            .scan_scores(&prefix, &bounds, direction_of(range.reversed))?
            .inspect(|entry| {
                if let Ok(entry) = entry {
                    debug_assert!(
                        range.contains(entry.score),
                        "score {} outside {}",
                        entry.score,
                        range
                    );
                }
            });
        range.window(matches)
    }

    /// Number of members whose score falls in `range`, ignoring its LIMIT window
    pub fn count(&self, collection: &[u8], range: &ScoreRange) -> Result<u64> {
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
        let mut total = 0;
        for entry in self.scan_scores(&prefix, &bounds, Direction::Forward)? {
            entry?;
            total += 1;
        }
        Ok(total)
    }

    /// Members inside a lexicographic range, after its LIMIT window
    ///
    /// Walks members in byte order and ignores scores, so the answer only
    /// matches score order when every member in scope shares one score.
    pub fn range_by_lex(&self, collection: &[u8], range: &LexRange) -> Result<Vec<Vec<u8>>> {
        range.validate()?;
        let meta = match self.metadata(collection)? {
            Some(meta) => meta,
            None => return Ok(Vec::new()),
        };

        let prefix = keys::member_prefix(collection, meta.version);
        let bounds = match range.key_bounds(&prefix) {
            Some(bounds) => bounds,
            None => return Ok(Vec::new()),
        };
        let matches = self
            .scan_members(&prefix, &bounds, direction_of(range.reversed))?
            .inspect(|entry| {
                if let Ok(entry) = entry {
                    debug_assert!(range.contains(&entry.member), "member outside {}", range);
                }
            })
            .map(|entry| entry.map(|e| e.member));
        range.window(matches)
    }

    /// Number of members inside a lexicographic range, ignoring its LIMIT window
    pub fn lex_count(&self, collection: &[u8], range: &LexRange) -> Result<u64> {
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
        let mut total = 0;
        for entry in self.scan_members(&prefix, &bounds, Direction::Forward)? {
            entry?;
            total += 1;
        }
        Ok(total)
    }
}
