//! Sorted Set Module
//!
//! Scored, unique members layered on any ordered [`Store`].
//!
//! ## Layout
//! Every member is written twice, in one batch:
//! - member index: `member_key(version, member) → encoded score`
//! - score index:  `score_key(version, score, member) → ""`
//!
//! The member index answers point lookups (score, existence). The score
//! index is walked for range, rank and pop queries. `stage_member` and
//! `unstage_member` are the only code paths that touch either
//! index, so the two can never drift apart.
//!
//! ## Concurrency
//! Each mutation is read-decide-commit with no locking of its own. Callers
//! serialise mutations on the same collection key; reads may run freely and
//! see either side of a commit.

mod codec;
mod flags;
mod keys;
mod metadata;
mod mutation;
mod query;
mod range;

use std::ops::Bound;

pub use codec::{
    check_score, decode_score, encode_score, from_sortable_bits, sortable_bits, SCORE_LEN,
};
pub use flags::{decide, AddFlags, Decision};
pub use keys::{
    member_family, member_key, member_prefix, metadata_key, parse_member_key, parse_score_key,
    parse_version, prefix_end, score_family, score_key, score_prefix, VERSION_SEQUENCE_KEY,
};
pub use metadata::{Metadata, MetadataManager};
pub use query::resolve_rank_range;
pub use range::{LexBound, LexRange, ScoreRange};

use crate::error::Result;
use crate::store::{Direction, Store, WriteBatch};

/// A `(member, score)` pair returned by range and pop queries
#[derive(Debug, Clone, PartialEq)]
pub struct MemberScore {
    pub member: Vec<u8>,
    pub score: f64,
}

impl MemberScore {
    pub fn new(member: impl Into<Vec<u8>>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Sorted-set operations over a store
pub struct ZSet<S: Store> {
    store: S,
    metadata: MetadataManager,
}

impl<S: Store> ZSet<S> {
    /// Bind to a store, seeding the version sequence from it
    pub fn open(store: S) -> Result<Self> {
        let metadata = MetadataManager::open(&store)?;
        Ok(Self { store, metadata })
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, e.g. to close it
    pub fn into_store(self) -> S {
        self.store
    }

    /// Current metadata of a collection
    pub fn metadata(&self, collection: &[u8]) -> Result<Option<Metadata>> {
        self.metadata.load(&self.store, collection)
    }

    // =========================================================================
    // Dual-index helpers
    // =========================================================================

    /// Write both index entries of a member
    fn stage_member(
        batch: &mut WriteBatch,
        collection: &[u8],
        version: u64,
        member: &[u8],
        score: f64,
    ) {
        batch.put(
            keys::member_key(collection, version, member),
            codec::encode_score(score).to_vec(),
        );
        batch.put(keys::score_key(collection, version, score, member), Vec::new());
    }

    /// Remove both index entries of a member
    fn unstage_member(
        batch: &mut WriteBatch,
        collection: &[u8],
        version: u64,
        member: &[u8],
        score: f64,
    ) {
        batch.delete(keys::member_key(collection, version, member));
        batch.delete(keys::score_key(collection, version, score, member));
    }

    /// Move an existing member from `old` to `new`
    fn restage_member(
        batch: &mut WriteBatch,
        collection: &[u8],
        version: u64,
        member: &[u8],
        old: f64,
        new: f64,
    ) {
        batch.delete(keys::score_key(collection, version, old, member));
        Self::stage_member(batch, collection, version, member, new);
    }

    // =========================================================================
    // Scan helpers
    // =========================================================================

    /// Score of `member` under `version`, if present
    fn lookup(&self, collection: &[u8], version: u64, member: &[u8]) -> Result<Option<f64>> {
        self.store
            .get(&keys::member_key(collection, version, member))?
            .map(|bytes| codec::decode_score(&bytes))
            .transpose()
    }

    /// Walk the score index of one version within `bounds`
    fn scan_scores(
        &self,
        prefix: &[u8],
        bounds: &(Bound<Vec<u8>>, Bound<Vec<u8>>),
        direction: Direction,
    ) -> Result<impl Iterator<Item = Result<MemberScore>>> {
        let iter = self
            .store
            .scan(borrow_bound(&bounds.0), borrow_bound(&bounds.1), direction)?;
        let prefix = prefix.to_vec();
        Ok(iter.map(move |(key, _)| {
            keys::parse_score_key(&prefix, &key).map(|(score, member)| MemberScore::new(member, score))
        }))
    }

    /// Walk the member index of one version within `bounds`
    fn scan_members(
        &self,
        prefix: &[u8],
        bounds: &(Bound<Vec<u8>>, Bound<Vec<u8>>),
        direction: Direction,
    ) -> Result<impl Iterator<Item = Result<MemberScore>>> {
        let iter = self
            .store
            .scan(borrow_bound(&bounds.0), borrow_bound(&bounds.1), direction)?;
        let prefix = prefix.to_vec();
        Ok(iter.map(move |(key, value)| {
            let member = keys::parse_member_key(&prefix, &key)?;
            let score = codec::decode_score(&value)?;
            Ok(MemberScore::new(member, score))
        }))
    }

    /// Whole score index of one version, in the given direction
    fn scan_all_scores(
        &self,
        collection: &[u8],
        version: u64,
        direction: Direction,
    ) -> Result<impl Iterator<Item = Result<MemberScore>>> {
        let prefix = keys::score_prefix(collection, version);
        let bounds = (
            Bound::Included(prefix.clone()),
            keys::prefix_upper_bound(&prefix),
        );
        self.scan_scores(&prefix, &bounds, direction)
    }
}

fn borrow_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(key) => Bound::Included(key.as_slice()),
        Bound::Excluded(key) => Bound::Excluded(key.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn direction_of(reversed: bool) -> Direction {
    if reversed {
        Direction::Reverse
    } else {
        Direction::Forward
    }
}
