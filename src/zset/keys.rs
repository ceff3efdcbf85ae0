//! Storage key layout for sorted sets
//!
//! ```text
//! metadata:  'M' | len(u32) | collection
//! member:    'm' | len(u32) | collection | version(u64) | member
//! score:     's' | len(u32) | collection | version(u64) | score(8) | member
//! sequence:  'V'
//! ```
//!
//! Integers are big-endian so the store's byte comparator orders them
//! numerically. The length prefix keeps one collection's keys from ever
//! sharing a prefix with another's (`"ab"` vs `"abc"`), and the member always
//! sits at the end of the key.
//!
//! Scanning `score_prefix(collection, version)` therefore walks the set in
//! ascending `(score, member)` order, and `member_prefix` walks it in member
//! byte order.

use std::ops::Bound;

use bytes::{Buf, BufMut};

use super::codec::{decode_score, encode_member, encode_score, SCORE_LEN};
use crate::error::{Result, ZsetError};

const METADATA_TAG: u8 = b'M';
const MEMBER_TAG: u8 = b'm';
const SCORE_TAG: u8 = b's';

/// Key holding the store-wide version sequence
pub const VERSION_SEQUENCE_KEY: &[u8] = b"V";

fn collection_head(tag: u8, collection: &[u8], extra: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 4 + collection.len() + extra);
    key.put_u8(tag);
    key.put_u32(collection.len() as u32);
    key.put_slice(collection);
    key
}

/// Key of the collection's metadata record
pub fn metadata_key(collection: &[u8]) -> Vec<u8> {
    collection_head(METADATA_TAG, collection, 0)
}

/// Prefix shared by every member-index key of one version
pub fn member_prefix(collection: &[u8], version: u64) -> Vec<u8> {
    let mut key = collection_head(MEMBER_TAG, collection, 8);
    key.put_u64(version);
    key
}

/// Prefix shared by every score-index key of one version
pub fn score_prefix(collection: &[u8], version: u64) -> Vec<u8> {
    let mut key = collection_head(SCORE_TAG, collection, 8 + SCORE_LEN);
    key.put_u64(version);
    key
}

/// Prefix shared by the member-index keys of every version
pub fn member_family(collection: &[u8]) -> Vec<u8> {
    collection_head(MEMBER_TAG, collection, 0)
}

/// Prefix shared by the score-index keys of every version
pub fn score_family(collection: &[u8]) -> Vec<u8> {
    collection_head(SCORE_TAG, collection, 0)
}

/// member → score lookup key
pub fn member_key(collection: &[u8], version: u64, member: &[u8]) -> Vec<u8> {
    let mut key = member_prefix(collection, version);
    key.put_slice(encode_member(member));
    key
}

/// (score, member) ordering key
pub fn score_key(collection: &[u8], version: u64, score: f64, member: &[u8]) -> Vec<u8> {
    let mut key = score_prefix(collection, version);
    key.put_slice(&encode_score(score));
    key.put_slice(encode_member(member));
    key
}

/// Score-index prefix followed by an already-sortable score image
///
/// Sorts before every entry carrying that score and after every entry with
/// a smaller one, which makes it usable directly as a scan bound.
pub fn score_bound(prefix: &[u8], sortable: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + SCORE_LEN);
    key.put_slice(prefix);
    key.put_u64(sortable);
    key
}

/// Smallest key greater than every key starting with `prefix`
///
/// `None` when the prefix is all `0xFF` (no finite successor exists).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Exclusive upper scan bound just past every key under `prefix`
pub fn prefix_upper_bound(prefix: &[u8]) -> Bound<Vec<u8>> {
    match prefix_end(prefix) {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    }
}

/// Split a score-index key into `(score, member)`
pub fn parse_score_key<'a>(prefix: &[u8], key: &'a [u8]) -> Result<(f64, &'a [u8])> {
    let rest = key
        .strip_prefix(prefix)
        .filter(|rest| rest.len() >= SCORE_LEN)
        .ok_or_else(|| ZsetError::corruption("malformed score-index key"))?;
    let score = decode_score(&rest[..SCORE_LEN])?;
    Ok((score, &rest[SCORE_LEN..]))
}

/// Strip the member-index prefix, leaving the member
pub fn parse_member_key<'a>(prefix: &[u8], key: &'a [u8]) -> Result<&'a [u8]> {
    key.strip_prefix(prefix)
        .ok_or_else(|| ZsetError::corruption("malformed member-index key"))
}

/// Version embedded in a key from `member_family` / `score_family`
pub fn parse_version(family: &[u8], key: &[u8]) -> Result<u64> {
    let mut rest = key
        .strip_prefix(family)
        .filter(|rest| rest.len() >= 8)
        .ok_or_else(|| ZsetError::corruption("sub-key too short to hold a version"))?;
    Ok(rest.get_u64())
}
