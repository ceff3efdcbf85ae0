//! Score codec
//!
//! Maps `f64` scores onto 8 big-endian bytes whose unsigned lexicographic
//! order matches numeric order:
//!
//! - non-negative: set the sign bit
//! - negative: invert every bit
//!
//! ```text
//! -inf ..  -1.0 .. -0.0/+0.0 .. 1.0 .. +inf
//! 0x000F.. 0x400F..  0x8000..   0xBFF0.. 0xFFF0..
//! ```
//!
//! `-0.0` is folded into `+0.0` before encoding, so both zeros share one
//! encoding and compare equal in range scans. NaN has no place in the order;
//! callers reject it before encoding.

use crate::error::{Result, ZsetError};

/// Width of an encoded score
pub const SCORE_LEN: usize = 8;

const SIGN_BIT: u64 = 1 << 63;

/// Order-preserving integer image of a score
pub fn sortable_bits(score: f64) -> u64 {
    // `-0.0 >= 0.0` holds, which folds both zeros together
    if score >= 0.0 {
        score.to_bits() | SIGN_BIT
    } else {
        !score.to_bits()
    }
}

/// Inverse of [`sortable_bits`]
pub fn from_sortable_bits(bits: u64) -> f64 {
    if bits & SIGN_BIT != 0 {
        f64::from_bits(bits & !SIGN_BIT)
    } else {
        f64::from_bits(!bits)
    }
}

/// Encode a score into its sortable byte form
pub fn encode_score(score: f64) -> [u8; SCORE_LEN] {
    sortable_bits(score).to_be_bytes()
}

/// Decode a sortable score
///
/// Fails with `Corruption` when the slice has the wrong width or decodes to
/// NaN; neither can come out of `encode_score`.
pub fn decode_score(bytes: &[u8]) -> Result<f64> {
    let arr: [u8; SCORE_LEN] = bytes.try_into().map_err(|_| {
        ZsetError::corruption(format!(
            "score must be {} bytes, got {}",
            SCORE_LEN,
            bytes.len()
        ))
    })?;
    let score = from_sortable_bits(u64::from_be_bytes(arr));
    if score.is_nan() {
        return Err(ZsetError::corruption("stored score decodes to NaN"));
    }
    Ok(score)
}

/// Encode a member for the terminal position of a key
///
/// Members always end the key, so their raw bytes already compare correctly
/// and need no escaping or length prefix.
pub fn encode_member(member: &[u8]) -> &[u8] {
    member
}

/// Reject NaN before it reaches the codec
pub fn check_score(score: f64) -> Result<f64> {
    if score.is_nan() {
        return Err(ZsetError::invalid("score is not a number"));
    }
    Ok(score)
}
