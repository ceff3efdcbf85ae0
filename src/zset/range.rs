//! Score and lexicographic range bounds
//!
//! Both range types carry their own LIMIT window (`offset`, `count`) and a
//! `reversed` switch, and know how to turn themselves into raw key bounds
//! over one version of the score index or member index.
//!
//! The textual forms follow the classical sorted-set syntax:
//!
//! | form    | score bound         | lex bound             |
//! |---------|---------------------|-----------------------|
//! | `1.5`   | inclusive 1.5       | -                     |
//! | `(1.5`  | exclusive 1.5       | exclusive `1.5`       |
//! | `[abc`  | -                   | inclusive `abc`       |
//! | `-inf`  | negative infinity   | -                     |
//! | `+inf`  | positive infinity   | -                     |
//! | `-`     | -                   | before every member   |
//! | `+`     | -                   | after every member    |

use std::fmt;
use std::ops::Bound;

use super::codec::sortable_bits;
use super::keys::{prefix_upper_bound, score_bound};
use crate::error::{Result, ZsetError};

/// Key bounds of a scan; `None` stands for a range no key can satisfy
pub(crate) type KeyBounds = Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)>;

/// Skip `offset` items, then keep at most `count`
///
/// Skipped items are still checked, so an error anywhere up to the end of
/// the window is returned.
fn window<T>(
    iter: impl Iterator<Item = Result<T>>,
    offset: usize,
    count: Option<usize>,
) -> Result<Vec<T>> {
    let limit = count.unwrap_or(usize::MAX);
    let mut kept = Vec::new();
    for (position, entry) in iter.enumerate() {
        if kept.len() >= limit {
            break;
        }
        let entry = entry?;
        if position >= offset {
            kept.push(entry);
        }
    }
    Ok(kept)
}

/// Negative counts mean "no limit"
fn count_from_signed(count: i64) -> Option<usize> {
    usize::try_from(count).ok()
}

// =============================================================================
// Score Range
// =============================================================================

/// Score interval with exclusivity, direction and LIMIT window
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub min_exclusive: bool,
    pub max_exclusive: bool,
    /// Walk from `max` down to `min`
    pub reversed: bool,
    /// Matches to skip before collecting
    pub offset: usize,
    /// Maximum matches to collect; `None` is unbounded
    pub count: Option<usize>,
}

impl ScoreRange {
    /// Inclusive `[min, max]`, ascending, no limit
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_exclusive: false,
            max_exclusive: false,
            reversed: false,
            offset: 0,
            count: None,
        }
    }

    /// `[-inf, +inf]`
    pub fn all() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn exclude_min(mut self) -> Self {
        self.min_exclusive = true;
        self
    }

    pub fn exclude_max(mut self) -> Self {
        self.max_exclusive = true;
        self
    }

    pub fn rev(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// LIMIT window; a negative `count` means unbounded
    pub fn with_limit(mut self, offset: usize, count: i64) -> Self {
        self.offset = offset;
        self.count = count_from_signed(count);
        self
    }

    /// Parse a `(min, max)` pair such as `("(1.5", "+inf")`
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        let (min, min_exclusive) = parse_score_bound(min)?;
        let (max, max_exclusive) = parse_score_bound(max)?;
        Ok(Self {
            min_exclusive,
            max_exclusive,
            ..Self::new(min, max)
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() {
            return Err(ZsetError::invalid("score range bound is not a number"));
        }
        Ok(())
    }

    /// Whether `score` falls inside the interval
    pub fn contains(&self, score: f64) -> bool {
        let above_min = if self.min_exclusive {
            score > self.min
        } else {
            score >= self.min
        };
        let below_max = if self.max_exclusive {
            score < self.max
        } else {
            score <= self.max
        };
        above_min && below_max
    }

    /// Bounds over the score index rooted at `prefix`
    pub(crate) fn key_bounds(&self, prefix: &[u8]) -> KeyBounds {
        if self.min > self.max {
            return None;
        }

        let min_bits = sortable_bits(self.min);
        let lower = if self.min_exclusive {
            Bound::Included(score_bound(prefix, min_bits.checked_add(1)?))
        } else {
            Bound::Included(score_bound(prefix, min_bits))
        };

        let max_bits = sortable_bits(self.max);
        let upper = if self.max_exclusive {
            Bound::Excluded(score_bound(prefix, max_bits))
        } else {
            match max_bits.checked_add(1) {
                Some(next) => Bound::Excluded(score_bound(prefix, next)),
                None => prefix_upper_bound(prefix),
            }
        };

        Some((lower, upper))
    }

    pub(crate) fn window<T>(&self, iter: impl Iterator<Item = Result<T>>) -> Result<Vec<T>> {
        window(iter, self.offset, self.count)
    }
}

fn parse_score_bound(text: &str) -> Result<(f64, bool)> {
    let (body, exclusive) = match text.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let value: f64 = body
        .parse()
        .map_err(|_| ZsetError::invalid(format!("min or max is not a float: {}", text)))?;
    if value.is_nan() {
        return Err(ZsetError::invalid(format!("min or max is not a float: {}", text)));
    }
    Ok((value, exclusive))
}

impl fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_score_bound(f, self.min, self.min_exclusive)?;
        write!(f, " ")?;
        fmt_score_bound(f, self.max, self.max_exclusive)
    }
}

fn fmt_score_bound(f: &mut fmt::Formatter<'_>, score: f64, exclusive: bool) -> fmt::Result {
    if exclusive {
        write!(f, "(")?;
    }
    if score == f64::INFINITY {
        write!(f, "+inf")
    } else if score == f64::NEG_INFINITY {
        write!(f, "-inf")
    } else {
        write!(f, "{}", score)
    }
}

// =============================================================================
// Lex Range
// =============================================================================

/// One end of a lexicographic range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// `-`: before every member
    NegInfinity,
    /// `+`: after every member
    PosInfinity,
    /// `[member`
    Inclusive(Vec<u8>),
    /// `(member`
    Exclusive(Vec<u8>),
}

impl LexBound {
    pub fn inclusive(member: impl Into<Vec<u8>>) -> Self {
        LexBound::Inclusive(member.into())
    }

    pub fn exclusive(member: impl Into<Vec<u8>>) -> Self {
        LexBound::Exclusive(member.into())
    }

    /// Parse `-`, `+`, `[member` or `(member`
    pub fn parse(text: &[u8]) -> Result<Self> {
        match text {
            b"-" => Ok(LexBound::NegInfinity),
            b"+" => Ok(LexBound::PosInfinity),
            [b'[', rest @ ..] => Ok(LexBound::Inclusive(rest.to_vec())),
            [b'(', rest @ ..] => Ok(LexBound::Exclusive(rest.to_vec())),
            _ => Err(ZsetError::invalid(
                "min or max not valid string range item",
            )),
        }
    }

    fn lower_key(&self, prefix: &[u8]) -> Bound<Vec<u8>> {
        match self {
            LexBound::NegInfinity => Bound::Included(prefix.to_vec()),
            LexBound::Inclusive(m) => Bound::Included([prefix, m].concat()),
            LexBound::Exclusive(m) => Bound::Excluded([prefix, m].concat()),
            LexBound::PosInfinity => prefix_upper_bound(prefix),
        }
    }

    fn upper_key(&self, prefix: &[u8]) -> Bound<Vec<u8>> {
        match self {
            LexBound::PosInfinity => prefix_upper_bound(prefix),
            LexBound::Inclusive(m) => Bound::Included([prefix, m].concat()),
            LexBound::Exclusive(m) => Bound::Excluded([prefix, m].concat()),
            LexBound::NegInfinity => Bound::Excluded(prefix.to_vec()),
        }
    }
}

impl fmt::Display for LexBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexBound::NegInfinity => write!(f, "-"),
            LexBound::PosInfinity => write!(f, "+"),
            LexBound::Inclusive(m) => write!(f, "[{}", String::from_utf8_lossy(m)),
            LexBound::Exclusive(m) => write!(f, "({}", String::from_utf8_lossy(m)),
        }
    }
}

/// Member interval with direction and LIMIT window
///
/// Scans follow member byte order, so results are only meaningful when every
/// member in scope shares one score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRange {
    pub min: LexBound,
    pub max: LexBound,
    /// Walk from `max` down to `min`
    pub reversed: bool,
    pub offset: usize,
    pub count: Option<usize>,
}

impl LexRange {
    pub fn new(min: LexBound, max: LexBound) -> Self {
        Self {
            min,
            max,
            reversed: false,
            offset: 0,
            count: None,
        }
    }

    /// `[-, +]`
    pub fn all() -> Self {
        Self::new(LexBound::NegInfinity, LexBound::PosInfinity)
    }

    pub fn rev(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// LIMIT window; a negative `count` means unbounded
    pub fn with_limit(mut self, offset: usize, count: i64) -> Self {
        self.offset = offset;
        self.count = count_from_signed(count);
        self
    }

    /// Parse a `(min, max)` pair such as `("[a", "+")`
    pub fn parse(min: &[u8], max: &[u8]) -> Result<Self> {
        Ok(Self::new(LexBound::parse(min)?, LexBound::parse(max)?))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.min == LexBound::PosInfinity {
            return Err(ZsetError::invalid("lex range min cannot be +"));
        }
        if self.max == LexBound::NegInfinity {
            return Err(ZsetError::invalid("lex range max cannot be -"));
        }
        Ok(())
    }

    /// Whether `member` falls inside the interval
    pub fn contains(&self, member: &[u8]) -> bool {
        let above_min = match &self.min {
            LexBound::NegInfinity => true,
            LexBound::PosInfinity => false,
            LexBound::Inclusive(m) => member >= m.as_slice(),
            LexBound::Exclusive(m) => member > m.as_slice(),
        };
        let below_max = match &self.max {
            LexBound::PosInfinity => true,
            LexBound::NegInfinity => false,
            LexBound::Inclusive(m) => member <= m.as_slice(),
            LexBound::Exclusive(m) => member < m.as_slice(),
        };
        above_min && below_max
    }

    /// Bounds over the member index rooted at `prefix`
    pub(crate) fn key_bounds(&self, prefix: &[u8]) -> KeyBounds {
        if self.min == LexBound::PosInfinity || self.max == LexBound::NegInfinity {
            return None;
        }
        Some((self.min.lower_key(prefix), self.max.upper_key(prefix)))
    }

    pub(crate) fn window<T>(&self, iter: impl Iterator<Item = Result<T>>) -> Result<Vec<T>> {
        window(iter, self.offset, self.count)
    }
}

impl fmt::Display for LexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.min, self.max)
    }
}
