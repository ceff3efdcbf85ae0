//! Add flags and the insert/update/skip decision table

use crate::error::{Result, ZsetError};

/// Per-call behaviour switches for `ZSet::add`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddFlags {
    /// Only add new members, never touch existing ones
    pub nx: bool,
    /// Only update existing members, never add new ones
    pub xx: bool,
    /// Only update when the new score is greater than the current one
    pub gt: bool,
    /// Only update when the new score is less than the current one
    pub lt: bool,
    /// Count score changes as well as additions
    pub ch: bool,
}

impl AddFlags {
    pub fn nx() -> Self {
        Self {
            nx: true,
            ..Self::default()
        }
    }

    pub fn xx() -> Self {
        Self {
            xx: true,
            ..Self::default()
        }
    }

    pub fn gt() -> Self {
        Self {
            gt: true,
            ..Self::default()
        }
    }

    pub fn lt() -> Self {
        Self {
            lt: true,
            ..Self::default()
        }
    }

    /// Same flags with CH turned on
    pub fn with_ch(mut self) -> Self {
        self.ch = true;
        self
    }

    /// Reject combinations that cannot all hold at once
    pub fn validate(&self) -> Result<()> {
        if self.nx && self.xx {
            return Err(ZsetError::invalid("NX and XX are mutually exclusive"));
        }
        if self.nx && (self.gt || self.lt) {
            return Err(ZsetError::invalid("NX cannot be combined with GT or LT"));
        }
        if self.gt && self.lt {
            return Err(ZsetError::invalid("GT and LT are mutually exclusive"));
        }
        Ok(())
    }
}

/// What to do with one `(member, score)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Member is new and gets written
    Insert,
    /// Member exists and its score changes
    Update,
    /// Nothing is written
    Skip,
}

/// Pure decision for one pair given the member's current score
///
/// An existing member whose score would not change is always skipped, so a
/// repeated add is never counted as an update.
pub fn decide(existing: Option<f64>, new: f64, flags: &AddFlags) -> Decision {
    match existing {
        None if flags.xx => Decision::Skip,
        None => Decision::Insert,
        Some(_) if flags.nx => Decision::Skip,
        Some(old) if flags.gt && new <= old => Decision::Skip,
        Some(old) if flags.lt && new >= old => Decision::Skip,
        Some(old) if old == new => Decision::Skip,
        Some(_) => Decision::Update,
    }
}

