//! Revision, lifecycle and time primitives shared by all aggregates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing revision of an aggregate
///
/// Revision 0 is the revision of an aggregate that does not exist yet. Every
/// persisted event bumps the revision by exactly one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Revision of a nonexistent aggregate
    pub fn initial() -> Self {
        Self(0)
    }

    /// The revision the next event will be applied at
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an existing aggregate
///
/// A nonexistent aggregate has no lifecycle at all; it is represented by the
/// absence of the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lifecycle {
    /// The aggregate accepts commands
    Active,
    /// The aggregate was deleted; only a creation brings it back
    Deleted,
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Lifecycle::Deleted)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Active => write!(f, "ACTIVE"),
            Lifecycle::Deleted => write!(f, "DELETED"),
        }
    }
}

/// Point in time in milliseconds since the Unix epoch
///
/// The core never reads the clock. Hosts pass timestamps in, which keeps
/// every strategy deterministic under replay.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Rounds up to the next multiple of `granularity_ms`
    ///
    /// A granularity of zero leaves the timestamp untouched.
    pub fn round_up(&self, granularity_ms: u64) -> Self {
        if granularity_ms == 0 {
            return *self;
        }
        let remainder = self.0 % granularity_ms;
        if remainder == 0 {
            *self
        } else {
            Self(self.0.saturating_add(granularity_ms - remainder))
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
