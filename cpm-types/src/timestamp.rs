//! Audit log timestamps.
//!
//! Audit entries are ordered by plain string comparison, so every component
//! of the timestamp must be fixed width. The `yy-MM-dd-HH-mm-ss` layout is
//! zero padded throughout; comparing two rendered timestamps textually gives
//! the same answer as comparing them chronologically within one century.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt;

/// `chrono` format string for audit timestamps.
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%y-%m-%d-%H-%M-%S";

/// A local wall-clock instant rendered as `yy-MM-dd-HH-mm-ss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuditTimestamp(NaiveDateTime);

impl AuditTimestamp {
    /// The current local time.
    #[must_use]
    pub fn now() -> Self {
        Self(Local::now().naive_local())
    }

    /// Wraps an explicit local date-time.
    #[must_use]
    pub const fn from_naive(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Converts from any timezone-aware instant, using its local wall time.
    #[must_use]
    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self(at.naive_local())
    }

    /// Parses a rendered timestamp.
    pub fn parse(s: &str) -> crate::Result<Self> {
        NaiveDateTime::parse_from_str(s, AUDIT_TIMESTAMP_FORMAT)
            .map(Self)
            .map_err(|e| crate::Error::InvalidTimestamp(format!("{s}: {e}")))
    }

    /// Returns the wrapped date-time.
    #[must_use]
    pub const fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for AuditTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(AUDIT_TIMESTAMP_FORMAT))
    }
}
