//! Time and timestamp helpers.

use chrono::{DateTime, SubsecRound, Utc};

/// UTC timestamp used for snapshot, decision and state times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time, truncated to microseconds.
///
/// Microseconds is the precision timestamps are persisted with, so a value
/// read back from storage compares equal to the one that was written.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}
