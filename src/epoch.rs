use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::constants;

/// Converts a calendar date to the store's date encoding: whole seconds from
/// 2001-01-01T00:00:00Z to 12:00 UTC on `date`.
///
/// Mid-day keeps the stored instant on the same calendar day in every
/// timezone the host application is likely to render it in.
pub fn seconds_since_reference_epoch(date: NaiveDate) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    midnight + constants::MIDDAY_OFFSET_SECS - constants::REFERENCE_EPOCH_UNIX_SECS
}

/// Converts an exact instant to the store's date encoding, truncated to whole seconds.
pub fn seconds_since_reference_instant(instant: DateTime<Utc>) -> i64 {
    instant.timestamp() - constants::REFERENCE_EPOCH_UNIX_SECS
}
