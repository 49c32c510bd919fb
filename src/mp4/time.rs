//! MP4 timestamps count seconds from 1904-01-01 00:00:00 UTC.

use chrono::{DateTime, Utc};

const SECS_IN_DAY: i64 = 24 * 60 * 60;

/// Seconds between the MP4 epoch (1904) and the Unix epoch (1970).
pub fn epoch_offset() -> i64 {
    (1904..1970)
        .map(|year| {
            let leap = if year % 4 == 0 { SECS_IN_DAY } else { 0 };
            365 * SECS_IN_DAY + leap
        })
        .sum()
}

/// Current time as a 32-bit MP4 timestamp.
pub fn now() -> u32 {
    from_datetime(Utc::now())
}

pub fn from_datetime(t: DateTime<Utc>) -> u32 {
    // 32-bit fields wrap in 2040; version 0 boxes have no wider field.
    (t.timestamp() + epoch_offset()) as u32
}
