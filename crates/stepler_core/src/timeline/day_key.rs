//! Identifier clock and day-key function.
//!
//! # Responsibility
//! - Decide whether a task ID doubles as a creation timestamp.
//! - Map timestamps to local calendar-day labels (`14 Mar`).
//!
//! # Invariants
//! - Two timestamps share a key iff they fall on the same local calendar day
//!   (modulo year, which the key does not carry).
//! - IDs below `TIMESTAMP_ID_THRESHOLD` or out of the representable range are
//!   never read as dates.

use crate::model::task::DayKey;
use chrono::{DateTime, Local, TimeZone};

/// Smallest integer ID treated as an epoch-millisecond timestamp (~2001).
pub const TIMESTAMP_ID_THRESHOLD: i64 = 10_000_000_000;

/// Returns whether `id` parses as a base-10 integer at or above the threshold.
pub fn is_timestamp_id(id: &str) -> bool {
    matches!(id.parse::<i64>(), Ok(value) if value >= TIMESTAMP_ID_THRESHOLD)
}

/// Returns the local creation time encoded in a timestamp ID.
///
/// `None` for legacy IDs and for values chrono cannot represent.
pub fn timestamp_of(id: &str) -> Option<DateTime<Local>> {
    if !is_timestamp_id(id) {
        return None;
    }
    local_datetime(id.parse::<i64>().ok()?)
}

/// Converts epoch milliseconds into the machine's local timezone.
pub fn local_datetime(timestamp_ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(timestamp_ms).earliest()
}

/// Formats the day key for an epoch-millisecond timestamp.
///
/// Out-of-range timestamps produce an empty key, which never equals a real
/// day.
pub fn day_key(timestamp_ms: i64) -> DayKey {
    local_datetime(timestamp_ms)
        .map(|datetime| day_key_of(&datetime))
        .unwrap_or_default()
}

/// Formats `{day-of-month} {Mon}` with an unpadded day, e.g. `4 Jul`.
pub fn day_key_of<Tz: TimeZone>(datetime: &DateTime<Tz>) -> DayKey
where
    Tz::Offset: std::fmt::Display,
{
    datetime.format("%-d %b").to_string()
}

/// Epoch milliseconds of local midnight on `datetime`'s calendar day.
///
/// Falls back to `datetime` itself when midnight does not exist locally
/// (DST gap at 00:00).
pub fn local_midnight_ms(datetime: &DateTime<Local>) -> i64 {
    datetime
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .map_or_else(|| datetime.timestamp_millis(), |midnight| midnight.timestamp_millis())
}

/// Leading integer of an ID for ordering purposes; `0` when not numeric.
pub fn ordering_timestamp(id: &str) -> i64 {
    id.parse::<i64>().unwrap_or(0)
}
