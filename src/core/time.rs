//! Timestamp encoding for 32-bit record fields
//!
//! Timestamps are stored as signed 32-bit seconds. Reading one yields the
//! local wall-clock time: the stored value plus the local UTC offset.
//! Writing subtracts the offset again and clamps to the `i32` range.

use chrono::{DateTime, Local, NaiveDateTime};
use parking_lot::RwLock;

static OFFSET_OVERRIDE: RwLock<Option<i32>> = parking_lot::const_rwlock(None);

/// Local UTC offset in seconds used by [`decode`] and [`encode`].
pub fn utc_offset() -> i32 {
    if let Some(offset) = *OFFSET_OVERRIDE.read() {
        return offset;
    }
    Local::now().offset().local_minus_utc()
}

/// Pin the offset (e.g. for reproducible output), or restore the system
/// offset with `None`.
pub fn set_utc_offset(offset: Option<i32>) {
    *OFFSET_OVERRIDE.write() = offset;
}

pub fn decode_with_offset(raw: i32, offset: i32) -> NaiveDateTime {
    let secs = raw as i64 + offset as i64;
    // Every i32 plus a UTC offset is well inside chrono's range.
    DateTime::from_timestamp(secs, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .naive_utc()
}

pub fn encode_with_offset(time: NaiveDateTime, offset: i32) -> i32 {
    let secs = time.and_utc().timestamp() - offset as i64;
    secs.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Stored value to local wall-clock time.
pub fn decode(raw: i32) -> NaiveDateTime {
    decode_with_offset(raw, utc_offset())
}

/// Local wall-clock time to stored value.
pub fn encode(time: NaiveDateTime) -> i32 {
    encode_with_offset(time, utc_offset())
}
