use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Drops seconds and sub-second precision. Activity samples are keyed by
/// calendar minute, so every timestamp entering the store goes through this.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    let secs = at.timestamp();
    Utc.timestamp_opt(secs - secs.rem_euclid(60), 0).unwrap()
}

/// Returns the next wall-clock multiple of `interval` strictly after `now`.
/// A moment exactly on a boundary maps to the following one, so a timer using
/// this never fires twice for the same boundary.
pub fn next_aligned(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = interval.as_secs() as i64;
    let secs = now.timestamp();
    Utc.timestamp_opt(secs - secs.rem_euclid(step) + step, 0)
        .unwrap()
}
