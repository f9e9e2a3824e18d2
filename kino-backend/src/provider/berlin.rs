//! Europe/Berlin local time
//!
//! Both cinema sites publish wall-clock times without an offset.

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Europe::Berlin;

/// Interpret a Berlin wall-clock time.
///
/// Times repeated in autumn resolve to the earlier (summer time) instant.
/// Times skipped by the spring change keep the offset in effect before the
/// gap, so 02:30 on that day becomes 02:30+01:00.
pub fn berlin_time(local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    match Berlin.from_local_datetime(&local) {
        LocalResult::Single(time) => Some(time.fixed_offset()),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.fixed_offset()),
        LocalResult::None => {
            let before_gap = Berlin
                .from_local_datetime(&local.checked_sub_signed(TimeDelta::hours(1))?)
                .earliest()?
                .offset()
                .fix();
            before_gap.from_local_datetime(&local).single()
        }
    }
}
