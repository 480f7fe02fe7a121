// SPDX-License-Identifier: MIT

//! Time/window engine (C2): decides whether an instant lies inside any of an
//! owner's weekly scan windows (§4.2).

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// One weekly recurring scan window: `{day, start, duration_hours}` (§3
/// Request, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanWindowSpec {
    pub day: Weekday,
    pub start: NaiveTime,
    pub duration_hours: u32,
}

/// Find the most recent occurrence of `day` on or before `now`, combine it
/// with `start`, and check whether `now` falls strictly inside
/// `[window_start, window_start + duration)` (§4.2: "Membership is
/// `window_start < now < window_start + duration`").
fn window_contains(window: &ScanWindowSpec, now: DateTime<Utc>) -> bool {
    let days_since = (now.weekday().num_days_from_monday() as i64
        - window.day.num_days_from_monday() as i64)
        .rem_euclid(7);
    let candidate_date = (now - Duration::days(days_since)).date_naive();
    let window_start = candidate_date
        .and_time(window.start)
        .and_utc();
    let window_end = window_start + Duration::hours(window.duration_hours as i64);
    now > window_start && now < window_end
}

/// True if `now` lies strictly inside any of `windows` (§4.2).
pub fn in_any_window(windows: &[ScanWindowSpec], now: DateTime<Utc>) -> bool {
    windows.iter().any(|w| window_contains(w, now))
}
