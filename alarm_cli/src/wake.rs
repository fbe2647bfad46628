//! Resolving a local time of day to the next wake instant.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};

/// Next occurrence of `at`: today if it is not yet past, otherwise tomorrow.
pub fn next_wake(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today >= now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

/// Wait from `now` until the next occurrence of `at`.
pub fn until_next_wake(now: NaiveDateTime, at: NaiveTime) -> Duration {
    (next_wake(now, at) - now).to_std().unwrap_or_default()
}

/// Resolve `at` against the local wall clock.
pub fn from_local_now(at: NaiveTime) -> (NaiveDateTime, Duration) {
    let now = Local::now().naive_local();
    (next_wake(now, at), until_next_wake(now, at))
}
