//! Polling cadence helpers.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use std::time::Duration;

/// How long to sleep so the next poll lands on the next threshold before the
/// scheduled start: T-30m, T-15m, T-5m, T-1m, T-10s. Inside the last ten
/// seconds (or past the start) it is zero and the caller's tick paces polls.
pub fn wait_tier(remaining: TimeDelta) -> Duration {
    let thresholds = [
        TimeDelta::minutes(30),
        TimeDelta::minutes(15),
        TimeDelta::minutes(5),
        TimeDelta::minutes(1),
        TimeDelta::seconds(10),
    ];
    thresholds
        .iter()
        .find(|v| remaining > **v)
        .and_then(|v| (remaining - *v).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

/// First wake of the regular loop: the top of the current hour stepped
/// forward by `period` until it is not in the past.
pub fn first_regular_wake(now: DateTime<Utc>, period: TimeDelta) -> DateTime<Utc> {
    if period <= TimeDelta::zero() {
        return now;
    }
    let mut next = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
    while now > next {
        next += period;
    }
    next
}
