//! Time utilities for idlecheck
//!
//! Idle durations arrive from the membership store as milliseconds. Deadlines
//! are enforced with the async runtime's monotonic clock; wall-clock
//! timestamps are only kept for logging and snapshots.

use chrono::{DateTime, Local};
use std::time::Duration;

/// Get the current local time.
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Wall-clock time at which a timer armed now for `delay` will elapse.
pub fn deadline_after(delay: Duration) -> DateTime<Local> {
    let now = now();
    // Out-of-range delays only affect the displayed deadline, never enforcement.
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(now)
}

/// Remaining permitted inactivity: `max(idle_time - observed_idle, 0)`.
pub fn remaining_idle(idle_time: Duration, observed_idle: Duration) -> Duration {
    idle_time.saturating_sub(observed_idle)
}

/// Convert a millisecond count reported by the store into a `Duration`.
pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Render a duration as whole milliseconds for structured log fields.
pub fn as_millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
