//! Time helpers for the control loop.

use std::time::Duration;

/// Tick period as a `Duration`, at least 1 ms.
#[inline]
pub fn tick_period(tick_ms: u64) -> Duration {
    Duration::from_millis(tick_ms.max(1))
}

/// Ticks per sampling event, rounded up and at least 1.
#[inline]
pub fn ticks_per_sample(tick_ms: u64, sample_ms: u64) -> u64 {
    let tick = tick_ms.max(1);
    sample_ms.div_ceil(tick).max(1)
}

/// Convert a duration to whole microseconds, saturating.
#[inline]
pub fn as_micros_u64(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
