//! Wraparound-safe arithmetic on the millisecond clock.
//!
//! All timestamps in this crate are `u32` milliseconds from a free-running
//! monotonic counter that wraps after about 49.7 days. Differences are taken
//! with wrapping subtraction so a timeout spanning the wrap is measured
//! correctly as long as the real interval is shorter than one full period.

/// Milliseconds elapsed from `since` to `now`, modulo 2^32.
#[inline]
pub const fn age_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Returns true once at least `interval` milliseconds have passed since `since`.
#[inline]
pub const fn elapsed(now: u32, since: u32, interval: u32) -> bool {
    age_ms(now, since) >= interval
}
