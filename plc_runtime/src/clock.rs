//! Software clock advanced once per scan.
//!
//! The clock never reads wall time. It starts at zero and moves forward by
//! the configured tick time after every logic step, so the logic engine sees
//! time advance in exact tick-sized increments regardless of scheduling
//! jitter.

use std::time::Duration;

use plc_common::consts::NANOS_PER_SEC;

/// Monotonic `(seconds, nanoseconds)` pair.
///
/// Invariant: `nanoseconds < 1_000_000_000` as long as every advance is
/// smaller than one second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoftClock {
    seconds: i64,
    nanoseconds: u32,
}

impl SoftClock {
    /// Clock at zero.
    pub const fn new() -> Self {
        Self {
            seconds: 0,
            nanoseconds: 0,
        }
    }

    /// Whole seconds elapsed.
    #[inline]
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Sub-second part [ns], always below one second.
    #[inline]
    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }

    /// Advance by `delta_ns`, carrying at most once into the seconds field.
    ///
    /// `delta_ns` must be below one second. The scan cycle only passes tick
    /// times accepted by `ScanSettings::new`.
    #[inline]
    pub fn advance(&mut self, delta_ns: u32) {
        debug_assert!(delta_ns < NANOS_PER_SEC, "tick must be shorter than 1 s");
        let mut nanos = self.nanoseconds + delta_ns;
        if nanos >= NANOS_PER_SEC {
            nanos -= NANOS_PER_SEC;
            self.seconds += 1;
        }
        self.nanoseconds = nanos;
    }

    /// Total elapsed time [ns].
    pub fn total_nanos(&self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SEC) + i128::from(self.nanoseconds)
    }

    /// Elapsed time as a `Duration`. Negative seconds clamp to zero.
    pub fn as_duration(&self) -> Duration {
        match u64::try_from(self.seconds) {
            Ok(secs) => Duration::new(secs, self.nanoseconds),
            Err(_) => Duration::ZERO,
        }
    }
}
