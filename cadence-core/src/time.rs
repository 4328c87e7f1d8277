//! Caller-supplied timestamps
//!
//! The sequencers never read a clock. The control loop reads its own
//! monotonic timer (SysTick, an embassy `Instant`, `std::time::Instant`
//! relative to boot, ...) and hands the value in as an [`Instant`].

use core::ops::{Add, Sub};
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A point on the caller's monotonic timeline, in nanoseconds
///
/// Only differences between instants matter; the epoch is whatever the
/// caller's timer counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instant {
    nanos: u64,
}

impl Instant {
    /// The timeline origin
    pub const ZERO: Instant = Instant { nanos: 0 };

    /// Create an instant from nanoseconds since the timer epoch
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Create an instant from microseconds since the timer epoch
    pub const fn from_micros(micros: u64) -> Self {
        Self::from_nanos(micros.saturating_mul(NANOS_PER_MICRO))
    }

    /// Create an instant from milliseconds since the timer epoch
    pub const fn from_millis(millis: u64) -> Self {
        Self::from_nanos(millis.saturating_mul(NANOS_PER_MILLI))
    }

    /// Create an instant from whole seconds since the timer epoch
    pub const fn from_secs(secs: u64) -> Self {
        Self::from_nanos(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Nanoseconds since the timer epoch
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Microseconds since the timer epoch (truncated)
    pub const fn as_micros(&self) -> u64 {
        self.nanos / NANOS_PER_MICRO
    }

    /// Time elapsed from `earlier` to `self`, or `None` if `earlier` is later
    pub fn checked_duration_since(&self, earlier: Instant) -> Option<Duration> {
        self.nanos
            .checked_sub(earlier.nanos)
            .map(Duration::from_nanos)
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        self.checked_duration_since(earlier).unwrap_or(Duration::ZERO)
    }

    /// Add a duration, or `None` on overflow
    pub fn checked_add(&self, duration: Duration) -> Option<Instant> {
        let nanos = u64::try_from(duration.as_nanos()).ok()?;
        self.nanos.checked_add(nanos).map(Instant::from_nanos)
    }

    /// Subtract a duration, or `None` if the result precedes the epoch
    pub fn checked_sub(&self, duration: Duration) -> Option<Instant> {
        let nanos = u64::try_from(duration.as_nanos()).ok()?;
        self.nanos.checked_sub(nanos).map(Instant::from_nanos)
    }
}

/// Saturates at the end of the timeline.
impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        self.checked_add(rhs)
            .unwrap_or(Instant::from_nanos(u64::MAX))
    }
}

/// Saturates at the timeline origin.
impl Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, rhs: Duration) -> Instant {
        self.checked_sub(rhs).unwrap_or(Instant::ZERO)
    }
}

/// Saturating: an earlier `self` yields [`Duration::ZERO`].
impl Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

/// Nanoseconds in `duration`, saturating at `u64::MAX`
pub(crate) fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
