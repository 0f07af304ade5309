//! Simulation time.
//!
//! [`SimTime`] is an absolute instant measured in milliseconds from the start
//! of the run. Durations are plain [`Duration`] values; the two combine with
//! saturating arithmetic so a projection can never wrap around.
//!
//! The [`Clock`] is the only source of "now" for an agent. It moves forward in
//! discrete jumps and refuses to move backward.

use core::fmt;
use core::time::Duration;

use crate::error::InvariantViolation;

/// Absolute simulation instant in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: Self = Self(0);
    pub const NEVER: Self = Self(u64::MAX);

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1_000)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_since(self, earlier: SimTime) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Subtracts a duration, stopping at [`SimTime::ZERO`].
    pub fn saturating_sub(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_sub(duration_millis(rhs)))
    }
}

/// Converts a duration to whole milliseconds, saturating on overflow.
pub(crate) fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl core::ops::Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_add(duration_millis(rhs)))
    }
}

impl core::ops::AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NEVER {
            return write!(f, "never");
        }
        write!(f, "{}.{:03}s", self.0 / 1_000, self.0 % 1_000)
    }
}

/// Monotonic simulation clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Clock {
    now: SimTime,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: SimTime) -> Self {
        Self { now }
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Moves the clock to `time`.
    ///
    /// Advancing to the current instant is a no-op. Moving backward is a
    /// planning bug and is reported as an [`InvariantViolation`].
    pub fn advance_to(&mut self, time: SimTime) -> Result<(), InvariantViolation> {
        if time < self.now {
            return Err(InvariantViolation::ClockBackwards {
                now: self.now,
                requested: time,
            });
        }
        self.now = time;
        Ok(())
    }
}
