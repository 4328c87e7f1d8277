//! Polled sequencers
//!
//! Both engines step through an [`ActionTable`] from repeated snapshots of
//! the caller's clock:
//!
//! - [`SyncSequencer`] keeps the cycle period and fails if an action goes
//!   unobserved.
//! - [`LooseSequencer`] keeps every action's minimum duration and never
//!   fails.
//!
//! [`ActionTable`]: crate::action::ActionTable

pub mod loose;
pub mod sync;

pub use loose::LooseSequencer;
pub use sync::SyncSequencer;

use core::num::NonZeroU32;
use core::time::Duration;

use crate::error::{BuildError, PollError};
use crate::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw iteration count meaning "repeat forever"
pub const UNBOUNDED_ITERATIONS: i64 = -1;

/// How many times a sequencer runs through its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i64", into = "i64"))]
pub enum Iterations {
    /// Stop after this many cycles
    Finite(NonZeroU32),
    /// Repeat until the caller stops polling
    Unbounded,
}

impl Iterations {
    /// A single pass over the table
    pub const ONCE: Iterations = Iterations::Finite(NonZeroU32::MIN);

    /// A fixed number of cycles; zero is rejected
    pub fn finite(count: u32) -> Result<Self, BuildError> {
        NonZeroU32::new(count)
            .map(Iterations::Finite)
            .ok_or(BuildError::BadIterationCount)
    }

    /// Number of cycles, or `None` when unbounded
    pub fn count(&self) -> Option<u32> {
        match self {
            Iterations::Finite(n) => Some(n.get()),
            Iterations::Unbounded => None,
        }
    }

    /// Whether the sequencer repeats forever
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Iterations::Unbounded)
    }
}

impl Default for Iterations {
    fn default() -> Self {
        Iterations::ONCE
    }
}

/// Parses the raw form: a positive count, or `-1` for unbounded.
impl TryFrom<i64> for Iterations {
    type Error = BuildError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        if raw == UNBOUNDED_ITERATIONS {
            return Ok(Iterations::Unbounded);
        }
        let count = u32::try_from(raw).map_err(|_| BuildError::BadIterationCount)?;
        Iterations::finite(count)
    }
}

impl From<Iterations> for i64 {
    fn from(iterations: Iterations) -> i64 {
        match iterations {
            Iterations::Finite(n) => i64::from(n.get()),
            Iterations::Unbounded => UNBOUNDED_ITERATIONS,
        }
    }
}

/// Outcome of a successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    /// A new action is due now; run it
    Trigger {
        /// The action payload
        value: T,
        /// Time until the next poll can change anything
        next: Duration,
    },
    /// Nothing new is due
    Wait {
        /// Time until the next action (or the start) is due
        next: Duration,
    },
    /// Every iteration has run; further polls keep returning `Done`
    Done,
}

impl<T> Step<T> {
    /// True for [`Step::Trigger`]
    pub fn is_trigger(&self) -> bool {
        matches!(self, Step::Trigger { .. })
    }

    /// True for [`Step::Done`]
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done)
    }

    /// Time until something new may be due; zero once done
    pub fn next(&self) -> Duration {
        match self {
            Step::Trigger { next, .. } | Step::Wait { next } => *next,
            Step::Done => Duration::ZERO,
        }
    }

    /// The triggered payload, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Step::Trigger { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Consume the step, returning the triggered payload
    pub fn into_value(self) -> Option<T> {
        match self {
            Step::Trigger { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Transform the payload
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Step<U> {
        match self {
            Step::Trigger { value, next } => Step::Trigger {
                value: f(value),
                next,
            },
            Step::Wait { next } => Step::Wait { next },
            Step::Done => Step::Done,
        }
    }
}

impl<T: Clone> Step<&T> {
    /// Clone the borrowed payload out of the sequencer
    pub fn cloned(self) -> Step<T> {
        self.map(Clone::clone)
    }
}

impl<T: Copy> Step<&T> {
    /// Copy the borrowed payload out of the sequencer
    pub fn copied(self) -> Step<T> {
        self.map(|v| *v)
    }
}

/// Operations shared by all sequencers
///
/// Lets a control loop drive either timing discipline through one
/// interface.
pub trait Sequencer {
    /// Payload type of the actions
    type Value;

    /// Start or restart at `now`, discarding all progress
    fn begin(&mut self, now: Instant);

    /// Check `now` against the schedule
    ///
    /// Never blocks. Returns [`Step::Trigger`] at most once per scheduled
    /// action.
    fn poll(&mut self, now: Instant) -> Result<Step<&Self::Value>, PollError>;

    /// Length of one pass over the table
    fn cycle_duration(&self) -> Duration;

    /// Instant passed to the last `begin`, or `None` before the first
    fn start_instant(&self) -> Option<Instant>;

    /// Configured repetition
    fn iterations(&self) -> Iterations;

    /// Nominal run time of all iterations, `None` when unbounded
    fn total_duration(&self) -> Option<Duration> {
        let count = self.iterations().count()?;
        self.cycle_duration().checked_mul(count)
    }
}
