//! Error and warning kinds
//!
//! Construction problems are reported once, when a table or sequencer is
//! built. Poll problems are reported by [`Sequencer::poll`].
//!
//! [`Sequencer::poll`]: crate::sequencer::Sequencer::poll

use core::fmt;

/// Errors that reject a table or sequencer at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BuildError {
    /// No actions were supplied
    EmptyTable,
    /// An action was given a negative duration
    NegativeDuration {
        /// Position of the offending action
        index: usize,
    },
    /// An action has zero duration under strict timing
    ZeroDuration {
        /// Position of the offending action
        index: usize,
    },
    /// Iteration count is neither positive nor the unbounded sentinel
    BadIterationCount,
    /// More actions than the table capacity
    TableFull,
    /// Total cycle duration does not fit the nanosecond timeline
    DurationOverflow,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyTable => f.write_str("empty action table"),
            BuildError::NegativeDuration { index } => {
                write!(f, "action {} has a negative duration", index)
            }
            BuildError::ZeroDuration { index } => write!(
                f,
                "action {} has zero duration; use loose timing for zero-duration actions",
                index
            ),
            BuildError::BadIterationCount => {
                f.write_str("iteration count must be positive, or -1 for unbounded")
            }
            BuildError::TableFull => f.write_str("too many actions for table capacity"),
            BuildError::DurationOverflow => f.write_str("cycle duration overflows"),
        }
    }
}

impl core::error::Error for BuildError {}

/// Non-fatal findings returned alongside a successfully built table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Warning {
    /// An action is shorter than the minimum safe resolution
    ///
    /// The action can be missed if the loop polls more coarsely than its
    /// duration.
    SmallDuration {
        /// First action below the threshold
        index: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SmallDuration { index } => write!(
                f,
                "action {} is shorter than the minimum resolution and may be missed",
                index
            ),
        }
    }
}

/// Errors returned while polling a sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollError {
    /// `poll` was called before `begin`
    NotStarted,
    /// The loop polled too slowly and an action boundary went unobserved
    ///
    /// Only strict timing reports this. The sequencer stays failed until
    /// `begin` is called again.
    MissedAction {
        /// First action index that was never triggered
        skipped: usize,
    },
    /// A previous poll reported [`PollError::MissedAction`]
    GroupFailed,
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::NotStarted => f.write_str("poll called before begin"),
            PollError::MissedAction { skipped } => write!(
                f,
                "missed action {}; the loop must poll more often than the shortest action",
                skipped
            ),
            PollError::GroupFailed => f.write_str("group failed"),
        }
    }
}

impl core::error::Error for PollError {}
