//! Actions and action tables
//!
//! An action is one scheduled unit of work: a payload that becomes due for
//! a given duration. A table is the ordered, validated list of actions a
//! sequencer steps through.

pub mod table;

pub use table::{locate, ActionTable, Position};

use core::time::Duration;

use crate::error::BuildError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default capacity used by configuration helpers
pub const DEFAULT_CAPACITY: usize = 16;

/// Durations below this are flagged with [`Warning::SmallDuration`]
///
/// [`Warning::SmallDuration`]: crate::error::Warning::SmallDuration
pub const DEFAULT_MIN_RESOLUTION: Duration = Duration::from_millis(1);

/// A payload and how long it stays active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action<T> {
    /// Time the action stays active before the next one is due
    pub duration: Duration,
    /// Caller payload; never inspected by the sequencers
    pub value: T,
}

impl<T> Action<T> {
    /// Create an action
    pub const fn new(duration: Duration, value: T) -> Self {
        Self { duration, value }
    }

    /// Create an action lasting `millis` milliseconds
    pub const fn from_millis(millis: u64, value: T) -> Self {
        Self::new(Duration::from_millis(millis), value)
    }

    /// Create an action from a signed microsecond count
    ///
    /// Rejects negative durations, which is how untrusted input (config
    /// files, host commands) reaches [`BuildError::NegativeDuration`].
    /// `index` is the position reported in the error.
    pub fn try_from_micros(micros: i64, value: T, index: usize) -> Result<Self, BuildError> {
        let micros = u64::try_from(micros).map_err(|_| BuildError::NegativeDuration { index })?;
        Ok(Self::new(Duration::from_micros(micros), value))
    }
}

/// Timing discipline a table is validated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Timing {
    /// Keep the cycle period; late actions are shortened
    #[default]
    Strict,
    /// Keep each action's minimum duration; lateness accumulates
    Loose,
}

impl Timing {
    /// Whether actions of this discipline may last zero time
    pub const fn allows_zero_duration(&self) -> bool {
        matches!(self, Timing::Loose)
    }
}

/// Table validation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Timing discipline
    pub timing: Timing,
    /// Shortest duration considered safe to poll for
    pub min_resolution: Duration,
}

impl TableConfig {
    /// Default settings for the given discipline
    pub const fn new(timing: Timing) -> Self {
        Self {
            timing,
            min_resolution: DEFAULT_MIN_RESOLUTION,
        }
    }

    /// Override the minimum safe resolution
    pub const fn with_min_resolution(mut self, min_resolution: Duration) -> Self {
        self.min_resolution = min_resolution;
        self
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}
