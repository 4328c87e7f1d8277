//! Configuration types
//!
//! Serializable schedule definitions. The binary form is postcard (for
//! flash or a host link); the human form is TOML (with the `toml`
//! feature). Both decode into a [`ScheduleConfig`] that builds a
//! sequencer of the configured discipline.

use core::fmt;
use core::time::Duration;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionTable, TableConfig, Timing, DEFAULT_MIN_RESOLUTION};
use crate::error::{BuildError, PollError, Warning};
use crate::sequencer::{Iterations, LooseSequencer, Sequencer, Step, SyncSequencer};
use crate::time::Instant;

/// Configuration decoding/encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Binary data is malformed or does not fit the capacity
    Decode,
    /// Output buffer too small
    Encode,
    /// TOML text is malformed or has invalid values
    Toml,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Decode => f.write_str("invalid binary schedule config"),
            ConfigError::Encode => f.write_str("buffer too small for schedule config"),
            ConfigError::Toml => f.write_str("invalid TOML schedule config"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// One configured action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig<T> {
    /// Duration in microseconds; negative values are rejected on build
    pub duration_us: i64,
    /// Action payload
    pub value: T,
}

impl<T> ActionConfig<T> {
    /// Create an action config
    pub const fn new(duration_us: i64, value: T) -> Self {
        Self { duration_us, value }
    }
}

fn default_min_resolution_us() -> u64 {
    DEFAULT_MIN_RESOLUTION.as_micros() as u64
}

/// A complete schedule definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig<T, const N: usize> {
    /// Timing discipline (default strict)
    #[serde(default)]
    pub timing: Timing,
    /// Positive count, or -1 for unbounded (default 1)
    #[serde(default)]
    pub iterations: Iterations,
    /// Durations below this many microseconds raise a warning
    #[serde(default = "default_min_resolution_us")]
    pub min_resolution_us: u64,
    /// Actions in execution order
    pub actions: Vec<ActionConfig<T>, N>,
}

impl<T, const N: usize> ScheduleConfig<T, N> {
    /// Empty strict, single-pass schedule
    pub fn new() -> Self {
        Self {
            timing: Timing::default(),
            iterations: Iterations::default(),
            min_resolution_us: default_min_resolution_us(),
            actions: Vec::new(),
        }
    }

    /// Table validation settings described by this config
    pub fn table_config(&self) -> TableConfig {
        TableConfig::new(self.timing)
            .with_min_resolution(Duration::from_micros(self.min_resolution_us))
    }

    /// Validate the actions into a table
    pub fn into_table(self) -> Result<(ActionTable<T, N>, Option<Warning>), BuildError> {
        let config = self.table_config();
        let mut actions = Vec::new();
        for (index, action) in self.actions.into_iter().enumerate() {
            let action = Action::try_from_micros(action.duration_us, action.value, index)?;
            actions.push(action).map_err(|_| BuildError::TableFull)?;
        }
        ActionTable::from_vec(actions, &config)
    }

    /// Build a sequencer of the configured discipline
    pub fn build(self) -> Result<(ConfiguredSequencer<T, N>, Option<Warning>), BuildError> {
        let timing = self.timing;
        let iterations = self.iterations;
        let (table, warning) = self.into_table()?;

        let sequencer = match timing {
            Timing::Strict => {
                ConfiguredSequencer::Sync(SyncSequencer::from_table(table, iterations)?)
            }
            Timing::Loose => {
                ConfiguredSequencer::Loose(LooseSequencer::from_table(table, iterations))
            }
        };
        Ok((sequencer, warning))
    }
}

impl<T, const N: usize> Default for ScheduleConfig<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize, const N: usize> ScheduleConfig<T, N> {
    /// Encode as postcard into `buf`, returning the used part
    pub fn to_postcard<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encode)
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> ScheduleConfig<T, N> {
    /// Decode from postcard bytes
    pub fn from_postcard(bytes: &'de [u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("schedule config decode failed: {}", defmt::Debug2Format(&_e));
            ConfigError::Decode
        })
    }
}

#[cfg(feature = "toml")]
impl<T: serde::de::DeserializeOwned, const N: usize> ScheduleConfig<T, N> {
    /// Parse from TOML text
    ///
    /// ```toml
    /// timing = "loose"
    /// iterations = -1
    ///
    /// [[actions]]
    /// duration_us = 500000
    /// value = 20
    /// ```
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("schedule config TOML error: {}", defmt::Debug2Format(&_e));
            ConfigError::Toml
        })
    }
}

/// A sequencer whose discipline was chosen by configuration
#[derive(Debug, Clone)]
pub enum ConfiguredSequencer<T, const N: usize> {
    /// Strict timing
    Sync(SyncSequencer<T, N>),
    /// Loose timing
    Loose(LooseSequencer<T, N>),
}

impl<T, const N: usize> ConfiguredSequencer<T, N> {
    /// Discipline of the inner sequencer
    pub fn timing(&self) -> Timing {
        match self {
            ConfiguredSequencer::Sync(_) => Timing::Strict,
            ConfiguredSequencer::Loose(_) => Timing::Loose,
        }
    }

    /// The schedule being run
    pub fn table(&self) -> &ActionTable<T, N> {
        match self {
            ConfiguredSequencer::Sync(s) => s.table(),
            ConfiguredSequencer::Loose(s) => s.table(),
        }
    }

    /// Index of the most recently triggered action
    pub fn last_index(&self) -> Option<usize> {
        match self {
            ConfiguredSequencer::Sync(s) => s.last_index(),
            ConfiguredSequencer::Loose(s) => s.last_index(),
        }
    }
}

impl<T, const N: usize> Sequencer for ConfiguredSequencer<T, N> {
    type Value = T;

    fn begin(&mut self, now: Instant) {
        match self {
            ConfiguredSequencer::Sync(s) => s.begin(now),
            ConfiguredSequencer::Loose(s) => s.begin(now),
        }
    }

    fn poll(&mut self, now: Instant) -> Result<Step<&T>, PollError> {
        match self {
            ConfiguredSequencer::Sync(s) => s.poll(now),
            ConfiguredSequencer::Loose(s) => s.poll(now),
        }
    }

    fn cycle_duration(&self) -> Duration {
        match self {
            ConfiguredSequencer::Sync(s) => s.cycle_duration(),
            ConfiguredSequencer::Loose(s) => s.cycle_duration(),
        }
    }

    fn start_instant(&self) -> Option<Instant> {
        match self {
            ConfiguredSequencer::Sync(s) => s.start_instant(),
            ConfiguredSequencer::Loose(s) => s.start_instant(),
        }
    }

    fn iterations(&self) -> Iterations {
        match self {
            ConfiguredSequencer::Sync(s) => s.iterations(),
            ConfiguredSequencer::Loose(s) => s.iterations(),
        }
    }
}
