//! Strict, drift-free sequencer
//!
//! Position in the schedule is derived from the time elapsed since
//! `begin`, never from when actions were actually observed. Cycle `k`
//! always starts exactly `k * cycle_duration` after the start instant, so
//! a late poll shortens the current action instead of pushing the rest of
//! the schedule back.
//!
//! The price is that every action must be observed: if the loop polls so
//! rarely that an action starts and ends between two polls, the sequencer
//! fails with [`PollError::MissedAction`] and stays failed until the next
//! `begin`.

use core::time::Duration;

use super::{Iterations, Sequencer, Step};
use crate::action::{Action, ActionTable, TableConfig, Timing};
use crate::error::{BuildError, PollError, Warning};
use crate::time::{duration_nanos, Instant};

/// Last triggered action: which cycle, and which index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    cycle: u64,
    index: usize,
}

impl Cursor {
    const FIRST: Cursor = Cursor { cycle: 0, index: 0 };

    /// The action that must trigger after this one
    fn successor(self, len: usize) -> Cursor {
        if self.index + 1 < len {
            Cursor {
                cycle: self.cycle,
                index: self.index + 1,
            }
        } else {
            Cursor {
                cycle: self.cycle + 1,
                index: 0,
            }
        }
    }
}

/// Sequencer that preserves the periodicity of the whole group
///
/// Use it when actions are much longer than the loop period and staying in
/// step with other groups matters more than giving each action its full
/// duration.
///
/// - An action triggered late keeps its nominal end time, so it runs short.
/// - An action that is never observed fails the group.
#[derive(Debug, Clone)]
pub struct SyncSequencer<T, const N: usize> {
    table: ActionTable<T, N>,
    iterations: Iterations,
    start: Option<Instant>,
    last: Option<Cursor>,
    failed: bool,
}

impl<T: Clone, const N: usize> SyncSequencer<T, N> {
    /// Copy `actions` into a strict table and build a sequencer over it
    ///
    /// Every action must last longer than zero. A
    /// [`Warning::SmallDuration`] is returned alongside the sequencer when
    /// an action is short enough to be missed by a slow loop.
    pub fn new(
        actions: &[Action<T>],
        iterations: Iterations,
    ) -> Result<(Self, Option<Warning>), BuildError> {
        let config = TableConfig::new(Timing::Strict);
        let (table, warning) = ActionTable::with_config(actions, &config)?;
        Ok((Self::from_table(table, iterations)?, warning))
    }
}

impl<T, const N: usize> SyncSequencer<T, N> {
    /// Build a sequencer over an existing table
    ///
    /// Tables validated for loose timing are accepted as long as none of
    /// their actions has zero duration, and are re-tagged as strict.
    pub fn from_table(
        mut table: ActionTable<T, N>,
        iterations: Iterations,
    ) -> Result<Self, BuildError> {
        if let Some(index) = table.first_zero_duration() {
            return Err(BuildError::ZeroDuration { index });
        }
        table.set_timing(Timing::Strict);
        Ok(Self {
            table,
            iterations,
            start: None,
            last: None,
            failed: false,
        })
    }

    /// The schedule being run
    pub fn table(&self) -> &ActionTable<T, N> {
        &self.table
    }

    /// Index of the most recently triggered action
    pub fn last_index(&self) -> Option<usize> {
        self.last.map(|c| c.index)
    }

    /// Whether an action was missed since the last `begin`
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn fail(&mut self, expected: Cursor) -> PollError {
        self.failed = true;

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "sync sequencer missed action {} in cycle {}",
            expected.index,
            expected.cycle
        );

        PollError::MissedAction {
            skipped: expected.index,
        }
    }
}

impl<T, const N: usize> Sequencer for SyncSequencer<T, N> {
    type Value = T;

    fn begin(&mut self, now: Instant) {
        #[cfg(feature = "defmt")]
        defmt::debug!("sync sequencer begins at {} us", now.as_micros());

        self.start = Some(now);
        self.last = None;
        self.failed = false;
    }

    fn poll(&mut self, now: Instant) -> Result<Step<&T>, PollError> {
        let start = self.start.ok_or(PollError::NotStarted)?;
        if self.failed {
            return Err(PollError::GroupFailed);
        }
        let Some(elapsed) = now.checked_duration_since(start) else {
            return Ok(Step::Wait { next: start - now });
        };

        // Non-zero: strict tables have no zero-duration actions
        let cycle_nanos = duration_nanos(self.table.cycle_duration());
        let elapsed_nanos = duration_nanos(elapsed);
        let cycle = elapsed_nanos / cycle_nanos;

        let expected = match self.last {
            Some(last) => last.successor(self.table.len()),
            None => Cursor::FIRST,
        };

        if let Iterations::Finite(count) = self.iterations {
            let count = u64::from(count.get());
            if cycle >= count {
                // Past the final cycle. Done only if its last action was seen.
                if expected.cycle >= count {
                    return Ok(Step::Done);
                }
                return Err(self.fail(expected));
            }
        }

        let offset = Duration::from_nanos(elapsed_nanos % cycle_nanos);
        // offset < cycle_duration, so some action always covers it. A table
        // that disagrees with its own cycle length cannot be followed.
        let Some(position) = self.table.locate(offset) else {
            return Err(self.fail(expected));
        };
        let current = Cursor {
            cycle,
            index: position.index,
        };

        if self.last == Some(current) {
            return Ok(Step::Wait {
                next: position.remaining,
            });
        }
        if current != expected {
            return Err(self.fail(expected));
        }

        self.last = Some(current);
        Ok(Step::Trigger {
            value: &self.table.as_slice()[position.index].value,
            next: position.remaining,
        })
    }

    fn cycle_duration(&self) -> Duration {
        self.table.cycle_duration()
    }

    fn start_instant(&self) -> Option<Instant> {
        self.start
    }

    fn iterations(&self) -> Iterations {
        self.iterations
    }
}
