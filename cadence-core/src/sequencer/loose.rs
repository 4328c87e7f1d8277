//! Tolerant sequencer
//!
//! Each action is timed from the poll that triggered it, so an action
//! always lasts at least its declared duration. Lateness shifts the rest of
//! the schedule back instead of failing it.

use core::time::Duration;

use super::{Iterations, Sequencer, Step};
use crate::action::{Action, ActionTable, TableConfig, Timing};
use crate::error::{BuildError, PollError, Warning};
use crate::time::Instant;

/// Most recently triggered action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Active {
    /// Actions triggered before this one since `begin`; wraps over the table
    sequence: u64,
    /// When it was triggered
    anchor: Instant,
}

/// Sequencer that guarantees each action its minimum duration
///
/// Use it when actions may be very short (or zero) compared to the loop
/// period, and staying in step with other groups does not matter.
///
/// - Each action stays active for at least its duration.
/// - Triggering late is never penalized; the sequencer cannot fail.
#[derive(Debug, Clone)]
pub struct LooseSequencer<T, const N: usize> {
    table: ActionTable<T, N>,
    iterations: Iterations,
    start: Option<Instant>,
    active: Option<Active>,
}

impl<T: Clone, const N: usize> LooseSequencer<T, N> {
    /// Copy `actions` into a loose table and build a sequencer over it
    ///
    /// Zero-duration actions are allowed.
    pub fn new(
        actions: &[Action<T>],
        iterations: Iterations,
    ) -> Result<(Self, Option<Warning>), BuildError> {
        let (table, warning) = ActionTable::with_config(actions, &TableConfig::new(Timing::Loose))?;
        Ok((Self::from_table(table, iterations), warning))
    }
}

impl<T, const N: usize> LooseSequencer<T, N> {
    /// Build a sequencer over an existing table
    pub fn from_table(table: ActionTable<T, N>, iterations: Iterations) -> Self {
        Self {
            table,
            iterations,
            start: None,
            active: None,
        }
    }

    /// The schedule being run
    pub fn table(&self) -> &ActionTable<T, N> {
        &self.table
    }

    /// Index of the most recently triggered action
    pub fn last_index(&self) -> Option<usize> {
        let len = self.table.len() as u64;
        self.active.map(|a| (a.sequence % len) as usize)
    }

    /// Whether `sequence` is within the configured iterations
    fn allows(&self, sequence: u64) -> bool {
        match self.iterations {
            Iterations::Unbounded => true,
            Iterations::Finite(count) => {
                let limit = (self.table.len() as u64).saturating_mul(u64::from(count.get()));
                sequence < limit
            }
        }
    }

    fn trigger(&mut self, sequence: u64, now: Instant) -> Step<&T> {
        self.active = Some(Active {
            sequence,
            anchor: now,
        });
        let action = self.table.wrapped(sequence);

        // The full duration: the action runs at least this long from now
        Step::Trigger {
            value: &action.value,
            next: action.duration,
        }
    }
}

impl<T, const N: usize> Sequencer for LooseSequencer<T, N> {
    type Value = T;

    fn begin(&mut self, now: Instant) {
        #[cfg(feature = "defmt")]
        defmt::debug!("loose sequencer begins at {} us", now.as_micros());

        self.start = Some(now);
        self.active = None;
    }

    fn poll(&mut self, now: Instant) -> Result<Step<&T>, PollError> {
        let start = self.start.ok_or(PollError::NotStarted)?;
        if now < start {
            return Ok(Step::Wait { next: start - now });
        }

        let Some(active) = self.active else {
            return Ok(self.trigger(0, now));
        };

        let duration = self.table.wrapped(active.sequence).duration;
        let running = now.saturating_duration_since(active.anchor);
        if running < duration {
            return Ok(Step::Wait {
                next: duration - running,
            });
        }

        let sequence = active.sequence + 1;
        if !self.allows(sequence) {
            return Ok(Step::Done);
        }
        Ok(self.trigger(sequence, now))
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

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;

    fn ms(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    fn example() -> [Action<u32>; 3] {
        [
            Action::from_millis(500, 20),
            Action::from_millis(500, 30),
            Action::from_millis(500, 50),
        ]
    }

    fn run(
        seq: &mut LooseSequencer<u32, 8>,
        from_ms: u64,
        to_ms: u64,
        step_ms: u64,
    ) -> Vec<(u64, u32)> {
        let mut triggered = Vec::new();
        let mut t = from_ms;
        while t <= to_ms {
            if let Step::Trigger { value, .. } = seq.poll(ms(t)).unwrap() {
                triggered.push((t, *value));
            }
            t += step_ms;
        }
        triggered
    }

    #[test]
    fn test_poll_before_begin() {
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&example(), Iterations::ONCE).unwrap();
        assert_eq!(seq.poll(ms(0)), Err(PollError::NotStarted));
        assert_eq!(seq.last_index(), None);
    }

    #[test]
    fn test_single_pass() {
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&example(), Iterations::ONCE).unwrap();
        seq.begin(ms(0));

        let triggered = run(&mut seq, 0, 1499, 250);
        assert_eq!(triggered, [(0, 20), (500, 30), (1000, 50)]);
        assert_eq!(seq.poll(ms(1500)), Ok(Step::Done));
        assert_eq!(seq.poll(ms(60_000)), Ok(Step::Done));
    }

    #[test]
    fn test_first_poll_triggers_immediately() {
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&example(), Iterations::ONCE).unwrap();
        seq.begin(ms(0));

        // Even far past the nominal schedule, action 0 runs first
        assert_eq!(
            seq.poll(ms(10_000)),
            Ok(Step::Trigger {
                value: &20,
                next: Duration::from_millis(500)
            })
        );
        assert_eq!(seq.last_index(), Some(0));
    }

    #[test]
    fn test_lateness_is_absorbed() {
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&example(), Iterations::ONCE).unwrap();
        seq.begin(ms(0));
        seq.poll(ms(0)).unwrap();

        // Coarse poll: one advance per poll, never a missed-action error
        assert_eq!(seq.poll(ms(2000)).unwrap().copied().into_value(), Some(30));
        assert_eq!(
            seq.poll(ms(2100)),
            Ok(Step::Wait {
                next: Duration::from_millis(400)
            })
        );
        assert_eq!(seq.poll(ms(2500)).unwrap().copied().into_value(), Some(50));
        assert_eq!(seq.poll(ms(2999)).map(|s| s.is_trigger()), Ok(false));
        assert_eq!(seq.poll(ms(3000)), Ok(Step::Done));
    }

    #[test]
    fn test_begin_in_future() {
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&example(), Iterations::ONCE).unwrap();
        seq.begin(ms(100));
        assert_eq!(
            seq.poll(ms(40)),
            Ok(Step::Wait {
                next: Duration::from_millis(60)
            })
        );
    }

    #[test]
    fn test_zero_duration_actions() {
        let actions = [
            Action::from_millis(0, 1),
            Action::from_millis(10, 2),
            Action::from_millis(0, 3),
        ];
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&actions, Iterations::ONCE).unwrap();
        assert_eq!(seq.cycle_duration(), Duration::from_millis(10));
        seq.begin(ms(0));

        assert_eq!(
            seq.poll(ms(0)),
            Ok(Step::Trigger {
                value: &1,
                next: Duration::ZERO
            })
        );
        // Zero-duration action is immediately eligible to advance
        assert_eq!(seq.poll(ms(0)).unwrap().copied().into_value(), Some(2));
        assert_eq!(seq.poll(ms(5)).map(|s| s.next()), Ok(Duration::from_millis(5)));
        assert_eq!(seq.poll(ms(10)).unwrap().copied().into_value(), Some(3));
        assert_eq!(seq.poll(ms(10)), Ok(Step::Done));
    }

    #[test]
    fn test_unbounded_wraps() {
        let actions = [Action::from_millis(100, 1), Action::from_millis(200, 2)];
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&actions, Iterations::Unbounded).unwrap();
        seq.begin(ms(0));

        let triggered = run(&mut seq, 0, 900, 50);
        assert_eq!(
            triggered,
            [(0, 1), (100, 2), (300, 1), (400, 2), (600, 1), (700, 2), (900, 1)]
        );
        assert_eq!(seq.last_index(), Some(0));
    }

    #[test]
    fn test_bounded_repetition() {
        let actions = [Action::from_millis(100, 1), Action::from_millis(200, 2)];
        let iterations = Iterations::finite(2).unwrap();
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&actions, iterations).unwrap();
        seq.begin(ms(0));

        let triggered = run(&mut seq, 0, 599, 50);
        assert_eq!(triggered, [(0, 1), (100, 2), (300, 1), (400, 2)]);
        assert_eq!(seq.poll(ms(600)), Ok(Step::Done));
    }

    #[test]
    fn test_begin_resets_identically() {
        let (mut seq, _) = LooseSequencer::<u32, 8>::new(&example(), Iterations::ONCE).unwrap();

        seq.begin(ms(0));
        let first = run(&mut seq, 0, 2000, 70);

        seq.begin(ms(0));
        seq.begin(ms(0));
        let second = run(&mut seq, 0, 2000, 70);

        assert_eq!(first, second);
    }

    #[test]
    fn test_small_duration_warning() {
        let actions = [Action::new(Duration::from_micros(10), 1u32)];
        let (_, warning) = LooseSequencer::<u32, 8>::new(&actions, Iterations::ONCE).unwrap();
        assert_eq!(warning, Some(Warning::SmallDuration { index: 0 }));
    }
}
