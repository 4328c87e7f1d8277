//! Validated, fixed-capacity action tables

use core::time::Duration;

use heapless::Vec;

use super::{Action, TableConfig, Timing};
use crate::error::{BuildError, Warning};

/// Where an elapsed time falls inside one pass over a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Index of the action covering the elapsed time
    pub index: usize,
    /// Time left until that action ends
    pub remaining: Duration,
}

/// Find the action active `elapsed` after the start of a pass
///
/// Returns the first action whose cumulative end time lies strictly after
/// `elapsed`, or `None` once `elapsed` reaches the end of the pass.
/// Zero-duration actions never cover any instant and are skipped.
pub fn locate<T>(actions: &[Action<T>], elapsed: Duration) -> Option<Position> {
    let mut end = Duration::ZERO;
    for (index, action) in actions.iter().enumerate() {
        end = end.saturating_add(action.duration);
        if elapsed < end {
            return Some(Position {
                index,
                remaining: end - elapsed,
            });
        }
    }
    None
}

/// An ordered, non-empty list of actions
///
/// The table owns a copy of its actions in a `heapless::Vec` of capacity
/// `N`, so the caller's slice can be reused or dropped after construction.
/// The total duration of one pass is computed once here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable<T, const N: usize> {
    actions: Vec<Action<T>, N>,
    cycle: Duration,
    timing: Timing,
}

impl<T: Clone, const N: usize> ActionTable<T, N> {
    /// Copy and validate `actions` with default settings
    pub fn new(
        actions: &[Action<T>],
        timing: Timing,
    ) -> Result<(Self, Option<Warning>), BuildError> {
        Self::with_config(actions, &TableConfig::new(timing))
    }

    /// Copy and validate `actions`
    pub fn with_config(
        actions: &[Action<T>],
        config: &TableConfig,
    ) -> Result<(Self, Option<Warning>), BuildError> {
        if actions.is_empty() {
            return Err(BuildError::EmptyTable);
        }
        let actions = Vec::from_slice(actions).map_err(|_| BuildError::TableFull)?;
        Self::from_vec(actions, config)
    }
}

impl<T, const N: usize> ActionTable<T, N> {
    /// Validate an already-owned list of actions
    pub fn from_vec(
        actions: Vec<Action<T>, N>,
        config: &TableConfig,
    ) -> Result<(Self, Option<Warning>), BuildError> {
        let (cycle, warning) = validate(&actions, config)?;

        #[cfg(feature = "defmt")]
        if let Some(Warning::SmallDuration { index }) = warning {
            defmt::warn!(
                "action {} is below the {} us resolution and may be missed",
                index,
                config.min_resolution.as_micros() as u64
            );
        }

        let table = Self {
            actions,
            cycle,
            timing: config.timing,
        };
        Ok((table, warning))
    }

    /// Number of actions (never zero)
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always false; tables are validated non-empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action at `index`
    pub fn get(&self, index: usize) -> Option<&Action<T>> {
        self.actions.get(index)
    }

    /// All actions in execution order
    pub fn as_slice(&self) -> &[Action<T>] {
        &self.actions
    }

    /// Iterate over actions in execution order
    pub fn iter(&self) -> core::slice::Iter<'_, Action<T>> {
        self.actions.iter()
    }

    /// Sum of all action durations: the length of one cycle
    pub fn cycle_duration(&self) -> Duration {
        self.cycle
    }

    /// Discipline the table was validated for
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Re-tag the discipline after a sequencer adopts the table
    pub(crate) fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// First zero-duration action, if any
    pub fn first_zero_duration(&self) -> Option<usize> {
        self.actions.iter().position(|a| a.duration.is_zero())
    }

    /// Locate `elapsed` within one pass over this table
    pub fn locate(&self, elapsed: Duration) -> Option<Position> {
        locate(&self.actions, elapsed)
    }

    /// Payload at `index`, wrapping around the table
    pub(crate) fn wrapped(&self, index: u64) -> &Action<T> {
        // len is non-zero and fits in u64, so the remainder is a valid index
        let slot = (index % self.actions.len() as u64) as usize;
        &self.actions[slot]
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a ActionTable<T, N> {
    type Item = &'a Action<T>;
    type IntoIter = core::slice::Iter<'a, Action<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate<T>(
    actions: &[Action<T>],
    config: &TableConfig,
) -> Result<(Duration, Option<Warning>), BuildError> {
    if actions.is_empty() {
        return Err(BuildError::EmptyTable);
    }

    let mut cycle = Duration::ZERO;
    let mut warning = None;
    for (index, action) in actions.iter().enumerate() {
        if action.duration.is_zero() && !config.timing.allows_zero_duration() {
            return Err(BuildError::ZeroDuration { index });
        }
        if warning.is_none() && action.duration < config.min_resolution {
            warning = Some(Warning::SmallDuration { index });
        }
        cycle = cycle
            .checked_add(action.duration)
            .ok_or(BuildError::DurationOverflow)?;
    }

    // Sequencers do their arithmetic on u64 nanoseconds
    if u64::try_from(cycle.as_nanos()).is_err() {
        return Err(BuildError::DurationOverflow);
    }

    Ok((cycle, warning))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64, value: u8) -> Action<u8> {
        Action::from_millis(millis, value)
    }

    #[test]
    fn test_cycle_duration_is_sum() {
        let actions = [ms(500, 20), ms(500, 30), ms(500, 50)];
        let (table, warning) = ActionTable::<u8, 4>::new(&actions, Timing::Strict).unwrap();

        assert_eq!(table.cycle_duration(), Duration::from_millis(1500));
        assert_eq!(table.len(), 3);
        assert!(warning.is_none());
    }

    #[test]
    fn test_empty_table() {
        let result = ActionTable::<u8, 4>::new(&[], Timing::Loose);
        assert_eq!(result.unwrap_err(), BuildError::EmptyTable);
    }

    #[test]
    fn test_zero_duration_strict_only() {
        let actions = [ms(10, 1), ms(0, 2)];

        let strict = ActionTable::<u8, 4>::new(&actions, Timing::Strict);
        assert_eq!(strict.unwrap_err(), BuildError::ZeroDuration { index: 1 });

        let (loose, _) = ActionTable::<u8, 4>::new(&actions, Timing::Loose).unwrap();
        assert_eq!(loose.first_zero_duration(), Some(1));
        assert_eq!(loose.cycle_duration(), Duration::from_millis(10));
    }

    #[test]
    fn test_small_duration_warning() {
        let actions = [
            ms(10, 1),
            Action::new(Duration::from_micros(200), 2),
            Action::new(Duration::from_micros(300), 3),
        ];
        let (table, warning) = ActionTable::<u8, 4>::new(&actions, Timing::Strict).unwrap();

        // Table is still usable; only the first offender is reported
        assert_eq!(warning, Some(Warning::SmallDuration { index: 1 }));
        assert_eq!(table.len(), 3);

        let config =
            TableConfig::new(Timing::Strict).with_min_resolution(Duration::from_micros(100));
        let (_, warning) = ActionTable::<u8, 4>::with_config(&actions, &config).unwrap();
        assert!(warning.is_none());
    }

    #[test]
    fn test_capacity() {
        let actions = [ms(1, 1), ms(1, 2), ms(1, 3)];
        let result = ActionTable::<u8, 2>::new(&actions, Timing::Strict);
        assert_eq!(result.unwrap_err(), BuildError::TableFull);
    }

    #[test]
    fn test_duration_overflow() {
        let actions = [
            Action::new(Duration::from_nanos(u64::MAX), 1),
            Action::new(Duration::from_nanos(1), 2),
        ];
        let result = ActionTable::<u8, 2>::new(&actions, Timing::Strict);
        assert_eq!(result.unwrap_err(), BuildError::DurationOverflow);
    }

    #[test]
    fn test_table_owns_copy() {
        let mut actions = [ms(100, 1), ms(200, 2)];
        let (table, _) = ActionTable::<u8, 4>::new(&actions, Timing::Strict).unwrap();

        actions[0].value = 99;
        assert_eq!(table.get(0).map(|a| a.value), Some(1));
    }

    #[test]
    fn test_locate() {
        let actions = [ms(500, 20), ms(500, 30), ms(500, 50)];

        let pos = locate(&actions, Duration::ZERO).unwrap();
        assert_eq!(pos.index, 0);
        assert_eq!(pos.remaining, Duration::from_millis(500));

        // Boundaries belong to the next action
        let pos = locate(&actions, Duration::from_millis(500)).unwrap();
        assert_eq!(pos.index, 1);
        assert_eq!(pos.remaining, Duration::from_millis(500));

        let pos = locate(&actions, Duration::from_millis(1499)).unwrap();
        assert_eq!(pos.index, 2);
        assert_eq!(pos.remaining, Duration::from_millis(1));

        assert!(locate(&actions, Duration::from_millis(1500)).is_none());
    }

    #[test]
    fn test_locate_skips_zero_duration() {
        let actions = [ms(0, 1), ms(10, 2), ms(0, 3)];
        assert_eq!(locate(&actions, Duration::ZERO).map(|p| p.index), Some(1));
        assert!(locate(&actions, Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_wrapped() {
        let actions = [ms(1, 1), ms(1, 2), ms(1, 3)];
        let (table, _) = ActionTable::<u8, 4>::new(&actions, Timing::Loose).unwrap();

        assert_eq!(table.wrapped(0).value, 1);
        assert_eq!(table.wrapped(4).value, 2);
        assert_eq!(table.wrapped(8).value, 3);
    }
}
