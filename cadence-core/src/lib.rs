//! Polled action sequencer for control loops
//!
//! Given an ordered list of `(duration, value)` actions, a sequencer tells
//! the loop on each poll which action (if any) is due now, and how long
//! until the next one. There are no timers, threads or sleeps: the loop
//! passes in its own clock reading every time.
//!
//! - [`action`]: actions and validated action tables
//! - [`sequencer`]: the strict ([`SyncSequencer`]) and loose
//!   ([`LooseSequencer`]) engines behind one [`Sequencer`] trait
//! - [`config`]: serializable schedule definitions (`serde` feature)
//! - [`time`]: the caller-supplied [`Instant`]
//!
//! ```
//! use cadence_core::{Action, Instant, Iterations, Sequencer, Step, SyncSequencer};
//!
//! let actions = [
//!     Action::from_millis(500, 20),
//!     Action::from_millis(500, 30),
//!     Action::from_millis(500, 50),
//! ];
//! let (mut seq, _warning) = SyncSequencer::<u32, 4>::new(&actions, Iterations::ONCE).unwrap();
//!
//! let mut sum = 0;
//! seq.begin(Instant::ZERO);
//! for tick in 0.. {
//!     // A 250 ms loop
//!     let now = Instant::from_millis(tick * 250);
//!     match seq.poll(now).unwrap() {
//!         Step::Trigger { value, .. } => sum += *value,
//!         Step::Wait { .. } => continue,
//!         Step::Done => break,
//!     }
//! }
//! assert_eq!(sum, 100);
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod action;
#[cfg(feature = "serde")]
pub mod config;
pub mod error;
pub mod sequencer;
pub mod time;

pub use action::{Action, ActionTable, TableConfig, Timing};
#[cfg(feature = "serde")]
pub use config::{ActionConfig, ConfigError, ConfiguredSequencer, ScheduleConfig};
pub use error::{BuildError, PollError, Warning};
pub use sequencer::{Iterations, LooseSequencer, Sequencer, Step, SyncSequencer};
pub use time::Instant;
