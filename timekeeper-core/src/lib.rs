//! Pure timing logic library with no platform dependencies.
//! Testable on host, usable from any controller that owns a clock.
//!
//! Every query takes `now_ms` explicitly, so the same state answers
//! consistently no matter how often it is polled. Timestamps are wall-clock
//! milliseconds since the UNIX epoch; a clock that jumps backwards is
//! absorbed by saturating arithmetic instead of producing negative times.

pub mod clock;
pub mod countdown;
pub mod error;
pub mod format;
pub mod laps;
pub mod snapshot;
pub mod stopwatch;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{Countdown, ExpiryPolicy, Poll};
pub use error::{TimerError, TimerResult};
pub use laps::{LapLedger, LapRecord};
pub use snapshot::{CountdownSnapshot, ReloadPolicy, StopwatchSnapshot};
pub use stopwatch::Stopwatch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle shared by stopwatches and countdowns.
///
/// `Expired` is only reachable by a countdown that holds at zero after its
/// deadline; under the rearming policy an expiry goes straight back to
/// `Idle`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
}
