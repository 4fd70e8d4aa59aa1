//! Serializable state records for surviving process restarts.

use log::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::countdown::{Countdown, ExpiryPolicy};
use crate::error::{TimerError, TimerResult};
use crate::laps::{LapLedger, LapRecord};
use crate::stopwatch::Stopwatch;

/// How a snapshot that was taken while running comes back.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReloadPolicy {
    /// Keep running from the stored start time or deadline
    Resume,
    /// Drop the running session: stopwatches zero, countdowns cancel
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StopwatchSnapshot {
    pub accumulated_ms: u64,
    pub is_running: bool,
    pub run_started_at_ms: Option<u64>,
    pub laps: Vec<LapRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CountdownSnapshot {
    pub total_ms: Option<u64>,
    pub remaining_ms: u64,
    pub is_running: bool,
    pub deadline_ms: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub expired: bool,
}

impl Stopwatch {
    pub fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            accumulated_ms: self.accumulated_ms(),
            is_running: self.is_running(),
            run_started_at_ms: self.run_started_at_ms(),
            laps: self.laps().as_slice().to_vec(),
        }
    }

    pub fn restore(snapshot: StopwatchSnapshot, policy: ReloadPolicy) -> TimerResult<Self> {
        if snapshot.is_running != snapshot.run_started_at_ms.is_some() {
            return Err(TimerError::InvalidSnapshot("running flag disagrees with start time"));
        }
        let laps = LapLedger::from_records(snapshot.laps)?;
        if !snapshot.is_running {
            if let Some(last) = laps.last() {
                if last.cumulative_ms > snapshot.accumulated_ms {
                    return Err(TimerError::InvalidSnapshot("lap recorded after stop time"));
                }
            }
        }

        if snapshot.is_running && policy == ReloadPolicy::Reset {
            info!("discarding stopwatch that was running at shutdown");
            return Ok(Stopwatch::new());
        }
        Ok(Stopwatch::from_parts(
            snapshot.accumulated_ms,
            snapshot.run_started_at_ms,
            laps,
        ))
    }
}

impl Countdown {
    pub fn snapshot(&self, now_ms: u64) -> CountdownSnapshot {
        CountdownSnapshot {
            total_ms: self.total_ms(),
            remaining_ms: self.remaining_ms(now_ms),
            is_running: self.is_running(),
            deadline_ms: self.deadline_ms(),
            expired: self.is_expired(),
        }
    }

    pub fn restore(
        snapshot: CountdownSnapshot,
        expiry: ExpiryPolicy,
        policy: ReloadPolicy,
    ) -> TimerResult<Self> {
        if snapshot.is_running != snapshot.deadline_ms.is_some() {
            return Err(TimerError::InvalidSnapshot("running flag disagrees with deadline"));
        }
        if snapshot.expired && snapshot.is_running {
            return Err(TimerError::InvalidSnapshot("expired countdown cannot be running"));
        }
        match snapshot.total_ms {
            Some(0) => return Err(TimerError::InvalidDuration),
            Some(total) if snapshot.remaining_ms > total => {
                return Err(TimerError::InvalidSnapshot("remaining exceeds total"));
            }
            None if snapshot.is_running || snapshot.remaining_ms > 0 => {
                return Err(TimerError::InvalidSnapshot("unarmed countdown has time left"));
            }
            _ => {}
        }

        let mut countdown = Countdown::from_parts(
            snapshot.total_ms,
            snapshot.remaining_ms,
            snapshot.deadline_ms,
            snapshot.expired,
            expiry,
        );
        if snapshot.is_running && policy == ReloadPolicy::Reset {
            info!("cancelling countdown that was running at shutdown");
            countdown.cancel();
        } else if snapshot.expired && expiry == ExpiryPolicy::Rearm {
            debug!("rearming countdown held at zero");
            countdown.cancel();
        }
        Ok(countdown)
    }
}
