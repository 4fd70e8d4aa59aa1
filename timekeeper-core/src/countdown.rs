//! Countdown reconciler.

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{TimerError, TimerResult};
use crate::TimerState;

/// What a countdown does once its deadline passes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExpiryPolicy {
    /// Go back to the full duration, ready to start again
    #[default]
    Rearm,
    /// Stay at zero in `TimerState::Expired` until cancelled or rearmed
    HoldAtZero,
}

/// Result of polling a countdown.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Poll {
    Running { remaining_ms: u64 },
    Stopped { remaining_ms: u64 },
    /// The deadline was crossed since the last poll. Reported once.
    Expired,
}

/// Deadline-based countdown.
///
/// While running only the deadline is stored, so remaining time is always
/// recomputed from the clock and survives missed ticks and suspension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Countdown {
    total_ms: Option<u64>,
    remaining_ms: u64,
    deadline_ms: Option<u64>,
    expired: bool,
    policy: ExpiryPolicy,
}

impl Countdown {
    /// Create a countdown of `total_ms`, not yet started.
    pub fn arm(total_ms: u64) -> TimerResult<Self> {
        if total_ms == 0 {
            return Err(TimerError::InvalidDuration);
        }
        Ok(Self {
            total_ms: Some(total_ms),
            remaining_ms: total_ms,
            deadline_ms: None,
            expired: false,
            policy: ExpiryPolicy::default(),
        })
    }

    /// Like [`Countdown::arm`], taking fractional seconds.
    pub fn arm_secs(secs: f64) -> TimerResult<Self> {
        Self::arm(secs_to_ms(secs)?)
    }

    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub(crate) fn from_parts(
        total_ms: Option<u64>,
        remaining_ms: u64,
        deadline_ms: Option<u64>,
        expired: bool,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            total_ms,
            remaining_ms,
            deadline_ms,
            expired,
            policy,
        }
    }

    /// Replace the configured duration and return to the armed state.
    pub fn rearm(&mut self, total_ms: u64) -> TimerResult<()> {
        let policy = self.policy;
        *self = Self::arm(total_ms)?.with_policy(policy);
        Ok(())
    }

    /// Begin or resume counting down. Ignored while running, after a full
    /// reset, or when there is no time left.
    pub fn start(&mut self, now_ms: u64) {
        if self.is_running() || self.expired || self.total_ms.is_none() || self.remaining_ms == 0 {
            return;
        }
        self.deadline_ms = Some(now_ms.saturating_add(self.remaining_ms));
        debug!("countdown started, {} ms left", self.remaining_ms);
    }

    /// Freeze the remaining time. Once the deadline has passed the
    /// countdown keeps running so the next poll still reports the expiry.
    pub fn pause(&mut self, now_ms: u64) {
        if !self.is_running() {
            return;
        }
        let remaining_ms = self.remaining_ms(now_ms);
        if remaining_ms == 0 {
            debug!("pause ignored, deadline already passed");
            return;
        }
        self.remaining_ms = remaining_ms;
        self.deadline_ms = None;
        debug!("countdown paused, {} ms left", self.remaining_ms);
    }

    /// Stop and return to the full configured duration.
    pub fn cancel(&mut self) {
        self.remaining_ms = self.total_ms.unwrap_or(0);
        self.deadline_ms = None;
        self.expired = false;
    }

    /// Stop and forget the configured duration. The countdown must be
    /// rearmed before it can start again.
    pub fn reset(&mut self) {
        self.total_ms = None;
        self.cancel();
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        match self.deadline_ms {
            // A wall clock set backwards must not push remaining past total
            Some(deadline) => deadline
                .saturating_sub(now_ms)
                .min(self.total_ms.unwrap_or(0)),
            None => self.remaining_ms,
        }
    }

    /// Reconcile against the clock. Returns `Poll::Expired` exactly once,
    /// on the first poll at or past the deadline.
    pub fn poll(&mut self, now_ms: u64) -> Poll {
        match self.deadline_ms {
            Some(_) => {
                let remaining_ms = self.remaining_ms(now_ms);
                if remaining_ms > 0 {
                    return Poll::Running { remaining_ms };
                }
                self.deadline_ms = None;
                match self.policy {
                    ExpiryPolicy::Rearm => {
                        self.remaining_ms = self.total_ms.unwrap_or(0);
                    }
                    ExpiryPolicy::HoldAtZero => {
                        self.remaining_ms = 0;
                        self.expired = true;
                    }
                }
                debug!("countdown expired ({:?})", self.policy);
                Poll::Expired
            }
            None => Poll::Stopped {
                remaining_ms: self.remaining_ms,
            },
        }
    }

    /// Elapsed share of the total duration, from 0.0 to 1.0.
    pub fn progress(&self, now_ms: u64) -> f32 {
        match self.total_ms {
            Some(total) if total > 0 => {
                let elapsed = total.saturating_sub(self.remaining_ms(now_ms));
                let frac = elapsed as f32 / total as f32;
                frac.min(1.0)
            }
            _ => 0.0,
        }
    }

    pub fn state(&self) -> TimerState {
        if self.is_running() {
            TimerState::Running
        } else if self.expired {
            TimerState::Expired
        } else if self.total_ms.map_or(true, |t| t == self.remaining_ms) {
            TimerState::Idle
        } else {
            TimerState::Paused
        }
    }

    pub fn is_running(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn total_ms(&self) -> Option<u64> {
        self.total_ms
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }
}

fn secs_to_ms(secs: f64) -> TimerResult<u64> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(TimerError::InvalidDuration);
    }
    match (secs * 1000.0).round() as u64 {
        0 => Err(TimerError::InvalidDuration),
        ms => Ok(ms),
    }
}
