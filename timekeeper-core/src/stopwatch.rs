//! Elapsed-time accumulator.

use log::debug;

use crate::laps::{LapLedger, LapRecord};
use crate::TimerState;

/// Pausable elapsed-time counter with a lap ledger.
///
/// Time accumulated in earlier runs is frozen in `accumulated_ms`; the
/// current run is measured from `run_started_at_ms`. The stopwatch is running
/// exactly when a run start is recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stopwatch {
    accumulated_ms: u64,
    run_started_at_ms: Option<u64>,
    laps: LapLedger,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        accumulated_ms: u64,
        run_started_at_ms: Option<u64>,
        laps: LapLedger,
    ) -> Self {
        Self {
            accumulated_ms,
            run_started_at_ms,
            laps,
        }
    }

    /// Begin or resume measuring. Ignored while already running.
    pub fn start(&mut self, now_ms: u64) {
        if self.is_running() {
            return;
        }
        self.run_started_at_ms = Some(now_ms);
        debug!("stopwatch started at {} with {} ms banked", now_ms, self.accumulated_ms);
    }

    /// Bank the current run. Ignored unless running.
    pub fn stop(&mut self, now_ms: u64) {
        if let Some(started) = self.run_started_at_ms.take() {
            self.accumulated_ms = self
                .accumulated_ms
                .saturating_add(now_ms.saturating_sub(started));
            debug!("stopwatch stopped at {} ms", self.accumulated_ms);
        }
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
        self.run_started_at_ms = None;
        self.laps.clear();
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.run_started_at_ms {
            Some(started) => self
                .accumulated_ms
                .saturating_add(now_ms.saturating_sub(started)),
            None => self.accumulated_ms,
        }
    }

    /// Record a checkpoint at the current elapsed time.
    ///
    /// Nothing is recorded on a stopwatch that has never run, or when the
    /// clock has stepped back behind the previous lap.
    pub fn record_lap(&mut self, now_ms: u64) -> Option<LapRecord> {
        if !self.is_running() && self.accumulated_ms == 0 {
            return None;
        }
        let elapsed = self.elapsed_ms(now_ms);
        let lap = self.laps.push(elapsed).copied();
        match &lap {
            Some(l) => debug!("lap {} recorded: split {} ms", l.sequence, l.split_ms),
            None => debug!("lap at {} ms rejected, clock went backwards", elapsed),
        }
        lap
    }

    pub fn is_running(&self) -> bool {
        self.run_started_at_ms.is_some()
    }

    pub fn state(&self) -> TimerState {
        if self.is_running() {
            TimerState::Running
        } else if self.accumulated_ms > 0 || !self.laps.is_empty() {
            TimerState::Paused
        } else {
            TimerState::Idle
        }
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    pub fn run_started_at_ms(&self) -> Option<u64> {
        self.run_started_at_ms
    }

    pub fn laps(&self) -> &LapLedger {
        &self.laps
    }
}
