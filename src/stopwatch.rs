use log::warn;
use timekeeper_core::format::format_stopwatch;
use timekeeper_core::{
    Clock, LapLedger, LapRecord, ReloadPolicy, Stopwatch, StopwatchSnapshot, TimerState,
};

const MAX_LAPS: usize = 99;

/// Stopwatch bound to a clock.
pub struct StopwatchController<C: Clock> {
    clock: C,
    stopwatch: Stopwatch,
}

impl<C: Clock> StopwatchController<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            stopwatch: Stopwatch::new(),
        }
    }

    /// Rebuild from a stored snapshot, starting fresh if it is unusable.
    pub fn restore(clock: C, snapshot: StopwatchSnapshot, policy: ReloadPolicy) -> Self {
        let stopwatch = Stopwatch::restore(snapshot, policy).unwrap_or_else(|e| {
            warn!("discarding stored stopwatch: {}", e);
            Stopwatch::new()
        });
        Self { clock, stopwatch }
    }

    pub fn start(&mut self) {
        self.stopwatch.start(self.clock.now_ms());
    }

    pub fn stop(&mut self) {
        self.stopwatch.stop(self.clock.now_ms());
    }

    /// Start when stopped, stop when running. Returns whether it now runs.
    pub fn toggle(&mut self) -> bool {
        if self.stopwatch.is_running() {
            self.stop();
        } else {
            self.start();
        }
        self.stopwatch.is_running()
    }

    pub fn lap(&mut self) -> Option<LapRecord> {
        if self.stopwatch.laps().len() >= MAX_LAPS {
            return None;
        }
        self.stopwatch.record_lap(self.clock.now_ms())
    }

    pub fn reset(&mut self) {
        self.stopwatch.reset();
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.stopwatch.elapsed_ms(self.clock.now_ms())
    }

    pub fn display(&self) -> String {
        format_stopwatch(self.elapsed_ms())
    }

    pub fn is_running(&self) -> bool {
        self.stopwatch.is_running()
    }

    pub fn state(&self) -> TimerState {
        self.stopwatch.state()
    }

    pub fn laps(&self) -> &LapLedger {
        self.stopwatch.laps()
    }

    pub fn snapshot(&self) -> StopwatchSnapshot {
        self.stopwatch.snapshot()
    }
}
