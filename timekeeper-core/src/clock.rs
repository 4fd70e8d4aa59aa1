//! Clock abstraction for testable time handling

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of wall-clock time, in milliseconds since the UNIX epoch.
pub trait Clock: Clone + Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now_ms: Arc<Mutex<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(Mutex::new(start_ms)),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, by: Duration) {
        let mut now = self.now_ms.lock();
        *now = now.saturating_add(by.as_millis() as u64);
    }

    /// Set the clock to an absolute time. Going backwards is allowed,
    /// which is how tests simulate a wall-clock jump.
    pub fn set(&self, now_ms: u64) {
        *self.now_ms.lock() = now_ms;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        *self.now_ms.lock()
    }
}
