use std::time::Duration;

use serde::{Deserialize, Serialize};
use timekeeper_core::{ExpiryPolicy, ReloadPolicy};

use crate::alerts::AlertConfig;

/// Refresh interval for the stopwatch display (centisecond resolution)
pub const STOPWATCH_TICK_MS: u64 = 10;
/// Polling interval for a running countdown
pub const COUNTDOWN_TICK_MS: u64 = 1000;

/// User settings, persisted under the `settings` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub alerts: AlertConfig,
    pub expiry_policy: ExpiryPolicy,
    /// A stopwatch left running at exit comes back zeroed by default
    pub stopwatch_reload: ReloadPolicy,
    pub countdown_reload: ReloadPolicy,
    pub stopwatch_tick_ms: u64,
    pub countdown_tick_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alerts: AlertConfig::default(),
            expiry_policy: ExpiryPolicy::Rearm,
            stopwatch_reload: ReloadPolicy::Reset,
            countdown_reload: ReloadPolicy::Resume,
            stopwatch_tick_ms: STOPWATCH_TICK_MS,
            countdown_tick_ms: COUNTDOWN_TICK_MS,
        }
    }
}

impl Settings {
    pub fn stopwatch_tick(&self) -> Duration {
        Duration::from_millis(self.stopwatch_tick_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }
}
