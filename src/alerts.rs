use log::info;
use serde::{Deserialize, Serialize};

use crate::countdown::TimerId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub vibration: bool,
    pub audio: bool,
    pub notification: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            vibration: true,
            audio: false,
            notification: true,
        }
    }
}

/// Receives one call per countdown expiry.
pub trait AlertSink: Send {
    fn timer_expired(&self, id: TimerId, message: &str);
}

/// Alert sink that reports through the log. Delivery to a real
/// notification service belongs to the host.
pub struct LogAlerts {
    config: AlertConfig,
}

impl LogAlerts {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }
}

impl AlertSink for LogAlerts {
    fn timer_expired(&self, id: TimerId, message: &str) {
        if self.config.vibration {
            info!("[vibrate] timer {}", id);
        }
        if self.config.audio {
            info!("[tone] timer {}", id);
        }
        if self.config.notification {
            info!("{}", message);
        }
    }
}
