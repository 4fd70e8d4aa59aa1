//! Display helpers and duration parsing.

use crate::error::{TimerError, TimerResult};

/// Format milliseconds as "MM:SS,CC" (minutes keep growing past 99)
pub fn format_stopwatch(ms: u64) -> String {
    let total_cs = ms / 10;
    let m = total_cs / 6000;
    let s = (total_cs % 6000) / 100;
    let cs = total_cs % 100;
    format!("{:02}:{:02},{:02}", m, s, cs)
}

/// Format milliseconds as "H:MM:SS", or "M:SS" under an hour
pub fn format_countdown(ms: u64) -> String {
    let total_secs = ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Format milliseconds as "M:SS.CC" (lap table)
pub fn format_lap(ms: u64) -> String {
    let total_secs = ms / 1000;
    let cs = (ms % 1000) / 10;
    format!("{}:{:02}.{:02}", total_secs / 60, total_secs % 60, cs)
}

/// Parse "SS", "MM:SS" or "H:MM:SS" into milliseconds.
///
/// A bare number may carry a unit suffix: `90s`, `5m`, `1h`, `250ms`.
pub fn parse_duration(s: &str) -> TimerResult<u64> {
    let s = s.trim();
    let ms = if s.contains(':') {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return Err(TimerError::Parse(s.to_string()));
        }
        let mut secs = 0u64;
        for part in parts {
            let v = part
                .trim()
                .parse::<u64>()
                .map_err(|_| TimerError::Parse(s.to_string()))?;
            secs = secs.saturating_mul(60).saturating_add(v);
        }
        secs.saturating_mul(1000)
    } else {
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let v = digits
            .parse::<u64>()
            .map_err(|_| TimerError::Parse(s.to_string()))?;
        let scale = match unit.trim() {
            "ms" => 1,
            "" | "s" => 1000,
            "m" => 60_000,
            "h" => 3_600_000,
            _ => return Err(TimerError::Parse(s.to_string())),
        };
        v.saturating_mul(scale)
    };
    if ms == 0 {
        return Err(TimerError::InvalidDuration);
    }
    Ok(ms)
}
