use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use timekeeper_core::format::format_countdown;
use timekeeper_core::{
    Clock, Countdown, CountdownSnapshot, ExpiryPolicy, Poll, ReloadPolicy, TimerError, TimerState,
};

use crate::alerts::AlertSink;
use crate::error::{AppError, AppResult};

pub const MAX_COUNTDOWNS: usize = 20;
const MAX_LABEL_LEN: usize = 20;
const RECENT_LIMIT: usize = 5;
pub const DEFAULT_SOUND: &str = "Radar";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub u32);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn default_sound() -> String {
    DEFAULT_SOUND.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPreset {
    pub id: TimerId,
    pub label: Option<String>,
    #[serde(default = "default_sound")]
    pub sound: String,
    pub duration_ms: u64,
    pub created_at_ms: u64,
}

impl TimerPreset {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("Timer")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSnapshot {
    pub id: TimerId,
    pub countdown: CountdownSnapshot,
}

/// Stored form of the whole board, kept under the `countdowns` key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub presets: Vec<TimerPreset>,
    #[serde(default)]
    pub next_id: u32,
    #[serde(default)]
    pub active: Option<ActiveSnapshot>,
}

struct ActiveTimer {
    id: TimerId,
    countdown: Countdown,
}

/// Saved countdown presets plus the one countdown that may be active.
///
/// Starting a preset replaces whatever was active before; only one
/// countdown runs at a time.
pub struct TimerBoard<C: Clock> {
    clock: C,
    presets: Vec<TimerPreset>,
    next_id: u32,
    active: Option<ActiveTimer>,
    policy: ExpiryPolicy,
}

impl<C: Clock> TimerBoard<C> {
    pub fn new(clock: C, policy: ExpiryPolicy) -> Self {
        Self {
            clock,
            presets: Vec::new(),
            next_id: 1,
            active: None,
            policy,
        }
    }

    /// Rebuild from storage. A stored active timer that no longer makes
    /// sense is dropped rather than failing the whole board.
    pub fn restore(
        clock: C,
        snapshot: BoardSnapshot,
        policy: ExpiryPolicy,
        reload: ReloadPolicy,
    ) -> Self {
        let max_id = snapshot.presets.iter().map(|p| p.id.0).max().unwrap_or(0);
        let mut board = Self {
            clock,
            presets: snapshot.presets,
            next_id: snapshot.next_id.max(max_id.saturating_add(1)),
            active: None,
            policy,
        };
        if let Some(active) = snapshot.active {
            if board.get(active.id).is_none() {
                warn!("dropping active timer {}: preset is gone", active.id);
            } else {
                match Countdown::restore(active.countdown, policy, reload) {
                    Ok(countdown) => {
                        board.active = Some(ActiveTimer {
                            id: active.id,
                            countdown,
                        })
                    }
                    Err(e) => warn!("dropping active timer {}: {}", active.id, e),
                }
            }
        }
        board
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let now = self.clock.now_ms();
        BoardSnapshot {
            presets: self.presets.clone(),
            next_id: self.next_id,
            active: self.active.as_ref().map(|a| ActiveSnapshot {
                id: a.id,
                countdown: a.countdown.snapshot(now),
            }),
        }
    }

    pub fn add_preset(
        &mut self,
        label: Option<String>,
        sound: Option<String>,
        duration_ms: u64,
    ) -> AppResult<TimerId> {
        if duration_ms == 0 {
            return Err(TimerError::InvalidDuration.into());
        }
        if self.presets.len() >= MAX_COUNTDOWNS {
            return Err(AppError::BoardFull(MAX_COUNTDOWNS));
        }
        let label = label
            .map(|l| l.trim().chars().take(MAX_LABEL_LEN).collect::<String>())
            .filter(|l| !l.is_empty());
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(AppError::IdsExhausted)?;
        self.presets.push(TimerPreset {
            id,
            label,
            sound: sound.unwrap_or_else(default_sound),
            duration_ms,
            created_at_ms: self.clock.now_ms(),
        });
        Ok(id)
    }

    pub fn delete(&mut self, id: TimerId) -> AppResult<()> {
        let idx = self
            .presets
            .iter()
            .position(|p| p.id == id)
            .ok_or(AppError::UnknownTimer(id))?;
        // If the active timer is the one being deleted, stop it
        if self.active_id() == Some(id) {
            self.active = None;
        }
        self.presets.remove(idx);
        Ok(())
    }

    pub fn get(&self, id: TimerId) -> Option<&TimerPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn presets(&self) -> &[TimerPreset] {
        &self.presets
    }

    /// Arm and start a countdown from a preset, cancelling any other.
    pub fn start(&mut self, id: TimerId) -> AppResult<()> {
        let duration_ms = self.get(id).ok_or(AppError::UnknownTimer(id))?.duration_ms;
        let mut countdown = Countdown::arm(duration_ms)?.with_policy(self.policy);
        if let Some(previous) = self.active.take() {
            info!("cancelling timer {} to start {}", previous.id, id);
        }
        countdown.start(self.clock.now_ms());
        self.active = Some(ActiveTimer { id, countdown });
        Ok(())
    }

    pub fn pause(&mut self) {
        let now = self.clock.now_ms();
        if let Some(active) = &mut self.active {
            active.countdown.pause(now);
        }
    }

    pub fn resume(&mut self) {
        let now = self.clock.now_ms();
        if let Some(active) = &mut self.active {
            active.countdown.start(now);
        }
    }

    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Back to the full duration, still selected but not running.
    pub fn reset(&mut self) {
        if let Some(active) = &mut self.active {
            active.countdown.cancel();
        }
    }

    pub fn dismiss(&mut self) {
        self.active = None;
    }

    /// Poll the active countdown and fire `alerts` on its expiry edge.
    pub fn tick(&mut self, alerts: &dyn AlertSink) -> Option<Poll> {
        let now = self.clock.now_ms();
        let active = self.active.as_mut()?;
        let poll = active.countdown.poll(now);
        if poll == Poll::Expired {
            let id = active.id;
            let message = format!("{} expired!", self.active_label().unwrap_or("Timer"));
            info!("timer {} expired", id);
            alerts.timer_expired(id, &message);
            if self.policy == ExpiryPolicy::Rearm {
                self.active = None;
            }
        }
        Some(poll)
    }

    pub fn active_id(&self) -> Option<TimerId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn active_label(&self) -> Option<&str> {
        self.active_id()
            .and_then(|id| self.get(id))
            .map(|p| p.display_label())
    }

    pub fn active_state(&self) -> Option<TimerState> {
        self.active.as_ref().map(|a| a.countdown.state())
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map(|a| a.countdown.is_running())
            .unwrap_or(false)
    }

    pub fn remaining_ms(&self) -> Option<u64> {
        let now = self.clock.now_ms();
        self.active.as_ref().map(|a| a.countdown.remaining_ms(now))
    }

    pub fn progress(&self) -> f32 {
        let now = self.clock.now_ms();
        self.active
            .as_ref()
            .map(|a| a.countdown.progress(now))
            .unwrap_or(0.0)
    }

    /// "label  M:SS" for the active countdown
    pub fn display(&self) -> Option<String> {
        let remaining = self.remaining_ms()?;
        Some(format!(
            "{}  {}",
            self.active_label().unwrap_or("Timer"),
            format_countdown(remaining)
        ))
    }

    /// Presets not currently running, newest first.
    pub fn recent(&self) -> Vec<&TimerPreset> {
        let running = if self.is_running() { self.active_id() } else { None };
        let mut recent: Vec<&TimerPreset> = self
            .presets
            .iter()
            .filter(|p| Some(p.id) != running)
            .collect();
        recent.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then(b.id.0.cmp(&a.id.0))
        });
        recent.truncate(RECENT_LIMIT);
        recent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;
    use timekeeper_core::ManualClock;

    #[derive(Default)]
    struct RecordingAlerts {
        fired: Mutex<Vec<(TimerId, String)>>,
    }

    impl AlertSink for RecordingAlerts {
        fn timer_expired(&self, id: TimerId, message: &str) {
            self.fired.lock().push((id, message.to_string()));
        }
    }

    fn board() -> (ManualClock, TimerBoard<ManualClock>) {
        let clock = ManualClock::new(1_000_000);
        let board = TimerBoard::new(clock.clone(), ExpiryPolicy::Rearm);
        (clock, board)
    }

    #[test]
    fn test_add_preset_validates() {
        let (_, mut board) = board();
        assert!(matches!(
            board.add_preset(None, None, 0),
            Err(AppError::Timer(TimerError::InvalidDuration))
        ));

        let id = board
            .add_preset(Some("  a very long label that keeps going ".into()), None, 60_000)
            .unwrap();
        let preset = board.get(id).unwrap();
        assert_eq!(preset.label.as_deref(), Some("a very long label th"));
        assert_eq!(preset.sound, DEFAULT_SOUND);

        let blank = board.add_preset(Some("   ".into()), None, 1_000).unwrap();
        assert_eq!(board.get(blank).unwrap().display_label(), "Timer");
    }

    #[test]
    fn test_board_full() {
        let (_, mut board) = board();
        for _ in 0..MAX_COUNTDOWNS {
            board.add_preset(None, None, 1_000).unwrap();
        }
        assert!(matches!(
            board.add_preset(None, None, 1_000),
            Err(AppError::BoardFull(MAX_COUNTDOWNS))
        ));
    }

    #[test]
    fn test_expiry_alerts_once_and_clears_active() {
        let (clock, mut board) = board();
        let alerts = RecordingAlerts::default();
        let id = board.add_preset(Some("Tea".into()), None, 2_000).unwrap();
        board.start(id).unwrap();

        for _ in 0..30 {
            clock.advance(Duration::from_millis(100));
            board.tick(&alerts);
        }
        let fired = alerts.fired.lock();
        assert_eq!(fired.as_slice(), &[(id, "Tea expired!".to_string())]);
        assert!(board.active_id().is_none());
    }

    #[test]
    fn test_hold_at_zero_keeps_active() {
        let clock = ManualClock::new(0);
        let mut board = TimerBoard::new(clock.clone(), ExpiryPolicy::HoldAtZero);
        let alerts = RecordingAlerts::default();
        let id = board.add_preset(None, None, 1_000).unwrap();
        board.start(id).unwrap();

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(board.tick(&alerts), Some(Poll::Expired));
        assert_eq!(board.tick(&alerts), Some(Poll::Stopped { remaining_ms: 0 }));
        assert_eq!(board.active_state(), Some(TimerState::Expired));
        assert_eq!(alerts.fired.lock().len(), 1);

        board.reset();
        assert_eq!(board.remaining_ms(), Some(1_000));
    }

    #[test]
    fn test_pause_after_deadline_still_alerts() {
        let (clock, mut board) = board();
        let alerts = RecordingAlerts::default();
        let id = board.add_preset(Some("Tea".into()), None, 2_000).unwrap();
        board.start(id).unwrap();
        clock.advance(Duration::from_millis(1_500));
        assert_eq!(board.tick(&alerts), Some(Poll::Running { remaining_ms: 500 }));

        // Paused between ticks, after the deadline
        clock.advance(Duration::from_millis(800));
        board.pause();
        for _ in 0..5 {
            clock.advance(Duration::from_millis(500));
            board.tick(&alerts);
        }
        assert_eq!(alerts.fired.lock().as_slice(), &[(id, "Tea expired!".to_string())]);
        assert!(board.active_id().is_none());
    }

    #[test]
    fn test_ids_exhausted() {
        let (clock, mut board) = board();
        board.add_preset(None, None, 1_000).unwrap();
        let mut snapshot = board.snapshot();
        snapshot.presets[0].id = TimerId(u32::MAX);

        let mut restored =
            TimerBoard::restore(clock, snapshot, ExpiryPolicy::Rearm, ReloadPolicy::Resume);
        assert!(matches!(
            restored.add_preset(None, None, 1_000),
            Err(AppError::IdsExhausted)
        ));
        assert_eq!(restored.presets().len(), 1);
    }

    #[test]
    fn test_start_replaces_active() {
        let (clock, mut board) = board();
        let a = board.add_preset(Some("A".into()), None, 60_000).unwrap();
        let b = board.add_preset(Some("B".into()), None, 30_000).unwrap();
        board.start(a).unwrap();
        clock.advance(Duration::from_secs(10));
        board.start(b).unwrap();
        assert_eq!(board.active_id(), Some(b));
        assert_eq!(board.remaining_ms(), Some(30_000));
        assert!(matches!(board.start(TimerId(99)), Err(AppError::UnknownTimer(_))));
    }

    #[test]
    fn test_pause_resume_reset() {
        let (clock, mut board) = board();
        let id = board.add_preset(None, None, 10_000).unwrap();
        board.start(id).unwrap();
        clock.advance(Duration::from_secs(3));
        board.toggle();
        assert!(!board.is_running());
        clock.advance(Duration::from_secs(60));
        assert_eq!(board.remaining_ms(), Some(7_000));
        assert_eq!(board.display().unwrap(), "Timer  0:07");

        board.toggle();
        clock.advance(Duration::from_secs(2));
        assert_eq!(board.remaining_ms(), Some(5_000));
        assert!((board.progress() - 0.5).abs() < 1e-6);

        board.reset();
        assert_eq!(board.active_state(), Some(TimerState::Idle));
        assert_eq!(board.remaining_ms(), Some(10_000));

        board.dismiss();
        assert!(board.display().is_none());
    }

    #[test]
    fn test_delete_active_dismisses() {
        let (_, mut board) = board();
        let id = board.add_preset(None, None, 10_000).unwrap();
        board.start(id).unwrap();
        board.delete(id).unwrap();
        assert!(board.active_id().is_none());
        assert!(board.presets().is_empty());
        assert!(matches!(board.delete(id), Err(AppError::UnknownTimer(_))));
    }

    #[test]
    fn test_recent_excludes_running_and_sorts_newest_first() {
        let (clock, mut board) = board();
        let mut ids = Vec::new();
        for i in 0..7 {
            ids.push(board.add_preset(Some(format!("t{}", i)), None, 1_000).unwrap());
            clock.advance(Duration::from_secs(1));
        }
        board.start(ids[6]).unwrap();

        let recent: Vec<TimerId> = board.recent().iter().map(|p| p.id).collect();
        assert_eq!(recent, vec![ids[5], ids[4], ids[3], ids[2], ids[1]]);

        board.pause();
        assert_eq!(board.recent()[0].id, ids[6]);
    }

    #[test]
    fn test_snapshot_restore_resumes_deadline() {
        let (clock, mut board) = board();
        let id = board.add_preset(Some("Eggs".into()), None, 60_000).unwrap();
        board.start(id).unwrap();
        clock.advance(Duration::from_secs(20));
        let snapshot = board.snapshot();

        clock.advance(Duration::from_secs(10));
        let restored = TimerBoard::restore(
            clock.clone(),
            snapshot,
            ExpiryPolicy::Rearm,
            ReloadPolicy::Resume,
        );
        assert_eq!(restored.active_id(), Some(id));
        assert_eq!(restored.remaining_ms(), Some(30_000));

        // New presets never reuse ids
        let mut restored = restored;
        let next = restored.add_preset(None, None, 1_000).unwrap();
        assert!(next.0 > id.0);
    }

    #[test]
    fn test_restore_drops_orphaned_active() {
        let (clock, mut board) = board();
        let id = board.add_preset(None, None, 60_000).unwrap();
        board.start(id).unwrap();
        let mut snapshot = board.snapshot();
        snapshot.presets.clear();

        let restored =
            TimerBoard::restore(clock, snapshot, ExpiryPolicy::Rearm, ReloadPolicy::Resume);
        assert!(restored.active_id().is_none());
    }
}
