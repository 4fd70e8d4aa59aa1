use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use timekeeper_core::StopwatchSnapshot;

use crate::config::Settings;
use crate::countdown::BoardSnapshot;

const DICT_NAME: &str = "timers";
const KEY_SETTINGS: &str = "settings";
const KEY_COUNTDOWNS: &str = "countdowns";
const KEY_STOPWATCH: &str = "stopwatch";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store with one JSON document per key.
pub struct TimerStorage {
    dir: PathBuf,
}

impl TimerStorage {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = root.as_ref().join(DICT_NAME);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn load_settings(&self) -> Settings {
        self.load(KEY_SETTINGS).unwrap_or_default()
    }

    pub fn save_settings(&self, settings: &Settings) {
        if let Err(e) = self.store(KEY_SETTINGS, settings) {
            error!("Failed to save settings: {}", e);
        }
    }

    pub fn load_countdowns(&self) -> Option<BoardSnapshot> {
        self.load(KEY_COUNTDOWNS)
    }

    pub fn save_countdowns(&self, board: &BoardSnapshot) {
        if let Err(e) = self.store(KEY_COUNTDOWNS, board) {
            error!("Failed to save countdowns: {}", e);
        }
    }

    pub fn load_stopwatch(&self) -> Option<StopwatchSnapshot> {
        self.load(KEY_STOPWATCH)
    }

    pub fn save_stopwatch(&self, snapshot: &StopwatchSnapshot) {
        if let Err(e) = self.store(KEY_STOPWATCH, snapshot) {
            error!("Failed to save stopwatch: {}", e);
        }
    }

    pub fn reset_stopwatch(&self) {
        if let Err(e) = self.remove(KEY_STOPWATCH) {
            error!("Failed to reset stopwatch: {}", e);
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Missing keys read as `None`. A value that no longer decodes is
    /// removed so the next save starts clean.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = match fs::read(self.path(key)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_slice(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to decode {}: {}; clearing it", key, e);
                self.remove(key).ok();
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(value)?;
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timekeeper_core::{ExpiryPolicy, ManualClock, ReloadPolicy, Stopwatch};

    use crate::countdown::TimerBoard;

    #[test]
    fn test_missing_keys_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TimerStorage::open(dir.path()).unwrap();
        assert_eq!(storage.load_settings(), Settings::default());
        assert!(storage.load_countdowns().is_none());
        assert!(storage.load_stopwatch().is_none());
    }

    #[test]
    fn test_settings_persist() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TimerStorage::open(dir.path()).unwrap();
        let mut settings = Settings::default();
        settings.expiry_policy = ExpiryPolicy::HoldAtZero;
        settings.alerts.audio = true;
        storage.save_settings(&settings);

        let reopened = TimerStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.load_settings(), settings);
    }

    #[test]
    fn test_board_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(10_000);
        let mut board = TimerBoard::new(clock.clone(), ExpiryPolicy::Rearm);
        let id = board.add_preset(Some("Pasta".into()), None, 600_000).unwrap();
        board.start(id).unwrap();

        TimerStorage::open(dir.path())
            .unwrap()
            .save_countdowns(&board.snapshot());

        let snapshot = TimerStorage::open(dir.path())
            .unwrap()
            .load_countdowns()
            .unwrap();
        let restored =
            TimerBoard::restore(clock, snapshot, ExpiryPolicy::Rearm, ReloadPolicy::Resume);
        assert_eq!(restored.active_label(), Some("Pasta"));
        assert!(restored.is_running());
    }

    #[test]
    fn test_corrupt_value_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TimerStorage::open(dir.path()).unwrap();
        let path = storage.path(KEY_STOPWATCH);
        fs::write(&path, b"{not json").unwrap();

        assert!(storage.load_stopwatch().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_reset_stopwatch_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TimerStorage::open(dir.path()).unwrap();
        let mut sw = Stopwatch::new();
        sw.start(0);
        sw.stop(1_500);
        storage.save_stopwatch(&sw.snapshot());
        assert_eq!(storage.load_stopwatch().unwrap().accumulated_ms, 1_500);

        storage.reset_stopwatch();
        assert!(storage.load_stopwatch().is_none());
        // Removing twice is fine
        storage.reset_stopwatch();
    }
}
