//! Timer suite built on `timekeeper-core`: a clock-bound stopwatch, a board
//! of countdown presets, the tick pump that drives them, and JSON storage.

pub mod alerts;
pub mod config;
pub mod countdown;
pub mod error;
pub mod pump;
pub mod stopwatch;
pub mod storage;
