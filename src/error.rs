use thiserror::Error;
use timekeeper_core::TimerError;

use crate::countdown::TimerId;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cannot start tick thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("Countdown list is full ({0} timers)")]
    BoardFull(usize),

    #[error("No timer ids left")]
    IdsExhausted,

    #[error("No timer with id {0}")]
    UnknownTimer(TimerId),
}

pub type AppResult<T> = Result<T, AppError>;
