//! Transfer Error Types

use ring_buffer::RingBufferError;
use thiserror::Error;

/// Errors that can end a transfer run
#[derive(Debug, Error)]
pub enum TransferError {
    /// Buffer could not be created
    #[error("Ring buffer error: {0}")]
    Buffer(#[from] RingBufferError),

    /// Configuration sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cancel token tripped before both sides finished
    #[error("Transfer cancelled after {produced} produced / {consumed} consumed")]
    Cancelled { produced: usize, consumed: usize },

    /// Producer or consumer task panicked or was aborted
    #[error("{0} task failed")]
    TaskFailed(String),

    /// Consumer output diverged from the source
    #[error("Value mismatch at index {index}: expected {expected}, got {actual}")]
    Mismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    /// Consumer collected a different number of values than the source holds
    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}
