//! Bounded Ring Buffer
//!
//! Provides a fixed-capacity FIFO ring buffer guarded by a single mutex,
//! plus a condvar-backed wrapper for callers that want to block.

mod blocking;
mod buffer;

pub use blocking::BlockingRingBuffer;
pub use buffer::RingBuffer;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Capacity used by the reference producer/consumer scenario
pub const DEFAULT_CAPACITY: usize = 6;

/// Ring buffer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    /// Capacity must be at least one slot
    #[error("Invalid ring buffer capacity: {0} (must be >= 1)")]
    InvalidCapacity(usize),
}

/// Value handed back by a put on a full buffer
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Recover the rejected value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ring buffer is full")
    }
}

/// Point-in-time snapshot of buffer occupancy and counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    pub capacity: usize,
    pub len: usize,
    /// Successful puts since creation
    pub total_put: u64,
    /// Successful gets since creation
    pub total_get: u64,
    /// Puts refused because the buffer was full
    pub rejected_puts: u64,
    /// Gets that found the buffer empty
    pub empty_gets: u64,
}
