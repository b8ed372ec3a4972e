//! Transfer results and order-preserving verification

use crate::{RuntimeKind, TransferError, WaitStrategy};
use ring_buffer::BufferStats;
use serde::Serialize;
use std::fmt::Debug;
use std::time::Duration;

/// Result of a completed transfer
#[derive(Debug, Clone)]
pub struct TransferReport<T> {
    /// Runtime that drove the run (never `Both`)
    pub runtime: RuntimeKind,
    pub wait: WaitStrategy,
    /// Values in the order the consumer received them
    pub received: Vec<T>,
    /// Buffer counters at the end of the run
    pub stats: BufferStats,
    pub elapsed: Duration,
}

/// Serializable view of a report without the payload
#[derive(Debug, Clone, Serialize)]
pub struct TransferSummary {
    pub runtime: RuntimeKind,
    pub wait: WaitStrategy,
    pub items: usize,
    pub elapsed_ms: f64,
    pub stats: BufferStats,
}

impl<T> TransferReport<T> {
    pub fn summary(&self) -> TransferSummary {
        TransferSummary {
            runtime: self.runtime,
            wait: self.wait,
            items: self.received.len(),
            elapsed_ms: self.elapsed.as_secs_f64() * 1_000.0,
            stats: self.stats,
        }
    }
}

/// Check that `received` equals `source` element for element
pub fn verify<T: PartialEq + Debug>(source: &[T], received: &[T]) -> Result<(), TransferError> {
    if let Some(index) = source
        .iter()
        .zip(received)
        .position(|(expected, actual)| expected != actual)
    {
        return Err(TransferError::Mismatch {
            index,
            expected: format!("{:?}", source[index]),
            actual: format!("{:?}", received[index]),
        });
    }

    if source.len() != received.len() {
        return Err(TransferError::LengthMismatch {
            expected: source.len(),
            actual: received.len(),
        });
    }

    Ok(())
}
