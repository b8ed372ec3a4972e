//! Producer/Consumer Transfer
//!
//! Drives a source sequence from a producer task to a consumer task through a
//! bounded [`ring_buffer::BlockingRingBuffer`] and checks that the consumer
//! saw exactly the source, in order. Runs on OS threads or on tokio tasks.

mod cancel;
mod error;
mod report;
mod settings;
pub mod source;
mod tasks;
mod threaded;
mod wait;

pub use cancel::{CancelToken, PanicGuard};
pub use error::TransferError;
pub use report::{verify, TransferReport, TransferSummary};
pub use settings::{RuntimeKind, TransferConfig};
pub use tasks::{consume_async, produce_async, run_async};
pub use threaded::{consume, produce, run_threaded};
pub use wait::{WaitStrategy, Waiter};

/// Progress of one side of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegOutcome {
    /// Values moved through the buffer by this side
    pub transferred: usize,
    /// Whether the side stopped because its cancel token was tripped
    pub cancelled: bool,
}

impl LegOutcome {
    fn completed(transferred: usize) -> Self {
        Self {
            transferred,
            cancelled: false,
        }
    }

    fn cancelled(transferred: usize) -> Self {
        Self {
            transferred,
            cancelled: true,
        }
    }
}

/// Fold both legs into the driver result
fn settle(producer: LegOutcome, consumer: LegOutcome) -> Result<(), TransferError> {
    if producer.cancelled || consumer.cancelled {
        return Err(TransferError::Cancelled {
            produced: producer.transferred,
            consumed: consumer.transferred,
        });
    }
    Ok(())
}
