//! Retry pacing for producer and consumer loops

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a side waits between failed put/get attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Retry immediately with a CPU spin hint
    #[default]
    Spin,
    /// Spin up to `spin_limit` attempts, then yield the thread
    Backoff { spin_limit: u32 },
    /// Sleep a fixed interval between attempts
    Sleep { micros: u64 },
    /// Park on the buffer's condvar, waking at least every `slice_ms`
    /// to observe cancellation
    Park { slice_ms: u64 },
}

impl WaitStrategy {
    /// Backoff with the spin budget used by the bundled presets
    pub const fn backoff() -> Self {
        WaitStrategy::Backoff { spin_limit: 64 }
    }

    /// Whether retries block on the buffer's condvar instead of pausing here
    pub fn is_park(&self) -> bool {
        matches!(self, WaitStrategy::Park { .. })
    }

    /// Bounded park interval; `None` for non-parking strategies
    pub fn park_slice(&self) -> Option<Duration> {
        match *self {
            WaitStrategy::Park { slice_ms } => Some(Duration::from_millis(slice_ms)),
            _ => None,
        }
    }
}

/// Per-loop retry state
#[derive(Debug)]
pub struct Waiter {
    strategy: WaitStrategy,
    spins: u32,
    retries: u64,
}

impl Waiter {
    /// Fresh state with no spins or retries recorded
    pub fn new(strategy: WaitStrategy) -> Self {
        Self {
            strategy,
            spins: 0,
            retries: 0,
        }
    }

    /// Total pauses taken
    pub fn retries(&self) -> u64 {
        self.retries
    }

    /// Forget the backoff after a successful attempt
    pub fn reset(&mut self) {
        self.spins = 0;
    }

    /// Pause an OS thread according to the strategy
    pub fn pause(&mut self) {
        self.retries += 1;
        match self.strategy {
            WaitStrategy::Spin => std::hint::spin_loop(),
            WaitStrategy::Backoff { spin_limit } => {
                if self.spins < spin_limit {
                    self.spins += 1;
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
            }
            WaitStrategy::Sleep { micros } => std::thread::sleep(Duration::from_micros(micros)),
            // Parking loops block inside the buffer; a plain yield covers stray calls
            WaitStrategy::Park { .. } => std::thread::yield_now(),
        }
    }

    /// Pause a tokio task according to the strategy
    ///
    /// A task must hand control back to the scheduler, so `Spin` yields too;
    /// otherwise a current-thread runtime would never run the peer task.
    pub async fn pause_async(&mut self) {
        self.retries += 1;
        match self.strategy {
            WaitStrategy::Spin | WaitStrategy::Park { .. } => tokio::task::yield_now().await,
            WaitStrategy::Backoff { spin_limit } => {
                if self.spins < spin_limit {
                    self.spins += 1;
                    std::hint::spin_loop();
                } else {
                    tokio::task::yield_now().await;
                }
            }
            WaitStrategy::Sleep { micros } => {
                tokio::time::sleep(Duration::from_micros(micros)).await
            }
        }
    }
}
