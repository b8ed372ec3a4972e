//! Transfer settings

use crate::{TransferError, WaitStrategy};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Which runtime drives the producer and consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    /// Two scoped OS threads
    Threaded,
    /// Two tokio tasks
    Async,
    /// One run on each runtime
    Both,
}

/// Transfer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Ring buffer slots (default: 6)
    pub capacity: usize,

    /// Values pushed by the producer (default: 10000)
    pub item_count: usize,

    /// Retry pacing for both sides
    pub wait: WaitStrategy,

    /// Seed for the source permutation; random when unset
    pub seed: Option<u64>,

    /// Cancel the run if it has not finished after this many milliseconds
    pub timeout_ms: Option<u64>,

    pub runtime: RuntimeKind,

    /// Max tracing level for the CLI (trace/debug/info/warn/error)
    pub log_level: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            capacity: ring_buffer::DEFAULT_CAPACITY,
            item_count: 10_000,
            wait: WaitStrategy::Spin,
            seed: None,
            timeout_ms: None,
            runtime: RuntimeKind::Threaded,
            log_level: "info".to_string(),
        }
    }
}

impl TransferConfig {
    /// Degenerate single-slot buffer: every value hands off one at a time
    pub fn single_slot() -> Self {
        Self {
            capacity: 1,
            wait: WaitStrategy::backoff(),
            ..Default::default()
        }
    }

    /// Buffer large enough that the producer never sees it full
    pub fn no_backpressure(item_count: usize) -> Self {
        Self {
            capacity: item_count.max(1),
            item_count,
            ..Default::default()
        }
    }

    /// Layer defaults, an optional file, then `TRANSFER_*` environment
    /// variables (nested keys use `__`, e.g. `TRANSFER_WAIT__KIND=park`)
    pub fn load(path: Option<&Path>) -> Result<Self, TransferError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading transfer config from {}", path.display());
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("TRANSFER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: TransferConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the driver cannot run with
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.capacity == 0 {
            return Err(TransferError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if let WaitStrategy::Park { slice_ms: 0 } = self.wait {
            return Err(TransferError::InvalidConfig(
                "park slice must be at least 1ms".to_string(),
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(TransferError::InvalidConfig(
                "timeout must be at least 1ms when set".to_string(),
            ));
        }
        Ok(())
    }
}
