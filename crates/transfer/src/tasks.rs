//! Tokio task producer/consumer driver

use crate::cancel::Completion;
use crate::report::verify;
use crate::threaded::{consume, produce};
use crate::{
    settle, CancelToken, LegOutcome, RuntimeKind, TransferConfig, TransferError, TransferReport,
    WaitStrategy, Waiter,
};
use ring_buffer::{BlockingRingBuffer, Full};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Async counterpart of [`produce`]; yields to the scheduler between retries
pub async fn produce_async<T, I>(
    buffer: &BlockingRingBuffer<T>,
    values: I,
    wait: WaitStrategy,
    cancel: &CancelToken,
) -> LegOutcome
where
    I: IntoIterator<Item = T>,
{
    let mut waiter = Waiter::new(wait);
    let mut produced = 0;

    for mut value in values {
        loop {
            if cancel.is_cancelled() {
                debug!("Producer task cancelled after {} values", produced);
                return LegOutcome::cancelled(produced);
            }
            match buffer.try_put(value) {
                Ok(()) => break,
                Err(Full(v)) => value = v,
            }
            waiter.pause_async().await;
        }
        waiter.reset();
        produced += 1;
    }

    LegOutcome::completed(produced)
}

/// Async counterpart of [`consume`]
pub async fn consume_async<T>(
    buffer: &BlockingRingBuffer<T>,
    count: usize,
    wait: WaitStrategy,
    cancel: &CancelToken,
) -> (Vec<T>, LegOutcome) {
    let mut waiter = Waiter::new(wait);
    let mut received = Vec::with_capacity(count);

    while received.len() < count {
        if cancel.is_cancelled() {
            debug!("Consumer task cancelled after {} values", received.len());
            let consumed = received.len();
            return (received, LegOutcome::cancelled(consumed));
        }
        match buffer.get() {
            Some(value) => {
                received.push(value);
                waiter.reset();
            }
            None => waiter.pause_async().await,
        }
    }

    let consumed = received.len();
    (received, LegOutcome::completed(consumed))
}

/// Move `source` through a fresh buffer on two tokio tasks and verify the
/// consumer saw it unchanged
///
/// `WaitStrategy::Park` blocks on a condvar, so both sides then run on the
/// blocking pool instead of the async workers. A deadline that fires before
/// the consumer has everything trips `cancel` and the run returns `Cancelled`.
pub async fn run_async<T>(
    config: &TransferConfig,
    source: Vec<T>,
    cancel: &CancelToken,
) -> Result<TransferReport<T>, TransferError>
where
    T: Clone + Send + PartialEq + Debug + 'static,
{
    config.validate()?;
    let buffer = Arc::new(BlockingRingBuffer::new(config.capacity)?);
    let wait = config.wait;
    let count = source.len();
    let completion = Arc::new(Completion::default());

    info!(
        "Starting async transfer: {} values, capacity={}, wait={:?}",
        count, config.capacity, wait
    );
    let started = Instant::now();

    let producer: JoinHandle<LegOutcome> = {
        let buffer = Arc::clone(&buffer);
        let cancel = cancel.clone();
        let values = source.clone();
        if wait.is_park() {
            tokio::task::spawn_blocking(move || {
                let _guard = cancel.panic_guard();
                produce(&buffer, values, wait, &cancel)
            })
        } else {
            tokio::spawn(async move {
                let _guard = cancel.panic_guard();
                produce_async(&buffer, values, wait, &cancel).await
            })
        }
    };

    let consumer: JoinHandle<(Vec<T>, LegOutcome)> = {
        let buffer = Arc::clone(&buffer);
        let cancel = cancel.clone();
        let completion = Arc::clone(&completion);
        if wait.is_park() {
            tokio::task::spawn_blocking(move || {
                let _guard = cancel.panic_guard();
                let drained = consume(&buffer, count, wait, &cancel);
                if !drained.1.cancelled {
                    completion.finish();
                }
                drained
            })
        } else {
            tokio::spawn(async move {
                let _guard = cancel.panic_guard();
                let drained = consume_async(&buffer, count, wait, &cancel).await;
                if !drained.1.cancelled {
                    completion.finish();
                }
                drained
            })
        }
    };

    let watchdog = config.timeout_ms.map(|timeout_ms| {
        let cancel = cancel.clone();
        let completion = Arc::clone(&completion);
        tokio::spawn(async move {
            let timeout = Duration::from_millis(timeout_ms);
            tokio::time::sleep(timeout).await;
            if completion.expire(&cancel) {
                warn!("Transfer exceeded {:?}, cancelling", timeout);
            }
        })
    });

    let producer = producer.await;
    let consumer = consumer.await;
    // A deadline that has not fired by now no longer counts
    completion.finish();
    if let Some(watchdog) = watchdog {
        watchdog.abort();
    }
    let elapsed = started.elapsed();

    let producer = producer.map_err(|e| TransferError::TaskFailed(format!("producer ({})", e)))?;
    let (received, consumer) =
        consumer.map_err(|e| TransferError::TaskFailed(format!("consumer ({})", e)))?;

    let settled = if completion.expired() {
        Err(TransferError::Cancelled {
            produced: producer.transferred,
            consumed: consumer.transferred,
        })
    } else {
        settle(producer, consumer)
    };
    if let Err(e) = settled {
        warn!("Async transfer stopped early: {}", e);
        return Err(e);
    }
    verify(&source, &received)?;

    let stats = buffer.stats();
    info!(
        "Async transfer verified: {} values in {:?} ({} full puts, {} empty gets)",
        received.len(),
        elapsed,
        stats.rejected_puts,
        stats.empty_gets
    );

    Ok(TransferReport {
        runtime: RuntimeKind::Async,
        wait,
        received,
        stats,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_threaded_runtime_makes_progress() {
        // Default test runtime is current-thread: Spin must still yield
        let config = TransferConfig {
            capacity: 2,
            item_count: 500,
            ..Default::default()
        };
        let source = crate::source::permutation(config.item_count, Some(3));

        let report = run_async(&config, source.clone(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.received, source);
        assert_eq!(report.runtime, RuntimeKind::Async);
    }

    #[tokio::test]
    async fn test_produce_async_stops_on_tripped_token() {
        let buffer = BlockingRingBuffer::new(3).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = produce_async(&buffer, 0..5u8, WaitStrategy::Spin, &cancel).await;
        assert_eq!(outcome, LegOutcome::cancelled(0));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_consume_async_leaves_buffer_on_tripped_token() {
        let buffer = BlockingRingBuffer::new(3).unwrap();
        buffer.put(7u8);
        let cancel = CancelToken::new();
        cancel.cancel();

        let (received, outcome) = consume_async(&buffer, 1, WaitStrategy::Spin, &cancel).await;
        assert!(received.is_empty());
        assert_eq!(outcome, LegOutcome::cancelled(0));
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_completed_run_keeps_token_untripped() {
        let config = TransferConfig {
            timeout_ms: Some(60_000),
            ..TransferConfig::no_backpressure(500)
        };
        let cancel = CancelToken::new();

        let report = run_async(&config, crate::source::sequential(500), &cancel)
            .await
            .unwrap();
        assert_eq!(report.received.len(), 500);
        assert!(!cancel.is_cancelled());
    }
}
