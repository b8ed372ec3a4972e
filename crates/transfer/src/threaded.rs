//! OS-thread producer/consumer driver

use crate::cancel::Completion;
use crate::report::verify;
use crate::{
    settle, CancelToken, LegOutcome, RuntimeKind, TransferConfig, TransferError, TransferReport,
    WaitStrategy, Waiter,
};
use ring_buffer::{BlockingRingBuffer, Full};
use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest the deadline watchdog sleeps before re-checking for completion
const WATCHDOG_TICK: Duration = Duration::from_millis(5);

/// Push every value in order, retrying each until the buffer accepts it
pub fn produce<T, I>(
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
                debug!("Producer cancelled after {} values", produced);
                return LegOutcome::cancelled(produced);
            }

            let attempt = match wait.park_slice() {
                Some(slice) => buffer.put_timeout(value, slice),
                None => buffer.try_put(value),
            };
            match attempt {
                Ok(()) => break,
                Err(Full(v)) => value = v,
            }
            if !wait.is_park() {
                waiter.pause();
            }
        }
        waiter.reset();
        produced += 1;
    }

    debug!("Producer finished: {} values, {} retries", produced, waiter.retries());
    LegOutcome::completed(produced)
}

/// Pull values until `count` have arrived
pub fn consume<T>(
    buffer: &BlockingRingBuffer<T>,
    count: usize,
    wait: WaitStrategy,
    cancel: &CancelToken,
) -> (Vec<T>, LegOutcome) {
    let mut waiter = Waiter::new(wait);
    let mut received = Vec::with_capacity(count);

    while received.len() < count {
        if cancel.is_cancelled() {
            debug!("Consumer cancelled after {} values", received.len());
            let consumed = received.len();
            return (received, LegOutcome::cancelled(consumed));
        }

        let next = match wait.park_slice() {
            Some(slice) => buffer.get_timeout(slice),
            None => buffer.get(),
        };
        match next {
            Some(value) => {
                received.push(value);
                waiter.reset();
            }
            None if !wait.is_park() => waiter.pause(),
            None => {}
        }
    }

    debug!("Consumer finished: {} values, {} retries", received.len(), waiter.retries());
    let consumed = received.len();
    (received, LegOutcome::completed(consumed))
}

fn watchdog(timeout: Duration, completion: &Completion, cancel: &CancelToken) {
    let deadline = Instant::now() + timeout;
    while !completion.is_settled() && !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            if completion.expire(cancel) {
                warn!("Transfer exceeded {:?}, cancelling", timeout);
            }
            return;
        }
        thread::sleep((deadline - now).min(WATCHDOG_TICK));
    }
}

/// Move `source` through a fresh buffer on two scoped threads and verify the
/// consumer saw it unchanged
///
/// A deadline that fires before the consumer has everything trips `cancel`,
/// so callers sharing the token see it; the run then returns `Cancelled`.
pub fn run_threaded<T>(
    config: &TransferConfig,
    source: &[T],
    cancel: &CancelToken,
) -> Result<TransferReport<T>, TransferError>
where
    T: Clone + Send + Sync + PartialEq + Debug,
{
    config.validate()?;
    let buffer = BlockingRingBuffer::new(config.capacity)?;
    let wait = config.wait;
    let completion = Completion::default();

    info!(
        "Starting threaded transfer: {} values, capacity={}, wait={:?}",
        source.len(),
        config.capacity,
        wait
    );
    let started = Instant::now();

    let (producer, consumer) = thread::scope(|s| {
        let buffer = &buffer;
        let completion = &completion;

        let producer = s.spawn(move || {
            let _guard = cancel.panic_guard();
            produce(buffer, source.iter().cloned(), wait, cancel)
        });
        let consumer = s.spawn(move || {
            let _guard = cancel.panic_guard();
            let drained = consume(buffer, source.len(), wait, cancel);
            if !drained.1.cancelled {
                completion.finish();
            }
            drained
        });
        if let Some(timeout_ms) = config.timeout_ms {
            s.spawn(move || watchdog(Duration::from_millis(timeout_ms), completion, cancel));
        }

        let producer = producer.join();
        let consumer = consumer.join();
        // Releases the watchdog when a side stopped early
        completion.finish();
        (producer, consumer)
    });
    let elapsed = started.elapsed();

    let producer = producer.map_err(|_| TransferError::TaskFailed("producer".to_string()))?;
    let (received, consumer) =
        consumer.map_err(|_| TransferError::TaskFailed("consumer".to_string()))?;

    let settled = if completion.expired() {
        Err(TransferError::Cancelled {
            produced: producer.transferred,
            consumed: consumer.transferred,
        })
    } else {
        settle(producer, consumer)
    };
    if let Err(e) = settled {
        warn!("Threaded transfer stopped early: {}", e);
        return Err(e);
    }
    verify(source, &received)?;

    let stats = buffer.stats();
    info!(
        "Threaded transfer verified: {} values in {:?} ({} full puts, {} empty gets)",
        received.len(),
        elapsed,
        stats.rejected_puts,
        stats.empty_gets
    );

    Ok(TransferReport {
        runtime: RuntimeKind::Threaded,
        wait,
        received,
        stats,
        elapsed,
    })
}
