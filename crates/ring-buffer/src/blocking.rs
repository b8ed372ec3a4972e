//! Blocking wrapper over the non-blocking ring buffer

use crate::{BufferStats, Full, RingBuffer, RingBufferError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Ring buffer whose callers may park until space or data is available
///
/// The inner [`RingBuffer`] keeps its own contract; this type only adds a
/// signal mutex and two condition variables. Waiters register in `parked`
/// before re-checking the buffer, and notifiers take the signal mutex before
/// notifying, so a wakeup can never slip between a failed check and the wait.
pub struct BlockingRingBuffer<T> {
    inner: RingBuffer<T>,
    signal: Mutex<()>,
    not_full: Condvar,
    not_empty: Condvar,
    parked: AtomicUsize,
}

impl<T> BlockingRingBuffer<T> {
    /// Create a blocking buffer with exactly `capacity` slots
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        Ok(Self::from_buffer(RingBuffer::new(capacity)?))
    }

    /// Wrap an existing buffer
    pub fn from_buffer(inner: RingBuffer<T>) -> Self {
        Self {
            inner,
            signal: Mutex::new(()),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            parked: AtomicUsize::new(0),
        }
    }

    /// Access the non-blocking core
    pub fn inner(&self) -> &RingBuffer<T> {
        &self.inner
    }

    fn signal_lock(&self) -> MutexGuard<'_, ()> {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake(&self, condvar: &Condvar) {
        if self.parked.load(Ordering::SeqCst) > 0 {
            let _guard = self.signal_lock();
            condvar.notify_all();
        }
    }

    /// Non-blocking put that also wakes parked consumers
    pub fn try_put(&self, value: T) -> Result<(), Full<T>> {
        self.inner.try_put(value)?;
        self.wake(&self.not_empty);
        Ok(())
    }

    /// Non-blocking put; see [`RingBuffer::put`]
    pub fn put(&self, value: T) -> bool {
        self.try_put(value).is_ok()
    }

    /// Non-blocking get that also wakes parked producers
    pub fn get(&self) -> Option<T> {
        let value = self.inner.get()?;
        self.wake(&self.not_full);
        Some(value)
    }

    /// Put, waiting up to `timeout` for a free slot
    pub fn put_timeout(&self, value: T, timeout: Duration) -> Result<(), Full<T>> {
        let mut value = match self.try_put(value) {
            Ok(()) => return Ok(()),
            Err(Full(v)) => v,
        };

        let deadline = Instant::now() + timeout;
        let mut guard = self.signal_lock();
        self.parked.fetch_add(1, Ordering::SeqCst);

        let result = loop {
            match self.inner.try_put(value) {
                Ok(()) => break Ok(()),
                Err(Full(v)) => value = v,
            }
            let now = Instant::now();
            if now >= deadline {
                break Err(Full(value));
            }
            guard = self
                .not_full
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };

        self.parked.fetch_sub(1, Ordering::SeqCst);
        drop(guard);
        if result.is_ok() {
            self.wake(&self.not_empty);
        }
        result
    }

    /// Get, waiting up to `timeout` for a value
    pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
        if let Some(value) = self.get() {
            return Some(value);
        }

        let deadline = Instant::now() + timeout;
        let mut guard = self.signal_lock();
        self.parked.fetch_add(1, Ordering::SeqCst);

        let result = loop {
            if let Some(value) = self.inner.get() {
                break Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                break None;
            }
            guard = self
                .not_empty
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };

        self.parked.fetch_sub(1, Ordering::SeqCst);
        drop(guard);
        if result.is_some() {
            self.wake(&self.not_full);
        }
        result
    }

    /// Put, parking until a slot frees up
    pub fn put_blocking(&self, mut value: T) {
        loop {
            match self.put_timeout(value, Duration::from_secs(1)) {
                Ok(()) => return,
                Err(Full(v)) => value = v,
            }
        }
    }

    /// Get, parking until a value arrives
    pub fn get_blocking(&self) -> T {
        loop {
            if let Some(value) = self.get_timeout(Duration::from_secs(1)) {
                return value;
            }
        }
    }

    /// Fixed slot count of the wrapped buffer
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Values currently held
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether a `get` would find nothing right now
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Counter snapshot of the wrapped buffer
    pub fn stats(&self) -> BufferStats {
        self.inner.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timeouts_on_boundaries() {
        let buffer = BlockingRingBuffer::new(1).unwrap();
        assert_eq!(buffer.get_timeout(Duration::from_millis(10)), None);

        buffer.put_blocking(1);
        let rejected = buffer.put_timeout(2, Duration::from_millis(10));
        assert_eq!(rejected, Err(Full(2)));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_parked_consumer_is_woken() {
        let buffer = BlockingRingBuffer::new(2).unwrap();

        thread::scope(|s| {
            let consumer = s.spawn(|| buffer.get_blocking());
            thread::sleep(Duration::from_millis(20));
            assert!(buffer.put(42));
            assert_eq!(consumer.join().unwrap(), 42);
        });
    }

    #[test]
    fn test_parked_producer_is_woken() {
        let buffer = BlockingRingBuffer::new(1).unwrap();
        buffer.put_blocking(1);

        thread::scope(|s| {
            let producer = s.spawn(|| buffer.put_blocking(2));
            thread::sleep(Duration::from_millis(20));
            assert_eq!(buffer.get(), Some(1));
            producer.join().unwrap();
        });

        assert_eq!(buffer.get(), Some(2));
    }

    #[test]
    fn test_blocking_transfer_single_slot() {
        const MAX: u32 = 2_000;
        let buffer = BlockingRingBuffer::new(1).unwrap();
        let mut dst = Vec::new();

        thread::scope(|s| {
            s.spawn(|| {
                for v in 0..MAX {
                    buffer.put_blocking(v);
                }
            });
            s.spawn(|| {
                while dst.len() < MAX as usize {
                    dst.push(buffer.get_blocking());
                }
            });
        });

        assert_eq!(dst, (0..MAX).collect::<Vec<_>>());
    }
}
