//! Mutex-Guarded Ring Buffer Implementation

use crate::{BufferStats, Full, RingBufferError};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// State guarded by the buffer lock
struct State<T> {
    /// Pre-allocated storage, one `Option` per slot
    slots: Box<[Option<T>]>,
    /// Next logical position to read (never wraps)
    head: u64,
    /// Next logical position to write (never wraps)
    tail: u64,
    total_put: u64,
    total_get: u64,
    rejected_puts: u64,
    empty_gets: u64,
}

impl<T> State<T> {
    fn len(&self) -> usize {
        (self.tail - self.head) as usize
    }
}

/// Fixed-capacity FIFO ring buffer
///
/// `head` and `tail` are unbounded counters; only the slot index is taken
/// modulo the capacity, so `tail - head` is the element count and full and
/// empty can never be confused. Every check-then-mutate sequence runs under
/// one lock, which makes the buffer safe for any number of producers and
/// consumers.
pub struct RingBuffer<T> {
    state: Mutex<State<T>>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty ring buffer with exactly `capacity` slots
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 {
            return Err(RingBufferError::InvalidCapacity(capacity));
        }

        debug!("Creating ring buffer with capacity {}", capacity);
        let slots: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Ok(Self {
            state: Mutex::new(State {
                slots: slots.into_boxed_slice(),
                head: 0,
                tail: 0,
                total_put: 0,
                total_get: 0,
                rejected_puts: 0,
                empty_gets: 0,
            }),
            capacity,
        })
    }

    /// Every critical section leaves the counters consistent, so a guard
    /// poisoned by a panicking peer is still safe to use.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, position: u64) -> usize {
        (position % self.capacity as u64) as usize
    }

    /// Put a value at the tail, handing it back if the buffer is full
    pub fn try_put(&self, value: T) -> Result<(), Full<T>> {
        let mut state = self.lock();

        if state.len() == self.capacity {
            state.rejected_puts += 1;
            return Err(Full(value));
        }

        let idx = self.slot(state.tail);
        state.slots[idx] = Some(value);
        state.tail += 1;
        state.total_put += 1;
        Ok(())
    }

    /// Put a value at the tail; returns `false` without touching the buffer
    /// if it is full
    pub fn put(&self, value: T) -> bool {
        self.try_put(value).is_ok()
    }

    /// Take the value at the head, or `None` if the buffer is empty
    pub fn get(&self) -> Option<T> {
        let mut state = self.lock();

        if state.len() == 0 {
            state.empty_gets += 1;
            return None;
        }

        let idx = self.slot(state.head);
        let value = state.slots[idx].take();
        state.head += 1;
        state.total_get += 1;
        value
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of values currently held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }

    /// Snapshot occupancy and lifetime counters
    pub fn stats(&self) -> BufferStats {
        let state = self.lock();
        BufferStats {
            capacity: self.capacity,
            len: state.len(),
            total_put: state.total_put,
            total_get: state.total_get,
            rejected_puts: state.rejected_puts,
            empty_gets: state.empty_gets,
        }
    }

    /// Drop every held value and leave the buffer empty
    pub fn clear(&self) {
        let mut state = self.lock();
        for position in state.head..state.tail {
            let idx = self.slot(position);
            state.slots[idx] = None;
        }
        state.head = state.tail;
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("head", &state.head)
            .field("tail", &state.tail)
            .finish()
    }
}
