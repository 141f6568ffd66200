//! Atomic building blocks for the pool.
//!
//! Lock-free counters and the one-way state cell used for lifecycle and
//! capacity accounting.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use drover_core::PoolState;

/// A counter that can be incremented and read atomically.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicUsize,
}

impl AtomicCounter {
    /// Create a new atomic counter with an initial value.
    pub fn new(initial_value: usize) -> Self {
        Self {
            value: AtomicUsize::new(initial_value),
        }
    }

    /// Increment the counter and return the new value.
    pub fn increment(&self) -> usize {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement the counter and return the new value. Saturates at zero.
    pub fn decrement(&self) -> usize {
        match self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => 0,
        }
    }

    /// Get the current value of the counter.
    pub fn get(&self) -> usize {
        self.value.load(Ordering::SeqCst)
    }
}

/// Holds a `PoolState` that can only move from `Running` to `Closed`.
#[derive(Debug)]
pub struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    /// Create a cell in the `Running` state.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PoolState::Running.as_u8()),
        }
    }

    /// Current state.
    pub fn load(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the cell has been closed.
    pub fn is_closed(&self) -> bool {
        self.load() == PoolState::Closed
    }

    /// Move to `Closed`.
    ///
    /// Returns true if this call performed the transition, false if the cell
    /// was already closed.
    pub fn close(&self) -> bool {
        self.state
            .compare_exchange(
                PoolState::Running.as_u8(),
                PoolState::Closed.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Capacity gate: counts reserved creation slots against a fixed limit.
///
/// This is the single source of truth for how many handles may exist.
#[derive(Debug)]
pub struct SlotCounter {
    used: AtomicUsize,
    limit: usize,
}

impl SlotCounter {
    /// Create a gate allowing `limit` slots.
    pub fn new(limit: usize) -> Self {
        Self {
            used: AtomicUsize::new(0),
            limit,
        }
    }

    /// Reserve one slot if the limit has not been reached.
    ///
    /// Returns true if a slot was reserved.
    pub fn try_reserve(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    /// Give back a slot obtained from `try_reserve`.
    pub fn release(&self) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| used.checked_sub(1));
    }

    /// Whether `try_reserve` would currently succeed.
    pub fn has_room(&self) -> bool {
        self.used() < self.limit
    }

    /// Number of reserved slots.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Maximum number of slots.
    pub fn limit(&self) -> usize {
        self.limit
    }
}
