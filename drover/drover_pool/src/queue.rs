//! FIFO availability queue with fair, blocking removal.
//!
//! Released items go straight to the longest-waiting consumer if there is
//! one, otherwise they are parked at the back of the idle list. Every waiter
//! has its own condition variable, so a hand-off wakes exactly the consumer
//! it was meant for.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// Result of a blocking removal.
#[derive(Debug, PartialEq, Eq)]
pub enum PopOutcome<T> {
    /// An item was removed or handed over.
    Item(T),

    /// The queue was closed while waiting.
    Closed,

    /// No item arrived, but capacity to create one was freed.
    SlotFreed,

    /// The deadline passed.
    TimedOut,
}

/// What a waiter finds when it is woken.
enum Delivery<T> {
    Item(T),
    SlotFreed,
    Closed,
}

impl<T> From<Delivery<T>> for PopOutcome<T> {
    fn from(delivery: Delivery<T>) -> Self {
        match delivery {
            Delivery::Item(item) => PopOutcome::Item(item),
            Delivery::SlotFreed => PopOutcome::SlotFreed,
            Delivery::Closed => PopOutcome::Closed,
        }
    }
}

struct Waiter {
    ticket: u64,
    cond: Condvar,
}

struct QueueState<T> {
    idle: VecDeque<T>,
    waiters: VecDeque<Arc<Waiter>>,
    delivered: HashMap<u64, Delivery<T>>,
    next_ticket: u64,
    closed: bool,
}

/// Thread-safe FIFO of available items.
pub struct AvailabilityQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> AvailabilityQueue<T> {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                idle: VecDeque::new(),
                waiters: VecDeque::new(),
                delivered: HashMap::new(),
                next_ticket: 0,
                closed: false,
            }),
        }
    }

    /// Make an item available.
    ///
    /// The oldest waiter receives it directly. Returns the item back if the
    /// queue has been closed; the caller then owns its disposal.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(item);
        }

        if let Some(waiter) = state.waiters.pop_front() {
            state.delivered.insert(waiter.ticket, Delivery::Item(item));
            waiter.cond.notify_one();
        } else {
            state.idle.push_back(item);
        }
        Ok(())
    }

    /// Remove the oldest idle item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.idle.pop_front()
    }

    /// Remove the oldest idle item, waiting in line until one is handed over,
    /// the queue closes, capacity is freed, or `deadline` passes.
    ///
    /// `slot_available` is evaluated once under the queue lock before the
    /// caller parks. Whoever frees capacity does so through
    /// [`notify_slot_freed_with`](Self::notify_slot_freed_with), which runs
    /// under the same lock, so a freed slot is either seen here or delivered
    /// to the parked waiter.
    pub fn pop_wait<F>(&self, deadline: Option<Instant>, slot_available: F) -> PopOutcome<T>
    where
        F: FnOnce() -> bool,
    {
        self.wait_in_line(deadline, slot_available, false)
    }

    /// Like [`pop_wait`](Self::pop_wait), but parks at the head of the line.
    ///
    /// For a waiter that was woken with `SlotFreed` and lost the slot to a
    /// caller that never waited; it keeps its place ahead of later arrivals.
    pub fn pop_wait_resumed<F>(
        &self,
        deadline: Option<Instant>,
        slot_available: F,
    ) -> PopOutcome<T>
    where
        F: FnOnce() -> bool,
    {
        self.wait_in_line(deadline, slot_available, true)
    }

    fn wait_in_line<F>(
        &self,
        deadline: Option<Instant>,
        slot_available: F,
        front: bool,
    ) -> PopOutcome<T>
    where
        F: FnOnce() -> bool,
    {
        let mut state = self.state.lock();
        if state.closed {
            return PopOutcome::Closed;
        }
        if let Some(item) = state.idle.pop_front() {
            return PopOutcome::Item(item);
        }
        if slot_available() {
            return PopOutcome::SlotFreed;
        }

        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        let waiter = Arc::new(Waiter {
            ticket,
            cond: Condvar::new(),
        });
        if front {
            state.waiters.push_front(Arc::clone(&waiter));
        } else {
            state.waiters.push_back(Arc::clone(&waiter));
        }

        loop {
            if let Some(delivery) = state.delivered.remove(&ticket) {
                return delivery.into();
            }

            match deadline {
                Some(deadline) => {
                    if waiter.cond.wait_until(&mut state, deadline).timed_out() {
                        // A hand-off may have raced with the timeout.
                        if let Some(delivery) = state.delivered.remove(&ticket) {
                            return delivery.into();
                        }
                        state.waiters.retain(|w| w.ticket != ticket);
                        return PopOutcome::TimedOut;
                    }
                }
                None => waiter.cond.wait(&mut state),
            }
        }
    }

    /// Run `free` under the queue lock, then wake the oldest waiter so it
    /// can try to use the freed capacity.
    ///
    /// Returns true if a waiter was woken.
    pub fn notify_slot_freed_with<F>(&self, free: F) -> bool
    where
        F: FnOnce(),
    {
        let mut state = self.state.lock();
        free();
        if state.closed {
            return false;
        }
        match state.waiters.pop_front() {
            Some(waiter) => {
                state.delivered.insert(waiter.ticket, Delivery::SlotFreed);
                waiter.cond.notify_one();
                true
            }
            None => false,
        }
    }

    /// Close the queue.
    ///
    /// Wakes every waiter with `Closed` and returns all idle items in FIFO
    /// order. Subsequent calls return nothing.
    pub fn close(&self) -> Vec<T> {
        let mut state = self.state.lock();
        if state.closed {
            return Vec::new();
        }
        state.closed = true;

        let waiters: Vec<Arc<Waiter>> = state.waiters.drain(..).collect();
        for waiter in waiters {
            state.delivered.insert(waiter.ticket, Delivery::Closed);
            waiter.cond.notify_one();
        }

        state.idle.drain(..).collect()
    }

    /// Number of idle items.
    pub fn len(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Whether there are no idle items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of consumers currently parked.
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl<T> Default for AvailabilityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for AvailabilityQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AvailabilityQueue")
            .field("idle", &state.idle.len())
            .field("waiters", &state.waiters.len())
            .field("closed", &state.closed)
            .finish()
    }
}
