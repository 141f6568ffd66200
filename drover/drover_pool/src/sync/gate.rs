//! Exclusive creation gate with deadline and close-aware waiting.
//!
//! Only one holder at a time. Unlike a plain mutex, a thread waiting to
//! enter can be turned away by its deadline or by [`CreationGate::close`].

use std::time::Instant;

use log::trace;
use parking_lot::{Condvar, Mutex};

/// Result of trying to enter the gate.
#[derive(Debug)]
pub enum GateEntry<'a> {
    /// The caller now holds the gate until the permit is dropped
    Entered(CreationPermit<'a>),

    /// The gate was closed before the caller got in
    Closed,

    /// The deadline passed while another holder was inside
    TimedOut,

    /// The gate is occupied and the caller asked not to wait
    Busy,
}

#[derive(Debug, Default)]
struct GateState {
    busy: bool,
    closed: bool,
}

/// A gate admitting one holder at a time.
#[derive(Debug, Default)]
pub struct CreationGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl CreationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the gate, waiting until `deadline` if it is occupied.
    pub fn enter(&self, deadline: Option<Instant>) -> GateEntry<'_> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return GateEntry::Closed;
            }
            if !state.busy {
                state.busy = true;
                return GateEntry::Entered(CreationPermit { gate: self });
            }

            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out()
                        && state.busy
                        && !state.closed
                    {
                        return GateEntry::TimedOut;
                    }
                }
                None => self.cond.wait(&mut state),
            }
        }
    }

    /// Enter the gate only if nobody holds it.
    pub fn try_enter(&self) -> GateEntry<'_> {
        let mut state = self.state.lock();
        if state.closed {
            GateEntry::Closed
        } else if state.busy {
            GateEntry::Busy
        } else {
            state.busy = true;
            GateEntry::Entered(CreationPermit { gate: self })
        }
    }

    /// Close the gate and turn every waiter away.
    ///
    /// A current holder keeps its permit until it drops it.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.cond.notify_all();
        trace!("Creation gate closed");
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    fn leave(&self) {
        let mut state = self.state.lock();
        state.busy = false;
        self.cond.notify_one();
    }
}

/// Proof of holding a [`CreationGate`]; leaving happens on drop.
#[derive(Debug)]
pub struct CreationPermit<'a> {
    gate: &'a CreationGate,
}

impl Drop for CreationPermit<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_one_holder_at_a_time() {
        let gate = CreationGate::new();
        let permit = match gate.try_enter() {
            GateEntry::Entered(permit) => permit,
            other => panic!("expected entry, got {:?}", other),
        };
        assert!(gate.is_busy());
        assert!(matches!(gate.try_enter(), GateEntry::Busy));

        drop(permit);
        assert!(!gate.is_busy());
        assert!(matches!(gate.try_enter(), GateEntry::Entered(_)));
    }

    #[test]
    fn test_enter_times_out_while_occupied() {
        let gate = CreationGate::new();
        let _permit = gate.try_enter();

        let start = Instant::now();
        let deadline = start + Duration::from_millis(30);
        assert!(matches!(gate.enter(Some(deadline)), GateEntry::TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_close_turns_waiters_away() {
        let gate = Arc::new(CreationGate::new());
        let holder = Arc::clone(&gate);
        let (tx, rx) = std::sync::mpsc::channel();

        let held = thread::spawn(move || {
            let _permit = holder.try_enter();
            // Keep the gate until the waiter has been turned away
            rx.recv().ok();
        });
        while !gate.is_busy() {
            thread::sleep(Duration::from_millis(1));
        }

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || matches!(gate.enter(None), GateEntry::Closed))
        };
        thread::sleep(Duration::from_millis(20));

        gate.close();
        assert!(waiter.join().unwrap());
        tx.send(()).unwrap();
        held.join().unwrap();

        assert!(matches!(gate.try_enter(), GateEntry::Closed));
    }

    #[test]
    fn test_leaving_admits_next_waiter() {
        let gate = Arc::new(CreationGate::new());
        let permit = gate.try_enter();

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || matches!(gate.enter(None), GateEntry::Entered(_)))
        };
        thread::sleep(Duration::from_millis(20));

        drop(permit);
        assert!(waiter.join().unwrap());
    }
}
