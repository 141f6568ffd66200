//! Synchronization primitives used by the pool.

pub mod atomic;
pub mod gate;

pub use atomic::{AtomicCounter, SlotCounter, StateCell};
pub use gate::{CreationGate, CreationPermit, GateEntry};
