//! Data structures shared between the pool and its consumers.

pub mod state;

pub use state::{PoolState, PoolStatus};
