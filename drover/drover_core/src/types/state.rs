//! Pool lifecycle state and status snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a pool.
///
/// The only transition is `Running -> Closed`, and it is irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    /// Accepting acquisitions and returns.
    Running,

    /// Shut down; every handle is destroyed or will be on return.
    Closed,
}

impl PoolState {
    /// Encode as a byte for atomic storage.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Closed => 1,
        }
    }

    /// Decode from the byte produced by `as_u8`.
    ///
    /// Any non-zero value decodes as `Closed`.
    pub fn from_u8(value: u8) -> Self {
        if value == 0 {
            Self::Running
        } else {
            Self::Closed
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Point-in-time view of a pool, for observability.
///
/// Gauges (`created`, `idle`, `checked_out`, `waiters`) are sampled without a
/// global lock, so under concurrent activity they may be mutually off by the
/// operations in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Current lifecycle state
    pub state: PoolState,

    /// Maximum number of handles the pool will ever construct
    pub capacity: usize,

    /// Handles constructed and not yet destroyed or released for teardown
    pub created: usize,

    /// Handles waiting in the availability queue
    pub idle: usize,

    /// Handles currently owned by consumers
    pub checked_out: usize,

    /// Consumers blocked in `acquire`
    pub waiters: usize,

    /// Successful acquisitions over the pool's lifetime
    pub total_acquired: usize,

    /// Acquisitions served by an existing handle
    pub total_reused: usize,

    /// Handles returned by consumers
    pub total_released: usize,

    /// Handles built by the factory
    pub total_created: usize,

    /// Factory failures while building a handle
    pub creation_failures: usize,

    /// Handles destroyed
    pub total_destroyed: usize,

    /// Factory failures while destroying a handle
    pub destroy_failures: usize,
}

impl PoolStatus {
    /// Whether every slot of the pool has been built.
    pub fn is_saturated(&self) -> bool {
        self.created >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_u8() {
        assert_eq!(PoolState::from_u8(PoolState::Running.as_u8()), PoolState::Running);
        assert_eq!(PoolState::from_u8(PoolState::Closed.as_u8()), PoolState::Closed);
        assert_eq!(PoolState::from_u8(7), PoolState::Closed);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PoolState::Running.to_string(), "running");
        assert_eq!(PoolState::Closed.to_string(), "closed");
        assert_eq!(serde_json::to_string(&PoolState::Closed).unwrap(), "\"closed\"");
    }
}
