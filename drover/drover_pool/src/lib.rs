//! # Drover Pool
//!
//! A bounded, thread-safe pool of expensive handles with lazy creation,
//! fair blocking acquisition and a one-shot shutdown.
//!
//! ## Key Components
//!
//! - **ResourcePool**: acquisition, release and shutdown; hands out leases
//! - **Lease**: exclusive ownership of a checked-out handle, returned on drop
//! - **AvailabilityQueue**: FIFO of idle handles with direct hand-off to the
//!   oldest waiter
//! - **HandleRegistry**: every handle the pool has built, in creation order
//!
//! ## Example
//!
//! ```
//! use drover_core::{FactoryError, HandleFactory};
//! use drover_pool::{PoolConfig, ResourcePool};
//!
//! struct Buffers;
//!
//! impl HandleFactory for Buffers {
//!     type Handle = Vec<u8>;
//!
//!     fn create(&self) -> Result<Vec<u8>, FactoryError> {
//!         Ok(Vec::with_capacity(4096))
//!     }
//! }
//!
//! let pool = ResourcePool::new(Buffers, PoolConfig::with_capacity(2)).unwrap();
//! let mut buf = pool.acquire().unwrap();
//! buf.extend_from_slice(b"hello");
//! pool.release(buf).unwrap();
//!
//! let report = pool.shutdown().unwrap();
//! assert_eq!(report.destroyed, 1);
//! ```

pub mod lease;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod sync;

pub use lease::Lease;
pub use pool::{PoolConfig, ResourcePool, ShutdownReport, DEFAULT_CAPACITY};
pub use queue::{AvailabilityQueue, PopOutcome};
pub use registry::HandleRegistry;
