//! # Drover Core
//!
//! `drover_core` provides the shared building blocks of the drover session
//! pool: error types, typed identifiers, the factory trait that pooled handles
//! are produced by, and the small value types used for observability and
//! configuration.
//!
//! ## Core Principles
//!
//! 1. **Bounded construction**: a pool never builds more handles than its
//!    capacity, whatever backend produces them.
//!
//! 2. **Exclusive ownership**: a handle is owned by exactly one party at a
//!    time, either the pool (idle) or a single consumer (checked out).
//!
//! 3. **Destroy once**: every handle a factory produces is handed back to the
//!    same factory for destruction exactly once.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all drover components
//! - **id**: Strongly-typed identifier types
//! - **traits**: The `HandleFactory` interface
//! - **types**: Pool state and status snapshots
//! - **utils**: Configuration values and log levels

pub mod error;
pub mod id;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export key types and traits for convenience
pub use error::{ConfigError, Error, FactoryError, PoolError, Result};
pub use id::{HandleId, PoolId, SessionId};
pub use traits::HandleFactory;
pub use types::{PoolState, PoolStatus};
pub use utils::{ConfigValue, LogLevel};
