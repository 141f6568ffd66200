//! Error types for the drover session pool.
//!
//! Errors are organized by subsystem: the pool itself, the factories that
//! build pooled handles, and configuration loading. The root error type,
//! `Error`, can wrap any of them for uniform handling at the top level.

use std::time::Duration;

use crate::id::HandleId;
use thiserror::Error;

/// Root error type for drover.
#[derive(Debug, Error)]
pub enum Error {
    /// Pool lifecycle and acquisition errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Handle construction or destruction errors
    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors reported by a resource pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been shut down; the operation will never succeed again
    #[error("pool is closed")]
    PoolClosed,

    /// Building a new handle failed; the factory error is passed through as-is
    #[error("handle creation failed: {0}")]
    Factory(#[from] FactoryError),

    /// The handle was not issued by this pool
    #[error("handle {0} does not belong to this pool")]
    UnknownHandle(HandleId),

    /// `shutdown` was called more than once
    #[error("pool is already closed")]
    AlreadyClosed,

    /// More handles were registered than the pool's capacity allows.
    ///
    /// This indicates a bug in slot reservation, not caller misuse.
    #[error("capacity of {capacity} handles exceeded")]
    CapacityExceeded {
        /// The configured capacity
        capacity: usize,
    },

    /// A handle id was registered twice.
    ///
    /// Like `CapacityExceeded`, this indicates a bug in the pool itself.
    #[error("handle {0} is already registered")]
    DuplicateHandle(HandleId),

    /// No handle became available before the deadline
    #[error("timed out after {0:?} waiting for a handle")]
    Timeout(Duration),

    /// No handle is idle and capacity is used up (non-blocking acquire only)
    #[error("no handle available and capacity exhausted")]
    Exhausted,

    /// One or more handles could not be destroyed during shutdown
    #[error("failed to destroy {} handle(s) during teardown", .0.len())]
    Teardown(Vec<(HandleId, FactoryError)>),
}

/// Errors produced while building or destroying a pooled handle.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The backend selector did not name a known backend
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// A required option was not configured
    #[error("required option '{0}' is not set")]
    MissingOption(String),

    /// An option was present but unusable
    #[error("invalid option '{key}': {reason}")]
    InvalidOption {
        /// Option name
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The driver executable could not be located
    #[error("driver executable not found: {0}")]
    DriverNotFound(String),

    /// The driver or remote session could not be started
    #[error("failed to launch session: {0}")]
    LaunchFailed(String),

    /// The session could not be torn down cleanly
    #[error("failed to tear down session: {0}")]
    TeardownFailed(String),

    /// I/O failure talking to the driver process or filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    /// The configuration source could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The configuration parsed but holds unusable values
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type used throughout drover.
pub type Result<T> = std::result::Result<T, Error>;
