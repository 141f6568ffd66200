//! Exclusive ownership of a checked-out handle.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use drover_core::{HandleFactory, HandleId, PoolError, PoolId};
use log::warn;

use crate::pool::ResourcePool;

/// A handle checked out of a [`ResourcePool`].
///
/// The lease owns the handle until it is released, either explicitly via
/// [`Lease::release`] / [`ResourcePool::release`] or implicitly on drop.
/// Leases cannot be cloned, so a handle can never be returned twice.
pub struct Lease<F: HandleFactory> {
    id: HandleId,
    handle: Option<F::Handle>,
    pool: Arc<ResourcePool<F>>,
    created_at: Instant,
    acquired_at: Instant,
}

impl<F: HandleFactory> Lease<F> {
    pub(crate) fn new(
        pool: Arc<ResourcePool<F>>,
        id: HandleId,
        handle: F::Handle,
        created_at: Instant,
    ) -> Self {
        Self {
            id,
            handle: Some(handle),
            pool,
            created_at,
            acquired_at: Instant::now(),
        }
    }

    /// Identity of the leased handle. Stable across reuse.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The pool this lease was issued by.
    pub fn pool_id(&self) -> PoolId {
        self.pool.id()
    }

    /// Get a reference to the handle
    pub fn get(&self) -> &F::Handle {
        self.handle.as_ref().expect("lease holds its handle until released")
    }

    /// Get a mutable reference to the handle
    pub fn get_mut(&mut self) -> &mut F::Handle {
        self.handle.as_mut().expect("lease holds its handle until released")
    }

    /// When this lease was handed out.
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// Time since this lease was handed out.
    pub fn held_duration(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Time since the underlying handle was built.
    pub fn handle_age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether the issuing pool has been shut down.
    ///
    /// A revoked handle is still usable until released, at which point it is
    /// destroyed rather than reused.
    pub fn is_revoked(&self) -> bool {
        self.pool.is_closed()
    }

    /// Return the handle to the pool that issued it.
    pub fn release(self) -> Result<(), PoolError> {
        let pool = Arc::clone(&self.pool);
        pool.release(self)
    }

    /// Take the handle out, leaving the lease inert.
    pub(crate) fn take(mut self) -> (HandleId, Option<F::Handle>, Instant) {
        (self.id, self.handle.take(), self.created_at)
    }
}

impl<F: HandleFactory> Deref for Lease<F> {
    type Target = F::Handle;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<F: HandleFactory> DerefMut for Lease<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.get_mut()
    }
}

impl<F: HandleFactory> Drop for Lease<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.pool.return_handle(self.id, handle, self.created_at) {
                warn!("Failed to return handle {} on drop: {}", self.id, e);
            }
        }
    }
}

impl<F: HandleFactory> fmt::Debug for Lease<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("pool_id", &self.pool.id())
            .field("held_for", &self.held_duration())
            .finish()
    }
}
