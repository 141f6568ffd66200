//! Bounded pool of expensive handles.
//!
//! Handles are built lazily by a [`HandleFactory`] the first time demand
//! exceeds supply, up to a fixed capacity, and are reused afterwards.
//! Consumers that find the pool saturated wait in line; a released handle
//! goes to the longest-waiting consumer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use drover_core::{
    ConfigError, FactoryError, HandleFactory, HandleId, PoolError, PoolId, PoolState, PoolStatus,
};
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::lease::Lease;
use crate::queue::{AvailabilityQueue, PopOutcome};
use crate::registry::HandleRegistry;
use crate::sync::{AtomicCounter, CreationGate, GateEntry, SlotCounter, StateCell};

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 5;

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Configuration for a resource pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of handles the pool will ever build
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Default timeout for `acquire`, in milliseconds; unset waits forever
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,
}

impl PoolConfig {
    /// Configuration with the given capacity and no acquire timeout.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the default acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = Some(timeout.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    /// The default acquire timeout, if any.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid(
                "pool capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            acquire_timeout_ms: None,
        }
    }
}

/// Outcome of [`ResourcePool::shutdown`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Idle handles destroyed during shutdown
    pub destroyed: usize,

    /// Checked-out handles; each is destroyed when its lease is released
    pub deferred: Vec<HandleId>,

    /// Handles whose destruction failed, with the factory's error
    pub failures: Vec<(HandleId, FactoryError)>,
}

impl ShutdownReport {
    /// Whether every destruction attempted so far succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert a report with failures into `PoolError::Teardown`.
    pub fn into_result(self) -> Result<Self, PoolError> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(PoolError::Teardown(self.failures))
        }
    }
}

/// A handle sitting in the availability queue.
pub(crate) struct IdleHandle<H> {
    id: HandleId,
    handle: H,
    created_at: Instant,
}

#[derive(Debug, Default)]
struct PoolCounters {
    acquired: AtomicCounter,
    reused: AtomicCounter,
    released: AtomicCounter,
    created: AtomicCounter,
    creation_failures: AtomicCounter,
    destroyed: AtomicCounter,
    destroy_failures: AtomicCounter,
    checked_out: AtomicCounter,
}

/// Releases a creation slot unless committed.
///
/// Freeing goes through the queue so a parked consumer learns about it.
struct SlotReservation<'a, H> {
    slots: &'a SlotCounter,
    queue: &'a AvailabilityQueue<IdleHandle<H>>,
    committed: bool,
}

impl<H> SlotReservation<'_, H> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl<H> Drop for SlotReservation<'_, H> {
    fn drop(&mut self) {
        if !self.committed {
            let slots = self.slots;
            self.queue.notify_slot_freed_with(|| slots.release());
        }
    }
}

/// A bounded pool of handles built by `F`.
pub struct ResourcePool<F: HandleFactory> {
    id: PoolId,
    factory: F,
    config: PoolConfig,
    state: StateCell,

    /// Reserved creation slots; never exceeds capacity
    slots: SlotCounter,

    /// Admits one creation at a time; waiters honor deadlines and shutdown
    creating: CreationGate,

    /// Held briefly to record a new handle, and by shutdown to drain
    registry: Mutex<HandleRegistry>,

    queue: AvailabilityQueue<IdleHandle<F::Handle>>,
    counters: PoolCounters,
}

impl<F: HandleFactory> ResourcePool<F> {
    /// Create a new pool. No handle is built until the first `acquire`.
    pub fn new(factory: F, config: PoolConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        let pool = Arc::new(Self {
            id: PoolId::new(),
            factory,
            slots: SlotCounter::new(config.capacity),
            creating: CreationGate::new(),
            registry: Mutex::new(HandleRegistry::new(config.capacity)),
            queue: AvailabilityQueue::new(),
            state: StateCell::new(),
            counters: PoolCounters::default(),
            config,
        });

        info!(
            "Created pool {} for {} with capacity {}",
            pool.id,
            pool.factory.describe(),
            pool.config.capacity
        );

        Ok(pool)
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn state(&self) -> PoolState {
        self.state.load()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Acquire a handle, waiting up to the configured default timeout.
    pub fn acquire(self: &Arc<Self>) -> Result<Lease<F>, PoolError> {
        match self.config.default_timeout() {
            Some(timeout) => self.acquire_timeout(timeout),
            None => self.acquire_inner(None, true),
        }
    }

    /// Acquire a handle, waiting at most `timeout`.
    pub fn acquire_timeout(self: &Arc<Self>, timeout: Duration) -> Result<Lease<F>, PoolError> {
        let deadline = Instant::now().checked_add(timeout);
        self.acquire_inner(deadline.map(|d| (d, timeout)), true)
    }

    /// Acquire a handle without waiting.
    ///
    /// May still build a new handle if capacity allows and no other creation
    /// is in flight; otherwise fails with `Exhausted`.
    pub fn try_acquire(self: &Arc<Self>) -> Result<Lease<F>, PoolError> {
        self.acquire_inner(None, false)
    }

    fn acquire_inner(
        self: &Arc<Self>,
        deadline: Option<(Instant, Duration)>,
        blocking: bool,
    ) -> Result<Lease<F>, PoolError> {
        // Set once woken with a freed slot, so a lost race keeps our place
        let mut resumed = false;

        loop {
            if self.is_closed() {
                return Err(PoolError::PoolClosed);
            }

            if let Some(idle) = self.queue.try_pop() {
                return Ok(self.checkout(idle));
            }

            if self.slots.try_reserve() {
                return self.create_reserved(deadline, blocking);
            }

            if !blocking {
                trace!("Pool {} exhausted", self.id);
                return Err(PoolError::Exhausted);
            }

            trace!("Pool {} saturated, waiting for a handle", self.id);
            let slots = &self.slots;
            let until = deadline.map(|(d, _)| d);
            let outcome = if resumed {
                self.queue.pop_wait_resumed(until, || slots.has_room())
            } else {
                self.queue.pop_wait(until, || slots.has_room())
            };
            match outcome {
                PopOutcome::Item(idle) => return Ok(self.checkout(idle)),
                PopOutcome::Closed => return Err(PoolError::PoolClosed),
                PopOutcome::SlotFreed => resumed = true,
                PopOutcome::TimedOut => return Err(self.timed_out(deadline)),
            }
        }
    }

    fn timed_out(&self, deadline: Option<(Instant, Duration)>) -> PoolError {
        let timeout = deadline.map(|(_, t)| t).unwrap_or_default();
        debug!("Timed out after {:?} waiting on pool {}", timeout, self.id);
        PoolError::Timeout(timeout)
    }

    /// Build a handle in a slot that has already been reserved.
    ///
    /// Only one creation runs at a time. Waiting for the creation gate is
    /// bounded by the caller's deadline and ends early on shutdown.
    fn create_reserved(
        self: &Arc<Self>,
        deadline: Option<(Instant, Duration)>,
        blocking: bool,
    ) -> Result<Lease<F>, PoolError> {
        let reservation = SlotReservation {
            slots: &self.slots,
            queue: &self.queue,
            committed: false,
        };

        let entry = if blocking {
            self.creating.enter(deadline.map(|(d, _)| d))
        } else {
            self.creating.try_enter()
        };
        let permit = match entry {
            GateEntry::Entered(permit) => permit,
            GateEntry::Closed => return Err(PoolError::PoolClosed),
            GateEntry::TimedOut => return Err(self.timed_out(deadline)),
            GateEntry::Busy => {
                trace!("Pool {} is already creating a handle", self.id);
                return Err(PoolError::Exhausted);
            }
        };

        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        // A handle may have come back while we waited for the gate.
        if let Some(idle) = self.queue.try_pop() {
            drop(permit);
            drop(reservation);
            return Ok(self.checkout(idle));
        }

        let handle = match self.factory.create() {
            Ok(handle) => handle,
            Err(e) => {
                self.counters.creation_failures.increment();
                drop(permit);
                drop(reservation);
                warn!("Pool {} failed to create a handle: {}", self.id, e);
                return Err(PoolError::Factory(e));
            }
        };
        self.counters.created.increment();
        let id = HandleId::new();

        // Shutdown flips the state before draining the registry, so checking
        // it under the registry lock decides who destroys this handle.
        let mut registry = self.registry.lock();
        if self.is_closed() {
            drop(registry);
            drop(permit);
            drop(reservation);
            debug!("Pool {} closed during creation, destroying handle {}", self.id, id);
            if let Err(e) = self.destroy(id, handle) {
                warn!(
                    "Pool {} could not discard handle {} built during shutdown: {}",
                    self.id, id, e
                );
            }
            return Err(PoolError::PoolClosed);
        }

        if let Err(e) = registry.register(id) {
            drop(registry);
            drop(permit);
            drop(reservation);
            error!("Pool {} registry rejected handle {}: {}", self.id, id, e);
            if let Err(destroy_err) = self.destroy(id, handle) {
                error!(
                    "Pool {} could not discard rejected handle {}: {}",
                    self.id, id, destroy_err
                );
            }
            return Err(e);
        }
        reservation.commit();
        drop(registry);
        drop(permit);

        debug!("Pool {} created handle {}", self.id, id);
        self.counters.acquired.increment();
        self.counters.checked_out.increment();
        Ok(Lease::new(Arc::clone(self), id, handle, Instant::now()))
    }

    fn checkout(self: &Arc<Self>, idle: IdleHandle<F::Handle>) -> Lease<F> {
        self.counters.acquired.increment();
        self.counters.reused.increment();
        self.counters.checked_out.increment();
        debug!("Pool {} reusing handle {}", self.id, idle.id);
        Lease::new(Arc::clone(self), idle.id, idle.handle, idle.created_at)
    }

    /// Return a leased handle.
    ///
    /// While running, the handle goes to the oldest waiter or back into the
    /// queue. After shutdown it is destroyed. A lease issued by a different
    /// pool is rejected with `UnknownHandle` and returns to its own pool.
    pub fn release(&self, lease: Lease<F>) -> Result<(), PoolError> {
        if lease.pool_id() != self.id {
            warn!(
                "Handle {} released to pool {} but belongs to pool {}",
                lease.id(),
                self.id,
                lease.pool_id()
            );
            return Err(PoolError::UnknownHandle(lease.id()));
        }

        let (id, handle, created_at) = lease.take();
        match handle {
            Some(handle) => self.return_handle(id, handle, created_at),
            None => Ok(()),
        }
    }

    pub(crate) fn return_handle(
        &self,
        id: HandleId,
        handle: F::Handle,
        created_at: Instant,
    ) -> Result<(), PoolError> {
        self.counters.released.increment();
        self.counters.checked_out.decrement();

        let idle = IdleHandle {
            id,
            handle,
            created_at,
        };
        match self.queue.push(idle) {
            Ok(()) => {
                trace!("Handle {} returned to pool {}", id, self.id);
                Ok(())
            }
            Err(idle) => {
                debug!("Pool {} is closed, destroying returned handle {}", self.id, id);
                self.destroy(idle.id, idle.handle)
                    .map_err(PoolError::Factory)
            }
        }
    }

    fn destroy(&self, id: HandleId, handle: F::Handle) -> Result<(), FactoryError> {
        match self.factory.destroy(handle) {
            Ok(()) => {
                self.counters.destroyed.increment();
                trace!("Destroyed handle {}", id);
                Ok(())
            }
            Err(e) => {
                self.counters.destroy_failures.increment();
                warn!("Failed to destroy handle {}: {}", id, e);
                Err(e)
            }
        }
    }

    /// Shut the pool down.
    ///
    /// Wakes every waiting consumer with `PoolClosed`, including those queued
    /// for the creation gate, then destroys all idle handles in creation
    /// order. A creation still in flight is not waited for; its creator
    /// destroys the new handle. Handles that are checked out are destroyed
    /// when released. Succeeds once; later calls fail with `AlreadyClosed`.
    pub fn shutdown(&self) -> Result<ShutdownReport, PoolError> {
        if !self.state.close() {
            warn!("Pool {} is already closed", self.id);
            return Err(PoolError::AlreadyClosed);
        }

        info!("Shutting down pool {}", self.id);

        let mut idle: HashMap<HandleId, F::Handle> = self
            .queue
            .close()
            .into_iter()
            .map(|h| (h.id, h.handle))
            .collect();
        self.creating.close();

        let registered = self.registry.lock().drain();

        let mut report = ShutdownReport::default();
        for entry in registered {
            match idle.remove(&entry.id) {
                Some(handle) => match self.destroy(entry.id, handle) {
                    Ok(()) => report.destroyed += 1,
                    Err(e) => report.failures.push((entry.id, e)),
                },
                None => report.deferred.push(entry.id),
            }
        }

        // Anything left was never registered; still ours to destroy.
        for (id, handle) in idle {
            match self.destroy(id, handle) {
                Ok(()) => report.destroyed += 1,
                Err(e) => report.failures.push((id, e)),
            }
        }

        info!(
            "Pool {} shut down: {} destroyed, {} deferred, {} failed",
            self.id,
            report.destroyed,
            report.deferred.len(),
            report.failures.len()
        );

        Ok(report)
    }

    /// Snapshot of the pool for observability.
    pub fn status(&self) -> PoolStatus {
        let c = &self.counters;
        let created = c
            .created
            .get()
            .saturating_sub(c.destroyed.get() + c.destroy_failures.get());

        PoolStatus {
            state: self.state(),
            capacity: self.capacity(),
            created,
            idle: self.queue.len(),
            checked_out: c.checked_out.get(),
            waiters: self.queue.waiter_count(),
            total_acquired: c.acquired.get(),
            total_reused: c.reused.get(),
            total_released: c.released.get(),
            total_created: c.created.get(),
            creation_failures: c.creation_failures.get(),
            total_destroyed: c.destroyed.get(),
            destroy_failures: c.destroy_failures.get(),
        }
    }
}

impl<F: HandleFactory> Drop for ResourcePool<F> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        match self.shutdown() {
            Ok(report) if !report.is_clean() => {
                warn!(
                    "Pool {} dropped with {} teardown failure(s)",
                    self.id,
                    report.failures.len()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Pool {} failed to shut down on drop: {}", self.id, e),
        }
    }
}

impl<F: HandleFactory> std::fmt::Debug for ResourcePool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("id", &self.id)
            .field("capacity", &self.config.capacity)
            .field("state", &self.state())
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        destroyed: AtomicUsize,
    }

    impl HandleFactory for CountingFactory {
        type Handle = usize;

        fn create(&self) -> Result<usize, FactoryError> {
            Ok(self.created.fetch_add(1, Ordering::SeqCst))
        }

        fn destroy(&self, _handle: usize) -> Result<(), FactoryError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_pool_config_defaults() {
        let config: PoolConfig = toml::from_str("").unwrap();
        assert_eq!(config, PoolConfig::default());
        assert_eq!(config.capacity, 5);
        assert!(config.default_timeout().is_none());

        let config: PoolConfig = toml::from_str("capacity = 2\nacquire_timeout_ms = 250").unwrap();
        assert_eq!(config.capacity, 2);
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = ResourcePool::new(CountingFactory::default(), PoolConfig::with_capacity(0));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_lazy_creation() {
        let pool = ResourcePool::new(CountingFactory::default(), PoolConfig::default()).unwrap();
        assert_eq!(pool.status().total_created, 0);

        let lease = pool.acquire().unwrap();
        assert_eq!(*lease, 0);
        assert_eq!(pool.factory().created.load(Ordering::SeqCst), 1);

        let status = pool.status();
        assert_eq!(status.created, 1);
        assert_eq!(status.checked_out, 1);
        assert_eq!(status.idle, 0);
    }

    #[test]
    fn test_release_then_reuse() {
        let pool = ResourcePool::new(CountingFactory::default(), PoolConfig::default()).unwrap();

        let lease = pool.acquire().unwrap();
        let id = lease.id();
        assert!(lease.acquired_at() <= Instant::now());
        pool.release(lease).unwrap();

        let lease = pool.acquire().unwrap();
        assert_eq!(lease.id(), id);
        assert_eq!(pool.status().total_reused, 1);
        assert_eq!(pool.status().total_created, 1);
    }

    #[test]
    fn test_drop_releases() {
        let pool = ResourcePool::new(CountingFactory::default(), PoolConfig::default()).unwrap();
        {
            let _lease = pool.acquire().unwrap();
            assert_eq!(pool.status().checked_out, 1);
        }
        let status = pool.status();
        assert_eq!(status.checked_out, 0);
        assert_eq!(status.idle, 1);
        assert_eq!(status.total_released, 1);
    }

    #[test]
    fn test_try_acquire_exhausted() {
        let pool = ResourcePool::new(CountingFactory::default(), PoolConfig::with_capacity(1)).unwrap();
        let _lease = pool.try_acquire().unwrap();
        assert!(matches!(pool.try_acquire(), Err(PoolError::Exhausted)));
    }

    #[test]
    fn test_release_to_wrong_pool() {
        let a = ResourcePool::new(CountingFactory::default(), PoolConfig::default()).unwrap();
        let b = ResourcePool::new(CountingFactory::default(), PoolConfig::default()).unwrap();

        let lease = a.acquire().unwrap();
        let id = lease.id();
        match b.release(lease) {
            Err(PoolError::UnknownHandle(rejected)) => assert_eq!(rejected, id),
            other => panic!("expected UnknownHandle, got {:?}", other),
        }

        // The rejected lease went home to its own pool
        assert_eq!(a.status().idle, 1);
        assert_eq!(b.status().idle, 0);
    }

    #[test]
    fn test_shutdown_defers_checked_out() {
        let pool = ResourcePool::new(CountingFactory::default(), PoolConfig::default()).unwrap();
        let held = pool.acquire().unwrap();
        let idle = pool.acquire().unwrap();
        let held_id = held.id();
        idle.release().unwrap();

        let report = pool.shutdown().unwrap();
        assert_eq!(report.destroyed, 1);
        assert_eq!(report.deferred, vec![held_id]);
        assert!(report.is_clean());
        assert!(held.is_revoked());

        held.release().unwrap();
        assert_eq!(pool.factory().destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(pool.status().idle, 0);
    }

    #[test]
    fn test_drop_shuts_down() {
        let factory = Arc::new(AtomicUsize::new(0));

        struct Tracked(Arc<AtomicUsize>);
        impl HandleFactory for Tracked {
            type Handle = ();
            fn create(&self) -> Result<(), FactoryError> {
                Ok(())
            }
            fn destroy(&self, _handle: ()) -> Result<(), FactoryError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        {
            let pool = ResourcePool::new(Tracked(Arc::clone(&factory)), PoolConfig::default()).unwrap();
            let a = pool.acquire().unwrap();
            let b = pool.acquire().unwrap();
            drop(a);
            drop(b);
        }

        assert_eq!(factory.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_acquire_respects_capacity() {
        let pool = ResourcePool::new(CountingFactory::default(), PoolConfig::with_capacity(3)).unwrap();
        let mut handles = vec![];

        for _ in 0..10 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                for _ in 0..20 {
                    let lease = pool.acquire().unwrap();
                    thread::sleep(Duration::from_micros(50));
                    drop(lease);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let status = pool.status();
        assert!(status.total_created <= 3);
        assert_eq!(status.total_acquired, 200);
        assert_eq!(status.total_released, 200);
        assert_eq!(status.checked_out, 0);
    }
}
