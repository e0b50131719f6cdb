//! Resource pool: bounded, lazily grown and shared by concurrent callers.
//!
//! All pool state sits behind one lock. Callers that find the pool empty
//! park on a [`Notify`] and re-check the state after every wake-up; growth
//! runs as a background task so the lock is never held across a factory
//! call.

pub mod config;
mod grow;
mod state;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::{PoolError, Result};
use crate::factory::Factory;
use crate::lease::{Lease, LeaseId};

pub use config::PoolConfig;
pub use state::PoolStats;

use grow::GrowTicket;
use state::{Idle, State};

/// Inner shared state for the pool.
pub(crate) struct Shared<F: Factory> {
    factory: F,
    config: PoolConfig,
    state: Mutex<State<F::Resource>>,
    /// Woken (all at once) whenever a resource may have become available.
    available: Notify,
}

impl<F: Factory> Shared<F> {
    /// Return a busy resource to the idle stack and wake waiters.
    ///
    /// Hands the resource back if `id` is not checked out here, which is
    /// the case for every lease once the pool has been shut down.
    pub(crate) fn check_in(
        &self,
        id: LeaseId,
        resource: F::Resource,
    ) -> std::result::Result<(), F::Resource> {
        let (checkout, idle, busy) = {
            let mut state = self.state.lock();
            let checkout = state.check_in(id, resource)?;
            (checkout, state.idle.len(), state.busy.len())
        };
        tracing::debug!(
            lease_id = %id,
            held_ms = duration_ms(checkout.since.elapsed()),
            idle,
            busy,
            "resource checked in"
        );
        self.available.notify_waiters();
        Ok(())
    }

    /// Drop `id` from the busy set without returning it to the pool.
    pub(crate) fn forget(&self, id: LeaseId) -> bool {
        let removed = self.state.lock().busy.remove(&id).is_some();
        if removed {
            self.available.notify_waiters();
        }
        removed
    }

    /// Destroy a resource the pool no longer tracks, from a sync context.
    pub(crate) fn dispose(self: &Arc<Self>, resource: F::Resource) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(self);
                drop(handle.spawn(async move { shared.destroy(resource).await }));
            }
            Err(_) => {
                tracing::debug!("no runtime available, dropping resource without factory teardown");
                drop(resource);
                self.state.lock().record_destroyed();
            }
        }
    }

    /// Tear `resources` down on a task of their own.
    ///
    /// Awaiting the handle is optional: dropping it still lets every
    /// `destroy` call run to completion.
    fn spawn_destroy(self: &Arc<Self>, resources: Vec<F::Resource>) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            for resource in resources {
                shared.destroy(resource).await;
            }
        })
    }

    /// Best-effort teardown through the factory.
    async fn destroy(&self, resource: F::Resource) {
        if let Err(err) = self.factory.destroy(resource).await {
            tracing::warn!(error = %err, "failed to destroy resource");
        }
        self.state.lock().record_destroyed();
    }
}

/// What `acquire` decided to do after inspecting the state.
enum Step<T> {
    Verify(Idle<T>),
    Wait { grow: bool },
}

/// Bounded pool of reusable resources.
///
/// At most [`PoolConfig::max_size`] resources exist at once. Idle resources
/// are handed out immediately (most recently released first); an empty pool
/// below capacity grows by one resource in the background while callers
/// wait; an empty pool at capacity blocks callers until a lease comes back.
///
/// Cloning is cheap and every clone refers to the same pool.
pub struct Pool<F: Factory> {
    shared: Arc<Shared<F>>,
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: Factory> std::fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<F: Factory> Pool<F> {
    /// Create a pool and eagerly populate it with `config.initial_size`
    /// resources.
    ///
    /// # Errors
    /// [`PoolError::InvalidConfiguration`] if `config` is invalid (checked
    /// before any resource is created), or [`PoolError::Factory`] if any
    /// initial creation fails. In the latter case the resources created so
    /// far are destroyed.
    pub async fn new(factory: F, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let mut created = Vec::new();
        for _ in 0..config.initial_size {
            match factory.create().await {
                Ok(resource) => created.push(resource),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        created = created.len(),
                        "initial pool population failed"
                    );
                    for resource in created {
                        if let Err(err) = factory.destroy(resource).await {
                            tracing::warn!(error = %err, "failed to destroy resource");
                        }
                    }
                    return Err(err.into());
                }
            }
        }

        let mut state = State::new(config.max_size);
        for resource in created {
            state.add_created(resource);
        }

        tracing::info!(
            initial = config.initial_size,
            capacity = config.max_size,
            "resource pool ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                factory,
                config,
                state: Mutex::new(state),
                available: Notify::new(),
            }),
        })
    }

    /// Check a resource out of the pool.
    ///
    /// Waits while the pool is empty, indefinitely unless
    /// [`PoolConfig::acquire_timeout`] is set. Background creation failures
    /// are not reported here; they only delay the caller.
    ///
    /// # Errors
    /// [`PoolError::Closed`] once the pool has been shut down, or
    /// [`PoolError::Timeout`] when a configured timeout expires.
    pub async fn acquire(&self) -> Result<Lease<F>> {
        match self.shared.config.acquire_timeout {
            None => self.checkout().await,
            Some(timeout) => tokio::time::timeout(timeout, self.checkout())
                .await
                .map_err(|_| {
                    let timeout_ms = duration_ms(timeout);
                    tracing::debug!(timeout_ms, "acquire timed out");
                    PoolError::Timeout { timeout_ms }
                })?,
        }
    }

    async fn checkout(&self) -> Result<Lease<F>> {
        let shared = &self.shared;
        loop {
            // Registered before the state is inspected so a wake-up between
            // the check and the await is not lost.
            let notified = shared.available.notified();

            let step = {
                let mut state = shared.state.lock();
                if state.closed {
                    return Err(PoolError::Closed);
                }
                match state.check_out() {
                    Some(entry) => Step::Verify(entry),
                    None => Step::Wait {
                        grow: state.begin_grow(),
                    },
                }
            };

            match step {
                Step::Verify(entry) => {
                    let age = entry.created_at.elapsed();
                    let lease = Lease::new(Arc::clone(shared), entry.id, entry.resource);
                    if !shared.factory.is_alive(&*lease).await {
                        self.discard(lease, age).await;
                        continue;
                    }

                    let handed_out = {
                        let mut state = shared.state.lock();
                        let still_ours = !state.closed && state.busy.contains_key(&lease.id());
                        if still_ours {
                            state.record_acquisition();
                        }
                        still_ours
                    };
                    if !handed_out {
                        // Shut down during the liveness check; dropping the
                        // lease destroys the resource.
                        return Err(PoolError::Closed);
                    }

                    tracing::debug!(lease_id = %lease.id(), "resource checked out");
                    return Ok(lease);
                }
                Step::Wait { grow } => {
                    if grow {
                        self.spawn_grow();
                    }
                    notified.await;
                }
            }
        }
    }

    /// Throw away a resource that failed its liveness check.
    ///
    /// No replacement is created here; the retrying caller (or a woken
    /// waiter) triggers growth if the pool is now empty.
    async fn discard(&self, lease: Lease<F>, age: Duration) {
        let id = lease.id();
        let resource = lease.detach();
        self.shared.state.lock().record_discarded();
        tracing::debug!(
            lease_id = %id,
            age_ms = duration_ms(age),
            "discarding dead resource"
        );
        // The teardown outlives this call if the caller gives up waiting.
        if let Err(err) = self.shared.spawn_destroy(vec![resource]).await {
            tracing::warn!(error = %err, "resource teardown task failed");
        }
    }

    fn spawn_grow(&self) {
        let ticket = GrowTicket::new(Arc::clone(&self.shared));
        tracing::debug!("spawning background resource creation");
        drop(tokio::spawn(grow::grow(ticket)));
    }

    /// Return a leased resource to the pool and wake waiting callers.
    ///
    /// # Errors
    /// [`PoolError::NotOwned`] if the lease is not checked out from this
    /// pool. A lease from another pool is dropped and goes back to its own
    /// pool; a lease that outlived [`shutdown`](Self::shutdown) is
    /// destroyed.
    pub fn release(&self, mut lease: Lease<F>) -> Result<()> {
        let lease_id = lease.id();
        if !lease.is_from(&self.shared) {
            tracing::warn!(lease_id = %lease_id, "release of a lease from another pool");
            return Err(PoolError::NotOwned { lease_id });
        }

        let resource = lease.take();
        drop(lease);
        match self.shared.check_in(lease_id, resource) {
            Ok(()) => Ok(()),
            Err(resource) => {
                tracing::warn!(lease_id = %lease_id, "release of a lease that is not checked out");
                self.shared.dispose(resource);
                Err(PoolError::NotOwned { lease_id })
            }
        }
    }

    /// Close the pool and destroy every resource it holds.
    ///
    /// Waiting and future `acquire` calls fail with [`PoolError::Closed`].
    /// Callers are expected to have released their leases first; leases
    /// still out are destroyed when they are released or dropped. Destroy
    /// failures are logged and ignored. Calling this twice is a no-op.
    pub async fn shutdown(&self) {
        let (drained, outstanding) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let outstanding = state.busy.len();
            state.busy.clear();
            let drained: Vec<_> = state.idle.drain(..).collect();
            (drained, outstanding)
        };

        if outstanding > 0 {
            tracing::warn!(outstanding, "pool shut down with leases still checked out");
        }
        self.shared.available.notify_waiters();

        let destroyed = drained.len();
        let resources = drained.into_iter().map(|entry| entry.resource).collect();
        if let Err(err) = self.shared.spawn_destroy(resources).await {
            tracing::warn!(error = %err, "resource teardown task failed");
        }
        tracing::info!(destroyed, "resource pool shut down");
    }

    /// Number of idle resources.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    /// Number of checked-out resources.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.shared.state.lock().busy.len()
    }

    /// Maximum number of resources the pool will hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.config.max_size
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.state.lock().stats()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
