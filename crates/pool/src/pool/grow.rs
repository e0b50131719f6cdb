//! Background growth: one `create` call at a time, off the caller's path.

use std::sync::Arc;

use crate::error::FactoryError;
use crate::factory::Factory;

use super::Shared;

/// Ownership of the pool's single grow slot.
///
/// Dropping the ticket always wakes waiters, and frees the slot if the
/// attempt never landed (the task was cancelled or `create` panicked), so
/// blocked callers cannot hang on a flag nobody will clear.
pub(super) struct GrowTicket<F: Factory> {
    shared: Arc<Shared<F>>,
    landed: bool,
}

impl<F: Factory> GrowTicket<F> {
    /// Must only be created after `State::begin_grow` returned `true`.
    pub(super) fn new(shared: Arc<Shared<F>>) -> Self {
        Self {
            shared,
            landed: false,
        }
    }

    /// Record the outcome under the lock and release the slot.
    ///
    /// Returns the new resource when the pool closed while it was being
    /// created; the caller must destroy it.
    fn land(&mut self, outcome: Result<F::Resource, FactoryError>) -> Option<F::Resource> {
        self.landed = true;
        let mut state = self.shared.state.lock();
        state.grow_in_flight = false;
        match outcome {
            Ok(resource) if state.closed => {
                state.record_created_stale();
                Some(resource)
            }
            Ok(resource) => {
                let id = state.add_created(resource);
                tracing::debug!(
                    lease_id = %id,
                    idle = state.idle.len(),
                    busy = state.busy.len(),
                    "pool grew by one resource"
                );
                None
            }
            Err(err) => {
                state.record_failed_grow();
                tracing::warn!(error = %err, "background resource creation failed");
                None
            }
        }
    }
}

impl<F: Factory> Drop for GrowTicket<F> {
    fn drop(&mut self) {
        if !self.landed {
            self.shared.state.lock().grow_in_flight = false;
            tracing::warn!("background resource creation abandoned");
        }
        self.shared.available.notify_waiters();
    }
}

/// Body of the spawned grow task.
pub(super) async fn grow<F: Factory>(mut ticket: GrowTicket<F>) {
    let shared = Arc::clone(&ticket.shared);
    let outcome = shared.factory.create().await;
    let stale = ticket.land(outcome);
    drop(ticket);

    if let Some(resource) = stale {
        tracing::debug!("pool closed during creation, destroying new resource");
        shared.destroy(resource).await;
    }
}
