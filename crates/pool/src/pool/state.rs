//! Bookkeeping guarded by the pool lock.

use std::collections::HashMap;
use std::time::Instant;

use crate::lease::LeaseId;

/// An idle resource waiting on the stack.
pub(crate) struct Idle<T> {
    pub(crate) id: LeaseId,
    pub(crate) resource: T,
    pub(crate) created_at: Instant,
}

/// What the pool remembers about a checked-out resource.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkout {
    pub(crate) created_at: Instant,
    pub(crate) since: Instant,
}

#[derive(Debug, Clone, Default)]
struct Counters {
    created: u64,
    destroyed: u64,
    discarded: u64,
    failed_grows: u64,
    acquisitions: u64,
    releases: u64,
}

/// Pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Current number of idle instances in pool.
    pub idle: usize,
    /// Current number of instances checked out.
    pub busy: usize,
    /// Ceiling on `idle + busy`.
    pub capacity: usize,
    /// Whether a background creation is running.
    pub grow_in_flight: bool,
    /// Whether the pool has been shut down.
    pub closed: bool,
    /// Total instances ever created.
    pub created: u64,
    /// Total instances ever destroyed.
    pub destroyed: u64,
    /// Instances dropped because they failed the liveness check.
    pub discarded: u64,
    /// Background creations that failed.
    pub failed_grows: u64,
    /// Total successful acquisitions.
    pub total_acquisitions: u64,
    /// Total releases back to pool.
    pub total_releases: u64,
}

impl PoolStats {
    /// Number of resources currently in existence (`idle + busy`).
    #[must_use]
    pub fn total(&self) -> usize {
        self.idle + self.busy
    }
}

/// Everything the monitor protects.
///
/// `idle` is a stack: the most recently returned resource is handed out
/// first so warm resources get reused.
pub(crate) struct State<T> {
    capacity: usize,
    pub(crate) idle: Vec<Idle<T>>,
    pub(crate) busy: HashMap<LeaseId, Checkout>,
    pub(crate) grow_in_flight: bool,
    pub(crate) closed: bool,
    next_id: u64,
    counters: Counters,
}

impl<T> State<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            idle: Vec::new(),
            busy: HashMap::new(),
            grow_in_flight: false,
            closed: false,
            next_id: 0,
            counters: Counters::default(),
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.idle.len() + self.busy.len()
    }

    /// Push a freshly created resource onto the idle stack.
    pub(crate) fn add_created(&mut self, resource: T) -> LeaseId {
        let id = LeaseId::new(self.next_id);
        self.next_id += 1;
        self.counters.created += 1;
        self.idle.push(Idle {
            id,
            resource,
            created_at: Instant::now(),
        });
        id
    }

    /// Pop the warmest idle resource and mark it busy.
    pub(crate) fn check_out(&mut self) -> Option<Idle<T>> {
        let entry = self.idle.pop()?;
        self.busy.insert(
            entry.id,
            Checkout {
                created_at: entry.created_at,
                since: Instant::now(),
            },
        );
        Some(entry)
    }

    /// Move a busy resource back onto the idle stack.
    ///
    /// Hands the resource back when `id` is not busy here.
    pub(crate) fn check_in(&mut self, id: LeaseId, resource: T) -> Result<Checkout, T> {
        let Some(checkout) = self.busy.remove(&id) else {
            return Err(resource);
        };
        self.counters.releases += 1;
        self.idle.push(Idle {
            id,
            resource,
            created_at: checkout.created_at,
        });
        Ok(checkout)
    }

    /// Claim the single grow slot if the pool is empty, below capacity and
    /// nobody else is already growing it.
    pub(crate) fn begin_grow(&mut self) -> bool {
        let wanted = !self.closed
            && self.idle.is_empty()
            && !self.grow_in_flight
            && self.total() < self.capacity;
        if wanted {
            self.grow_in_flight = true;
        }
        wanted
    }

    pub(crate) fn record_acquisition(&mut self) {
        self.counters.acquisitions += 1;
    }

    pub(crate) fn record_destroyed(&mut self) {
        self.counters.destroyed += 1;
    }

    pub(crate) fn record_discarded(&mut self) {
        self.counters.discarded += 1;
    }

    pub(crate) fn record_failed_grow(&mut self) {
        self.counters.failed_grows += 1;
    }

    /// Count a resource that was created but never entered the pool.
    pub(crate) fn record_created_stale(&mut self) {
        self.counters.created += 1;
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.idle.len(),
            busy: self.busy.len(),
            capacity: self.capacity,
            grow_in_flight: self.grow_in_flight,
            closed: self.closed,
            created: self.counters.created,
            destroyed: self.counters.destroyed,
            discarded: self.counters.discarded,
            failed_grows: self.counters.failed_grows,
            total_acquisitions: self.counters.acquisitions,
            total_releases: self.counters.releases,
        }
    }
}
