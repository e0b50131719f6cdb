//! Common test factories for nebula-pool integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use nebula_pool::{Factory, FactoryError};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// A fake connection handed out by [`TrackingFactory`].
#[derive(Debug, PartialEq, Eq)]
pub struct Conn {
    pub serial: u64,
}

/// Shared view of everything a [`TrackingFactory`] did.
#[derive(Default)]
pub struct Tracker {
    next_id: AtomicU64,
    /// Every call to `create`, including ones still in progress.
    pub create_calls: AtomicU32,
    pub created: AtomicU32,
    pub destroyed: AtomicU32,
    pub create_failures: AtomicU32,
    /// Ids reported dead by `is_alive`.
    pub dead: Mutex<HashSet<u64>>,
    /// When set, every `create` fails.
    pub failing: AtomicBool,
    /// When set, the next `create` panics.
    pub panic_next: AtomicBool,
    /// When set, every `destroy` reports an error (after counting).
    pub destroy_fails: AtomicBool,
}

impl Tracker {
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> u32 {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn create_failures(&self) -> u32 {
        self.create_failures.load(Ordering::SeqCst)
    }

    pub fn kill(&self, id: u64) {
        self.dead.lock().insert(id);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

/// Factory that records every call and can be told to fail.
///
/// With a gate installed, each `create` first waits for a permit, which
/// lets tests hold a background creation open.
pub struct TrackingFactory {
    pub tracker: Arc<Tracker>,
    gate: Option<Arc<Semaphore>>,
    fail_after: Option<u32>,
    create_delay: Option<Duration>,
    destroy_delay: Option<Duration>,
}

impl TrackingFactory {
    pub fn new() -> (Self, Arc<Tracker>) {
        let tracker = Arc::new(Tracker::default());
        (
            Self {
                tracker: Arc::clone(&tracker),
                gate: None,
                fail_after: None,
                create_delay: None,
                destroy_delay: None,
            },
            tracker,
        )
    }

    /// Every `create` waits for a permit on `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Creations after the first `n` successful ones fail.
    pub fn fail_after(mut self, n: u32) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Every `create` sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Every `destroy` sleeps for `delay` before it counts.
    pub fn with_destroy_delay(mut self, delay: Duration) -> Self {
        self.destroy_delay = Some(delay);
        self
    }
}

impl Factory for TrackingFactory {
    type Resource = Conn;

    async fn create(&self) -> Result<Conn, FactoryError> {
        self.tracker.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| FactoryError::with_source("gate closed", e))?
                .forget();
        }
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        assert!(
            !self.tracker.panic_next.swap(false, Ordering::SeqCst),
            "factory exploded"
        );

        let over_limit = self
            .fail_after
            .is_some_and(|n| self.tracker.created.load(Ordering::SeqCst) >= n);
        if over_limit || self.tracker.failing.load(Ordering::SeqCst) {
            self.tracker.create_failures.fetch_add(1, Ordering::SeqCst);
            return Err(FactoryError::new("connection refused"));
        }

        self.tracker.created.fetch_add(1, Ordering::SeqCst);
        let id = self.tracker.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Conn { serial: id })
    }

    async fn is_alive(&self, conn: &Conn) -> bool {
        !self.tracker.dead.lock().contains(&conn.serial)
    }

    async fn destroy(&self, _conn: Conn) -> Result<(), FactoryError> {
        if let Some(delay) = self.destroy_delay {
            tokio::time::sleep(delay).await;
        }
        self.tracker.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.tracker.destroy_fails.load(Ordering::SeqCst) {
            return Err(FactoryError::new("close failed"));
        }
        Ok(())
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
