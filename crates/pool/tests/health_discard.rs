//! Dead idle resources are discarded, never handed out.

mod common;

use std::time::Duration;

use common::{TrackingFactory, eventually};
use nebula_pool::{Pool, PoolConfig, PoolError};

#[tokio::test]
async fn dead_resource_is_never_returned() {
    let (factory, tracker) = TrackingFactory::new();
    let pool = Pool::new(factory, PoolConfig::new(2, 4)).await.unwrap();

    // Serial 1 sits on top of the idle stack.
    tracker.kill(1);

    let lease = pool.acquire().await.unwrap();
    assert_eq!(lease.serial, 0, "the live resource underneath is used instead");
    assert_eq!(tracker.destroyed(), 1);

    let stats = pool.stats();
    assert_eq!(stats.discarded, 1);
    assert_eq!(stats.total(), 1, "the dead resource no longer counts");
    assert_eq!(stats.idle, 0);
    assert_eq!(stats.busy, 1);
}

#[tokio::test]
async fn discarding_the_last_idle_resource_grows_a_replacement() {
    let (factory, tracker) = TrackingFactory::new();
    let pool = Pool::new(factory, PoolConfig::new(1, 1)).await.unwrap();
    tracker.kill(0);

    let lease = tokio::time::timeout(Duration::from_secs(2), pool.acquire())
        .await
        .expect("freed capacity must allow growth")
        .unwrap();
    assert_eq!(lease.serial, 1);
    assert_eq!(tracker.created(), 2);
    assert_eq!(tracker.destroyed(), 1);
    assert_eq!(pool.stats().total(), 1);
}

#[tokio::test]
async fn all_dead_idle_resources_are_drained() {
    let (factory, tracker) = TrackingFactory::new();
    let pool = Pool::new(factory, PoolConfig::new(3, 3)).await.unwrap();
    for serial in 0..3 {
        tracker.kill(serial);
    }

    let lease = pool.acquire().await.unwrap();
    assert_eq!(lease.serial, 3);
    assert_eq!(pool.stats().discarded, 3);
    assert_eq!(tracker.destroyed(), 3);
    assert_eq!(pool.stats().total(), 1);
}

#[tokio::test]
async fn resource_that_dies_while_leased_is_caught_on_next_checkout() {
    let (factory, tracker) = TrackingFactory::new();
    let pool = Pool::new(factory, PoolConfig::new(1, 2)).await.unwrap();

    let lease = pool.acquire().await.unwrap();
    tracker.kill(lease.serial);
    pool.release(lease).unwrap();
    assert_eq!(pool.idle_count(), 1, "release does not health-check");

    let fresh = pool.acquire().await.unwrap();
    assert_eq!(fresh.serial, 1);
    assert_eq!(pool.stats().discarded, 1);
}

#[tokio::test]
async fn failing_destroy_is_swallowed() {
    let (factory, tracker) = TrackingFactory::new();
    let pool = Pool::new(factory, PoolConfig::new(2, 2)).await.unwrap();
    tracker
        .destroy_fails
        .store(true, std::sync::atomic::Ordering::SeqCst);
    tracker.kill(1);

    let lease = pool.acquire().await.unwrap();
    assert_eq!(lease.serial, 0);
    assert_eq!(tracker.destroyed(), 1);
    assert_eq!(pool.stats().destroyed, 1);
}

#[tokio::test]
async fn timed_out_acquire_still_destroys_the_discarded_resource() {
    let (factory, tracker) = TrackingFactory::new();
    let factory = factory.with_destroy_delay(Duration::from_millis(100));
    let config = PoolConfig::new(1, 1).with_acquire_timeout(Duration::from_millis(20));
    let pool = Pool::new(factory, config).await.unwrap();
    tracker.kill(0);

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, PoolError::Timeout { .. }), "got {err:?}");

    assert!(eventually(|| tracker.destroyed() == 1).await);
    assert!(eventually(|| pool.stats().destroyed == 1).await);
    assert_eq!(pool.stats().discarded, 1);
}
