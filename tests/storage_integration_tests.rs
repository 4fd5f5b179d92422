//! Integration Tests for Storage
//!
//! Exercises the public storage surface against the wall clock and the
//! background reclaimer.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use session_cache::{Storage, StorageConfig, StorageError};
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

/// Long enough for an entry with max_age=1 to expire at second resolution
const PAST_ONE_SECOND_TTL: Duration = Duration::from_millis(2100);

fn create_test_storage(max_age: u64, capacity: usize) -> Storage<u8> {
    Storage::new(max_age, capacity, Duration::from_secs(3600)).unwrap()
}

// == Add Tests ==

#[tokio::test]
async fn test_add_rejects_duplicate_and_keeps_order() {
    let storage = create_test_storage(1, 100);

    assert_ok!(storage.add("1", 1u8));
    assert_ok!(storage.add("2", 2u8));
    assert_ok!(storage.add("3", 3u8));
    assert_eq!(
        storage.add("3", 3u8),
        Err(StorageError::AlreadyExists("3".to_string()))
    );
    assert_ok!(storage.add("4", 4u8));

    assert_eq!(storage.keys(), vec!["4", "3", "2", "1"]);
}

#[tokio::test]
async fn test_add_after_expiration_reuses_entries() {
    let storage = create_test_storage(1, 100);

    assert_ok!(storage.add("1", 1u8));
    assert_ok!(storage.add("2", 2u8));
    assert_ok!(storage.add("3", 3u8));

    sleep(PAST_ONE_SECOND_TTL).await;

    assert_ok!(storage.add("1", 1u8));
    assert_ok!(storage.add("4", 4u8));

    assert_eq!(storage.keys(), vec!["4", "1", "3"]);
    assert_eq!(*storage.get("4").unwrap(), 4);
    assert_eq!(storage.stats().allocated, 3);
}

// == Get Tests ==

#[tokio::test]
async fn test_get_expired_removes_immediately() {
    let storage = create_test_storage(1, 100);
    assert_ok!(storage.set("sid", 7u8));
    assert_eq!(*storage.get("sid").unwrap(), 7);

    sleep(PAST_ONE_SECOND_TTL).await;

    assert_eq!(
        storage.get("sid"),
        Err(StorageError::NotFound("sid".to_string()))
    );
    assert_eq!(storage.len(), 0);
    assert_eq!(storage.stats().expired, 1);
}

#[tokio::test]
async fn test_get_slides_expiration() {
    let storage = create_test_storage(2, 100);
    assert_ok!(storage.set("sid", 1u8));

    // each read pushes the deadline two seconds out
    for _ in 0..3 {
        sleep(Duration::from_millis(1200)).await;
        assert_ok!(storage.get("sid"));
    }
}

#[tokio::test]
async fn test_delete_missing_is_advisory() {
    let storage = create_test_storage(60, 100);

    assert_err!(storage.delete("never-set"));
    assert_ok!(storage.set("sid", 1u8));
    assert_ok!(storage.delete("sid"));
    assert!(storage.is_empty());
}

// == Capacity Tests ==

#[tokio::test]
async fn test_pool_shrinks_to_capacity_after_sweep() {
    let storage = create_test_storage(1, 10);
    for i in 0..50u8 {
        assert_ok!(storage.set(&format!("sid{i}"), i));
    }
    assert_eq!(storage.stats().total_slots(), 50);

    sleep(PAST_ONE_SECOND_TTL).await;
    let report = storage.gc();

    assert_eq!(report.expired, 50);
    assert_eq!(report.live + report.free, 10);
    assert_eq!(storage.stats().total_slots(), 10);
    assert_eq!(storage.stats().discarded, 40);
}

#[tokio::test]
async fn test_set_capacity_rejects_zero() {
    let storage = create_test_storage(60, 10);

    assert!(matches!(
        storage.set_capacity(0),
        Err(StorageError::InvalidConfiguration(_))
    ));
    assert_ok!(storage.set_capacity(20));
    assert_eq!(storage.capacity(), 20);
}

// == Reclaimer Tests ==

#[tokio::test]
async fn test_reclaimer_removes_expired_entries() {
    let storage: Storage<u8> = Storage::new(1, 100, Duration::from_secs(1)).unwrap();
    for i in 0..5u8 {
        assert_ok!(storage.set(&format!("sid{i}"), i));
    }

    sleep(Duration::from_secs(4)).await;

    // no access needed: the background sweep already ran
    assert_eq!(storage.len(), 0);
    assert_eq!(storage.stats().expired, 5);
}

#[tokio::test]
async fn test_reclaimer_preserves_valid_entries() {
    let storage: Storage<u8> = Storage::new(3600, 100, Duration::from_secs(1)).unwrap();
    assert_ok!(storage.set("long_lived", 1u8));

    sleep(Duration::from_millis(1500)).await;

    assert_eq!(*storage.get("long_lived").unwrap(), 1);
}

#[tokio::test]
async fn test_set_gc_interval_sweeps_immediately() {
    let storage = create_test_storage(1, 100);
    assert_ok!(storage.set("a", 1u8));
    assert_ok!(storage.set("b", 2u8));

    sleep(PAST_ONE_SECOND_TTL).await;
    assert_eq!(storage.len(), 2);

    assert_ok!(storage.set_gc_interval(Duration::from_secs(1800)).await);
    assert_eq!(storage.len(), 0);
}

#[tokio::test]
async fn test_shutdown_keeps_storage_usable() {
    let storage = create_test_storage(60, 100);
    assert!(storage.reclaimer_running());

    storage.shutdown().await;

    assert!(!storage.reclaimer_running());
    assert_eq!(
        storage.set_gc_interval(Duration::from_secs(5)).await,
        Err(StorageError::ReclaimerStopped)
    );
    assert_ok!(storage.set("sid", 1u8));
    assert_eq!(*storage.get("sid").unwrap(), 1);
}

// == Construction Tests ==

#[test]
fn test_new_outside_runtime_fails() {
    let result: Result<Storage<u8>, _> = Storage::new(60, 100, Duration::from_secs(1));
    assert!(matches!(
        result,
        Err(StorageError::InvalidConfiguration(_))
    ));
}

#[tokio::test]
async fn test_from_config_rejects_invalid() {
    let config = StorageConfig {
        max_age: 0,
        ..StorageConfig::default()
    };
    assert!(matches!(
        Storage::<u8>::from_config(&config),
        Err(StorageError::InvalidConfiguration(_))
    ));
}

// == Concurrency Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_callers() {
    let storage: Arc<Storage<usize>> =
        Arc::new(Storage::new(60, 256, Duration::from_secs(1)).unwrap());

    std::thread::scope(|scope| {
        for t in 0..8 {
            let storage = Arc::clone(&storage);
            scope.spawn(move || {
                for i in 0..500usize {
                    let key = format!("t{t}-{i}");
                    storage.set(&key, i).unwrap();
                    assert_eq!(*storage.get(&key).unwrap(), i);
                    if i % 2 == 0 {
                        storage.delete(&key).unwrap();
                    }
                }
            });
        }
    });

    let keys = storage.keys();
    let unique: HashSet<&String> = keys.iter().collect();
    assert_eq!(storage.len(), 8 * 250);
    assert_eq!(unique.len(), keys.len());

    let stats = storage.stats();
    assert_eq!(stats.hits, 8 * 500);
    assert_eq!(stats.live, 8 * 250);
}
