/*!
 * Get-Or-Create Integration Tests
 *
 * Double-checked population: exactly one create under contention, and a
 * fast path that never registers a token.
 */

use keymutex::KeyedMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_single_create_under_heavy_contention() {
    let locks = Arc::new(KeyedMutex::<&'static str>::new());
    let slot = Arc::new(parking_lot::Mutex::new(None::<u64>));
    let created = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(50));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let locks = Arc::clone(&locks);
            let slot = Arc::clone(&slot);
            let created = Arc::clone(&created);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                locks
                    .get_or_create(
                        "fresh",
                        || *slot.lock(),
                        || {
                            created.fetch_add(1, Ordering::SeqCst);
                            let value = 7777;
                            *slot.lock() = Some(value);
                            value
                        },
                    )
                    .unwrap()
            })
        })
        .collect();

    let results: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|&v| v == 7777));
    assert_eq!(locks.active_keys(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_create_async_contention() {
    let locks = Arc::new(KeyedMutex::<u64>::new());
    let slot = Arc::new(tokio::sync::Mutex::new(None::<u64>));
    let created = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(tokio::sync::Barrier::new(50));

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let locks = Arc::clone(&locks);
            let slot = Arc::clone(&slot);
            let created = Arc::clone(&created);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                locks
                    .get_or_create_async(
                        9,
                        None,
                        || {
                            let slot = Arc::clone(&slot);
                            async move { *slot.lock().await }
                        },
                        || {
                            let slot = Arc::clone(&slot);
                            let created = Arc::clone(&created);
                            async move {
                                created.fetch_add(1, Ordering::SeqCst);
                                *slot.lock().await = Some(1234);
                                1234
                            }
                        },
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), 1234);
    }
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(locks.active_keys(), 0);
}

#[test]
fn test_populated_fast_path_takes_no_lock() {
    let locks = KeyedMutex::<u64>::new();
    let gets = AtomicUsize::new(0);

    let value = locks
        .get_or_create(
            5,
            || {
                gets.fetch_add(1, Ordering::SeqCst);
                Some(11)
            },
            || panic!("create must never run on the fast path"),
        )
        .unwrap();

    assert_eq!(value, 11);
    // Single optimistic read, no second check, no token registered
    assert_eq!(gets.load(Ordering::SeqCst), 1);
    assert_eq!(locks.active_keys(), 0);
}

#[test]
fn test_create_per_populate_cycle_but_never_concurrent() {
    // Invalidate between cycles: create may run again, once per cycle
    let locks = KeyedMutex::<u64>::new();
    let slot = parking_lot::Mutex::new(None::<u64>);
    let created = AtomicUsize::new(0);

    for cycle in 0..3u64 {
        let value = locks
            .get_or_create(
                1,
                || *slot.lock(),
                || {
                    created.fetch_add(1, Ordering::SeqCst);
                    let value = cycle + 100;
                    *slot.lock() = Some(value);
                    value
                },
            )
            .unwrap();
        assert_eq!(value, cycle + 100);

        *slot.lock() = None;
    }

    assert_eq!(created.load(Ordering::SeqCst), 3);
}

#[test]
fn test_sentinel_variant_under_contention() {
    let locks = Arc::new(KeyedMutex::<&'static str>::new());
    let slot = Arc::new(AtomicUsize::new(0));
    let created = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let locks = Arc::clone(&locks);
            let slot = Arc::clone(&slot);
            let created = Arc::clone(&created);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                locks
                    .get_or_create_or(
                        "sentinel",
                        0usize,
                        || slot.load(Ordering::SeqCst),
                        || {
                            created.fetch_add(1, Ordering::SeqCst);
                            slot.store(55, Ordering::SeqCst);
                            55
                        },
                    )
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 55);
    }
    assert_eq!(created.load(Ordering::SeqCst), 1);
}
